use thiserror::Error;

/// Failures raised while turning detected grids into report tables.
///
/// Numeric and date parse failures never show up here: those cells become
/// `Cell::Missing` and the row is kept or dropped by the caller's rules.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("unexpected number of tables found on page {page}: {found}")]
    UnexpectedTableCount { page: u32, found: usize },

    #[error("page {0} not found in document")]
    PageNotFound(u32),

    #[error("header row not found on page {page}")]
    HeaderRowNotFound { page: u32 },

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("market table '{0}' has not been parsed")]
    MissingMarketTable(String),

    #[error("not enough rows with 12M performance to rank: {found} (need at least 6)")]
    InsufficientRows { found: usize },

    #[error("output path must not be empty")]
    EmptyOutputPath,
}
