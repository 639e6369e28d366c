use std::path::Path;

use anyhow::Result;
use tracing::info;

use super::market::MarketType;
use super::numeric::coerce_number;
use super::ParsedReport;
use crate::error::ReportError;
use crate::export;
use crate::table::{Cell, Table};

pub const PERFORMANCE_TABLE: &str = "performance_metrics";
pub const TOP_TABLE: &str = "top_3_markets_12M";
pub const BOTTOM_TABLE: &str = "bottom_3_markets_12M";

/// Quote columns that mean different things per market and cannot be ranked together.
const QUOTE_COLUMNS: [&str; 3] = ["Price", "Yield (%)", "QAS (bp)"];
const RANK_COLUMN: &str = "12M";
const RANK_SIZE: usize = 3;

#[derive(Debug)]
pub struct Consolidation {
    pub performance: Table,
    pub top: Table,
    pub bottom: Table,
}

/// Merge the five market tables into one performance table and rank it by
/// 12-month return. The merged table is written before ranking so it is
/// available even when ranking fails.
pub fn consolidate(report: &ParsedReport, output_dir: &Path) -> Result<Consolidation> {
    let mut tagged = Vec::with_capacity(MarketType::ALL.len());
    for market in MarketType::ALL {
        let mut table = report
            .market(market)
            .ok_or_else(|| ReportError::MissingMarketTable(market.title().to_string()))?
            .clone();
        table.rename_column(0, "name");
        table.insert_column(0, "market_type", Cell::text(market.title()));
        tagged.push(table);
    }

    let mut performance = Table::concat(PERFORMANCE_TABLE, &tagged);
    performance.drop_columns(&QUOTE_COLUMNS);
    export::write_table(&performance, output_dir)?;

    let rank = performance
        .column_index(RANK_COLUMN)
        .ok_or_else(|| ReportError::MissingColumn(RANK_COLUMN.to_string()))?;
    performance.map_column(RANK_COLUMN, coerce_number);

    let mut ranked = performance.clone();
    ranked.retain_rows(|row| !row[rank].is_missing());
    if ranked.len() < RANK_SIZE * 2 {
        return Err(ReportError::InsufficientRows { found: ranked.len() }.into());
    }

    let value = |row: &[Cell]| row[rank].as_number().unwrap_or(f64::NEG_INFINITY);
    ranked.rows.sort_by(|a, b| value(b).total_cmp(&value(a)));

    let top = ranked.head(RANK_SIZE, TOP_TABLE);
    let bottom = ranked.tail(RANK_SIZE, BOTTOM_TABLE);
    export::write_table(&top, output_dir)?;
    export::write_table(&bottom, output_dir)?;
    info!(
        "Ranked {} markets by 12M; best: {}, worst: {}",
        ranked.len(),
        label(&top, 0),
        label(&bottom, RANK_SIZE - 1)
    );

    Ok(Consolidation {
        performance,
        top,
        bottom,
    })
}

fn label(table: &Table, row: usize) -> String {
    table
        .cell(row, "name")
        .map(|c| c.to_field())
        .unwrap_or_default()
}
