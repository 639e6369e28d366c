use crate::table::RawGrid;

/// Column-name fragments expected in the events table header.
pub const EVENT_HEADER_KEYWORDS: &[&str] = &[
    "date",
    "time",
    "country",
    "indicator",
    "period",
    "estimate",
    "consensus",
    "previous",
];

/// Locates the header row of a detected grid.
pub trait HeaderMatcher {
    /// Index of the header row, if any row qualifies.
    fn find_header(&self, grid: &RawGrid) -> Option<usize>;
}

/// First row in which at least `min_matches` of the keywords occur as
/// case-insensitive substrings of some cell. Tolerates merged or split
/// header cells and vendor-specific suffixes like "(Bloomberg)".
pub struct SubstringHeaderMatcher {
    keywords: Vec<String>,
    min_matches: usize,
}

impl SubstringHeaderMatcher {
    pub fn new(keywords: &[&str], min_matches: usize) -> Self {
        SubstringHeaderMatcher {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            min_matches,
        }
    }

    fn matches(&self, row: &[String]) -> usize {
        let cells: Vec<String> = row.iter().map(|c| c.to_lowercase()).collect();
        self.keywords
            .iter()
            .filter(|k| cells.iter().any(|c| c.contains(k.as_str())))
            .count()
    }
}

impl Default for SubstringHeaderMatcher {
    fn default() -> Self {
        SubstringHeaderMatcher::new(EVENT_HEADER_KEYWORDS, 5)
    }
}

impl HeaderMatcher for SubstringHeaderMatcher {
    fn find_header(&self, grid: &RawGrid) -> Option<usize> {
        grid.iter().position(|row| self.matches(row) >= self.min_matches)
    }
}
