use crate::table::Cell;

/// Parse a report number: thousands separators and surrounding whitespace
/// are ignored, a typographic minus counts as '-'. Anything else is `None`.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',')
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Numeric view of a cell: numbers pass through, text is parsed, everything
/// else (and unparseable text) becomes `Missing`.
pub fn coerce_number(cell: &Cell) -> Cell {
    match cell {
        Cell::Number(n) => Cell::Number(*n),
        Cell::Text(t) => parse_number(t).map(Cell::Number).unwrap_or(Cell::Missing),
        _ => Cell::Missing,
    }
}
