use tracing::{debug, info};

use super::market::MarketType;
use super::numeric::coerce_number;
use super::MarketTable;
use crate::error::ReportError;
use crate::table::{Cell, RawGrid, Table};

/// Columns parsed as numbers wherever a section has them.
pub const NUMERIC_COLUMNS: &[&str] = &[
    "1M", "3M", "6M", "12M", "YTD", "QTD", "Price", "Yield (%)", "QAS (bp)",
];

/// Split the single "Markets at a glance" grid into one table per section.
///
/// The detector reads the five stacked sections as one table, so section
/// boundaries come from title rows whose first cell is exactly a section
/// title. Rows above the first title are ignored.
pub fn split_markets(grids: Vec<RawGrid>, page: u32) -> Result<Vec<MarketTable>, ReportError> {
    let grid = single_grid(grids, page)?;

    let titles: Vec<(usize, MarketType)> = grid
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let first = row.first()?;
            MarketType::from_title(first).map(|m| (i, m))
        })
        .collect();
    debug!(page, titles = titles.len(), rows = grid.len(), "Located section titles");

    let mut tables = Vec::with_capacity(titles.len());
    for (n, (start, market)) in titles.iter().enumerate() {
        let end = titles.get(n + 1).map(|(i, _)| *i).unwrap_or(grid.len());
        let table = clean_section(*market, &grid[*start..end])?;
        info!("{}: {} rows", market.title(), table.len());
        tables.push(MarketTable {
            market: *market,
            table,
        });
    }

    Ok(tables)
}

/// Exactly one detected grid is the only layout this page is known to produce.
pub(crate) fn single_grid(mut grids: Vec<RawGrid>, page: u32) -> Result<RawGrid, ReportError> {
    if grids.len() != 1 {
        return Err(ReportError::UnexpectedTableCount {
            page,
            found: grids.len(),
        });
    }
    Ok(grids.remove(0))
}

fn clean_section(market: MarketType, rows: &[Vec<String>]) -> Result<Table, ReportError> {
    let header = &rows[0];
    let keep: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, h)| !h.trim().is_empty())
        .map(|(i, _)| i)
        .collect();
    let columns = keep.iter().map(|&i| header[i].trim().to_string()).collect();

    let mut table = Table::new(&market.slug(), columns);
    for row in &rows[1..] {
        let cells = keep
            .iter()
            .map(|&i| row.get(i).map(|c| Cell::text(c)).unwrap_or(Cell::Missing))
            .collect();
        table.push_row(cells);
    }

    for column in NUMERIC_COLUMNS {
        table.map_column(column, coerce_number);
    }

    let ytd = table
        .column_index("YTD")
        .ok_or_else(|| ReportError::MissingColumn(format!("YTD ({})", market.title())))?;
    table.retain_rows(|row| !row[ytd].is_missing());
    Ok(table)
}
