use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;
use tracing::{debug, info};

use super::glance::single_grid;
use super::header::HeaderMatcher;
use super::numeric::coerce_number;
use crate::error::ReportError;
use crate::table::{Cell, RawGrid, Table};

pub const EVENTS_TABLE: &str = "major_events";

pub const EVENT_COLUMNS: [&str; 8] = [
    "date",
    "time",
    "country",
    "indicator",
    "period",
    "estimate",
    "consensus",
    "previous",
];

const NUMERIC_COLUMNS: [&str; 3] = ["estimate", "consensus", "previous"];

// "Mon, 28 Oct" / "Tue 5 Nov" / "29 October"; the weekday is not checked.
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z]+\.?,?\s+)?(\d{1,2})\s+([A-Za-z]+)\.?$").unwrap());

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Year placement for event dates, which the report prints without one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventYear {
    Fixed(i32),
    /// The occurrence of the day and month closest to this date, at most
    /// half a year away.
    Nearest(NaiveDate),
}

impl EventYear {
    pub fn date(self, month: u32, day: u32) -> Option<NaiveDate> {
        match self {
            EventYear::Fixed(year) => NaiveDate::from_ymd_opt(year, month, day),
            EventYear::Nearest(anchor) => (anchor.year() - 1..=anchor.year() + 1)
                .filter_map(|y| NaiveDate::from_ymd_opt(y, month, day))
                .map(|d| (d, (d - anchor).num_days().abs()))
                .filter(|(_, distance)| *distance <= 183)
                .min_by_key(|(_, distance)| *distance)
                .map(|(d, _)| d),
        }
    }
}

/// Extract the economic calendar from the events page grid.
///
/// Everything up to and including the header row is discarded; the rest is
/// relabeled with [`EVENT_COLUMNS`]. Dates carry no year in the source, so
/// each is placed by `year`, and blank dates inherit the previous row's date.
pub fn extract_events(
    grids: Vec<RawGrid>,
    page: u32,
    year: EventYear,
    matcher: &dyn HeaderMatcher,
) -> Result<Table, ReportError> {
    let grid = single_grid(grids, page)?;
    let header = matcher
        .find_header(&grid)
        .ok_or(ReportError::HeaderRowNotFound { page })?;
    debug!(page, header, rows = grid.len(), "Located events header");

    let mut table = Table::new(EVENTS_TABLE, EVENT_COLUMNS.iter().map(|c| c.to_string()).collect());
    for row in &grid[header + 1..] {
        let cells = (0..EVENT_COLUMNS.len())
            .map(|i| Cell::text(row.get(i).map(String::as_str).unwrap_or("")))
            .collect();
        table.push_row(cells);
    }

    table.map_column("date", |cell| {
        cell.as_text()
            .and_then(|t| parse_event_date(t, year))
            .map(Cell::Date)
            .unwrap_or(Cell::Missing)
    });
    forward_fill_dates(&mut table);

    for column in NUMERIC_COLUMNS {
        table.map_column(column, coerce_number);
    }

    let indicator = table
        .column_index("indicator")
        .ok_or_else(|| ReportError::MissingColumn("indicator".to_string()))?;
    table.retain_rows(|row| !row[indicator].is_blank());
    info!("Major events: {} rows", table.len());
    Ok(table)
}

/// Parse a "weekday, day month" cell into a date placed by `year`.
pub fn parse_event_date(raw: &str, year: EventYear) -> Option<NaiveDate> {
    let caps = DATE_RE.captures(raw.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month_name = caps[2].to_lowercase();
    let month = MONTHS
        .iter()
        .position(|m| month_name.starts_with(m))
        .map(|i| i as u32 + 1)?;
    year.date(month, day)
}

fn forward_fill_dates(table: &mut Table) {
    let mut last: Option<NaiveDate> = None;
    table.map_column("date", |cell| match cell.as_date() {
        Some(d) => {
            last = Some(d);
            Cell::Date(d)
        }
        None => last.map(Cell::Date).unwrap_or(Cell::Missing),
    });
}
