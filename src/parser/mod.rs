pub mod consolidate;
pub mod events;
pub mod glance;
pub mod header;
pub mod market;
pub mod numeric;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::detect::{DetectOptions, TableDetector};
use crate::table::Table;
use events::EventYear;
use header::HeaderMatcher;
use market::MarketType;

/// One section of the "Markets at a glance" page.
#[derive(Debug, Clone)]
pub struct MarketTable {
    pub market: MarketType,
    pub table: Table,
}

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Year given to event dates. `None` places each date nearest the
    /// processing date.
    pub year: Option<i32>,
    pub markets_page: u32,
    pub events_page: u32,
    pub row_tol: f64,
}

impl ParseOptions {
    pub fn event_year(&self, today: NaiveDate) -> EventYear {
        match self.year {
            Some(year) => EventYear::Fixed(year),
            None => EventYear::Nearest(today),
        }
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            year: None,
            markets_page: 2,
            events_page: 3,
            row_tol: 10.0,
        }
    }
}

/// Everything extracted from one report.
#[derive(Debug, Default)]
pub struct ParsedReport {
    pub markets: Vec<MarketTable>,
    pub events: Option<Table>,
}

impl ParsedReport {
    /// Market tables in section order, then events.
    pub fn tables(&self) -> Vec<&Table> {
        let mut tables: Vec<&Table> = self.markets.iter().map(|m| &m.table).collect();
        tables.extend(self.events.as_ref());
        tables
    }

    pub fn market(&self, market: MarketType) -> Option<&Table> {
        self.markets
            .iter()
            .find(|m| m.market == market)
            .map(|m| &m.table)
    }

    pub fn earliest_event_date(&self) -> Option<NaiveDate> {
        let events = self.events.as_ref()?;
        let idx = events.column_index("date")?;
        events.rows.iter().filter_map(|r| r[idx].as_date()).min()
    }
}

/// Two passes over the document: the markets page, then the events page.
/// `today` anchors event years when none is configured.
pub fn parse_report(
    detector: &dyn TableDetector,
    opts: &ParseOptions,
    today: NaiveDate,
    matcher: &dyn HeaderMatcher,
) -> Result<ParsedReport> {
    let detect = DetectOptions {
        row_tol: opts.row_tol,
    };

    let grids = detector
        .detect(opts.markets_page, &detect)
        .with_context(|| format!("Failed to detect tables on page {}", opts.markets_page))?;
    let markets = glance::split_markets(grids, opts.markets_page)?;

    let grids = detector
        .detect(opts.events_page, &detect)
        .with_context(|| format!("Failed to detect tables on page {}", opts.events_page))?;
    let events = events::extract_events(grids, opts.events_page, opts.event_year(today), matcher)?;

    Ok(ParsedReport {
        markets,
        events: Some(events),
    })
}
