use std::path::Path;

use anyhow::Result;
use chrono::{Datelike, Duration, Local, NaiveDate};
use tracing::{info, warn};

use crate::db;
use crate::detect::TableDetector;
use crate::export;
use crate::parser::consolidate::{self, Consolidation};
use crate::parser::header::SubstringHeaderMatcher;
use crate::parser::{self, ParseOptions, ParsedReport};

pub struct RunOptions {
    pub parse: ParseOptions,
    pub output_dir: String,
    /// Database to upsert into; `None` skips persistence.
    pub db_path: Option<String>,
    pub week: Option<NaiveDate>,
}

pub struct RunSummary {
    pub report: ParsedReport,
    pub consolidation: Consolidation,
    pub files: usize,
    pub week: NaiveDate,
    pub saved: Option<db::SaveCounts>,
}

pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Week the report's figures belong to. The events page previews the
/// following week, so a parsed event date places the report one week earlier.
pub fn resolve_week(explicit: Option<NaiveDate>, report: &ParsedReport, today: NaiveDate) -> NaiveDate {
    if let Some(week) = explicit {
        return monday_of(week);
    }
    if let Some(first) = report.earliest_event_date() {
        return monday_of(first - Duration::days(7));
    }
    let week = monday_of(today);
    warn!("No event dates parsed, attributing report to week of {}", week);
    week
}

/// Parse one document, write its CSVs, and optionally persist it.
/// `stage` is called with a short label before each step.
pub fn run(detector: &dyn TableDetector, opts: &RunOptions, stage: &dyn Fn(&str)) -> Result<RunSummary> {
    let dir = export::output_dir(&opts.output_dir)?;

    let today = Local::now().date_naive();
    stage("Parsing tables");
    let report = parser::parse_report(detector, &opts.parse, today, &SubstringHeaderMatcher::default())?;

    stage("Exporting CSV");
    let mut files = export::export_tables(&report.tables(), &opts.output_dir)?;

    stage("Ranking markets");
    let consolidation = consolidate::consolidate(&report, dir)?;
    files += 3;

    let week = resolve_week(opts.week, &report, today);
    let saved = match &opts.db_path {
        Some(path) => {
            stage("Saving to database");
            let conn = db::connect(path)?;
            db::init_schema(&conn)?;
            Some(db::save_report(&conn, &report, week)?)
        }
        None => None,
    };

    info!("Wrote {} files to {:?}", files, Path::new(&opts.output_dir));
    Ok(RunSummary {
        report,
        consolidation,
        files,
        week,
        saved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::PdfStreamDetector;
    use crate::testutil::{events_grid, markets_grid, report_pdf, FixedDetector};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn options(dir: &Path, db_path: Option<String>) -> RunOptions {
        RunOptions {
            parse: ParseOptions {
                year: Some(2024),
                ..Default::default()
            },
            output_dir: dir.to_str().unwrap().to_string(),
            db_path,
            week: None,
        }
    }

    #[test]
    fn mondays() {
        assert_eq!(monday_of(date(2024, 10, 21)), date(2024, 10, 21));
        assert_eq!(monday_of(date(2024, 10, 27)), date(2024, 10, 21));
        assert_eq!(monday_of(date(2025, 1, 1)), date(2024, 12, 30));
    }

    #[test]
    fn week_resolution_order() {
        let empty = ParsedReport::default();
        let today = date(2024, 11, 6);
        assert_eq!(resolve_week(Some(date(2024, 10, 9)), &empty, today), date(2024, 10, 7));
        assert_eq!(resolve_week(None, &empty, today), date(2024, 11, 4));

        let detector = FixedDetector::default()
            .with_page(2, vec![markets_grid()])
            .with_page(3, vec![events_grid()]);
        let opts = ParseOptions {
            year: Some(2024),
            ..Default::default()
        };
        let report =
            parser::parse_report(&detector, &opts, today, &SubstringHeaderMatcher::default()).unwrap();
        assert_eq!(resolve_week(None, &report, today), date(2024, 10, 21));
    }

    #[test]
    fn week_follows_processing_year_without_configured_year() {
        let detector = FixedDetector::default()
            .with_page(2, vec![markets_grid()])
            .with_page(3, vec![events_grid()]);
        let today = date(2026, 10, 25);
        let report =
            parser::parse_report(&detector, &ParseOptions::default(), today, &SubstringHeaderMatcher::default())
                .unwrap();
        assert_eq!(resolve_week(None, &report, today), date(2026, 10, 19));
    }

    #[test]
    fn runs_end_to_end_on_canned_grids() {
        let dir = tempfile::tempdir().unwrap();
        let detector = FixedDetector::default()
            .with_page(2, vec![markets_grid()])
            .with_page(3, vec![events_grid()]);
        let db_path = dir.path().join("db/test.sqlite");
        let opts = options(&dir.path().join("out"), Some(db_path.to_str().unwrap().to_string()));

        let summary = run(&detector, &opts, &|_| {}).unwrap();
        assert_eq!(summary.files, 9);
        assert_eq!(summary.week, date(2024, 10, 21));
        let saved = summary.saved.unwrap();
        assert_eq!(saved.markets, 8);
        assert_eq!(saved.events, 4);
        assert_eq!(std::fs::read_dir(dir.path().join("out")).unwrap().count(), 9);

        let conn = db::connect(db_path.to_str().unwrap()).unwrap();
        let stats = db::get_stats(&conn).unwrap();
        assert!(stats.iter().all(|s| s.latest_week.as_deref() == Some("2024-10-21")));
    }

    #[test]
    fn runs_on_generated_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let detector = PdfStreamDetector::from_bytes(&report_pdf()).unwrap();
        let summary = run(&detector, &options(dir.path(), None), &|_| {}).unwrap();

        assert!(summary.saved.is_none());
        assert_eq!(summary.report.markets.len(), 5);
        assert_eq!(summary.report.events.as_ref().unwrap().len(), 4);
        assert_eq!(summary.consolidation.performance.len(), 8);

        let top = std::fs::read_to_string(dir.path().join("top_3_markets_12M.csv")).unwrap();
        assert!(top.starts_with("market_type,name,"));
        assert!(top.contains("Equities,S&P 500,"));
    }

    #[test]
    fn empty_output_dir_fails_before_parsing() {
        let called = std::cell::Cell::new(false);
        let opts = RunOptions {
            parse: ParseOptions::default(),
            output_dir: String::new(),
            db_path: None,
            week: None,
        };
        let result = run(&FixedDetector::default(), &opts, &|_| called.set(true));
        assert!(result.is_err());
        assert!(!called.get());
    }
}
