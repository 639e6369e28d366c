use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use tracing::info;

use crate::parser::events::EVENTS_TABLE;
use crate::parser::market::MarketType;
use crate::parser::ParsedReport;
use crate::table::{Cell, Table};

pub fn connect(path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    for market in MarketType::ALL {
        conn.execute_batch(&format!(
            "
            CREATE TABLE IF NOT EXISTS {table} (
                id         INTEGER PRIMARY KEY,
                week_date  TEXT NOT NULL,
                name       TEXT NOT NULL,
                {value}    REAL,
                one_m      REAL,
                three_m    REAL,
                six_m      REAL,
                twelve_m   REAL,
                ytd        REAL,
                qtd        REAL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE(name, week_date)
            );
            CREATE INDEX IF NOT EXISTS idx_{table}_week ON {table}(week_date);
            ",
            table = market.db_table(),
            value = market.value_column(),
        ))?;
    }

    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS major_events (
            id         INTEGER PRIMARY KEY,
            week_date  TEXT NOT NULL,
            date       TEXT,
            time       TEXT,
            country    TEXT NOT NULL,
            indicator  TEXT NOT NULL,
            period     TEXT,
            estimate   REAL,
            consensus  REAL,
            previous   REAL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(country, indicator, week_date)
        );
        CREATE INDEX IF NOT EXISTS idx_major_events_week ON major_events(week_date);
        ",
    )?;
    Ok(())
}

// ── Saving ──

/// Page headers of the return columns, in `one_m..qtd` order.
const RETURN_HEADERS: [&str; 6] = ["1M", "3M", "6M", "12M", "YTD", "QTD"];

fn number(table: &Table, row: usize, column: &str) -> Option<f64> {
    table.cell(row, column).and_then(Cell::as_number)
}

fn text(table: &Table, row: usize, column: &str) -> Option<String> {
    table
        .cell(row, column)
        .filter(|c| !c.is_blank())
        .map(Cell::to_field)
}

/// Upsert one market table for `week`. The label column is the first column.
pub fn save_market(
    conn: &Connection,
    market: MarketType,
    table: &Table,
    week: NaiveDate,
) -> Result<usize> {
    let value = market.value_column();
    let sql = format!(
        "INSERT INTO {table}
         (week_date, name, {value}, one_m, three_m, six_m, twelve_m, ytd, qtd)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(name, week_date) DO UPDATE SET
            {value} = excluded.{value},
            one_m = excluded.one_m,
            three_m = excluded.three_m,
            six_m = excluded.six_m,
            twelve_m = excluded.twelve_m,
            ytd = excluded.ytd,
            qtd = excluded.qtd,
            updated_at = datetime('now')",
        table = market.db_table(),
        value = value,
    );
    let label = table
        .columns
        .first()
        .cloned()
        .with_context(|| format!("Table {} has no columns", table.name))?;
    let week = week.to_string();

    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(&sql)?;
        for i in 0..table.len() {
            let Some(name) = text(table, i, &label) else {
                continue;
            };
            let r: Vec<Option<f64>> = RETURN_HEADERS
                .iter()
                .map(|header| number(table, i, header))
                .collect();
            count += stmt.execute(params![
                week,
                name,
                number(table, i, market.value_header()),
                r[0],
                r[1],
                r[2],
                r[3],
                r[4],
                r[5],
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub fn save_events(conn: &Connection, table: &Table, week: NaiveDate) -> Result<usize> {
    let week = week.to_string();
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO major_events
             (week_date, date, time, country, indicator, period, estimate, consensus, previous)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(country, indicator, week_date) DO UPDATE SET
                date = excluded.date,
                time = excluded.time,
                period = excluded.period,
                estimate = excluded.estimate,
                consensus = excluded.consensus,
                previous = excluded.previous,
                updated_at = datetime('now')",
        )?;
        for i in 0..table.len() {
            let Some(indicator) = text(table, i, "indicator") else {
                continue;
            };
            count += stmt.execute(params![
                week,
                text(table, i, "date"),
                text(table, i, "time"),
                text(table, i, "country").unwrap_or_default(),
                indicator,
                text(table, i, "period"),
                number(table, i, "estimate"),
                number(table, i, "consensus"),
                number(table, i, "previous"),
            ])?;
        }
    }
    tx.commit()?;
    Ok(count)
}

#[derive(Debug, Default)]
pub struct SaveCounts {
    pub markets: usize,
    pub events: usize,
}

/// Persist every table of the report, one transaction per table. Tables
/// saved before a failure stay committed.
pub fn save_report(conn: &Connection, report: &ParsedReport, week: NaiveDate) -> Result<SaveCounts> {
    let mut counts = SaveCounts::default();
    for m in &report.markets {
        counts.markets += save_market(conn, m.market, &m.table, week)
            .with_context(|| format!("Failed to save {}", m.market.db_table()))?;
    }
    if let Some(events) = &report.events {
        counts.events += save_events(conn, events, week)
            .with_context(|| format!("Failed to save {}", EVENTS_TABLE))?;
    }
    info!(
        "Saved {} market rows and {} events for week {}",
        counts.markets, counts.events, week
    );
    Ok(counts)
}

// ── Stats ──

pub struct TableStats {
    pub table: &'static str,
    pub rows: usize,
    pub latest_week: Option<String>,
}

pub fn get_stats(conn: &Connection) -> Result<Vec<TableStats>> {
    let tables = MarketType::ALL
        .iter()
        .map(|m| m.db_table())
        .chain(std::iter::once(EVENTS_TABLE));

    let mut stats = Vec::new();
    for table in tables {
        let (rows, latest_week): (usize, Option<String>) = conn.query_row(
            &format!("SELECT COUNT(*), MAX(week_date) FROM {}", table),
            [],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        stats.push(TableStats {
            table,
            rows,
            latest_week,
        });
    }
    Ok(stats)
}
