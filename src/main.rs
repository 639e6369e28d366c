mod config;
mod db;
mod detect;
mod error;
mod export;
mod parser;
mod pipeline;
mod server;
mod table;
#[cfg(test)]
mod testutil;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::Settings;
use crate::detect::{DetectOptions, PdfStreamDetector, TableDetector};

#[derive(Parser)]
#[command(name = "weekly_focus", about = "Extract market and calendar tables from the weekly focus PDF")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a report, write CSVs and optionally save to the database
    Run {
        /// Report PDF
        #[arg(long)]
        pdf: PathBuf,
        /// Output directory for CSV files
        #[arg(short, long)]
        output: Option<String>,
        /// Year assigned to event dates (default: nearest to today)
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        markets_page: Option<u32>,
        #[arg(long)]
        events_page: Option<u32>,
        /// Upsert the parsed tables into the database
        #[arg(long)]
        persist: bool,
        /// Week the report belongs to (any day; normalized to Monday)
        #[arg(long)]
        week: Option<NaiveDate>,
    },
    /// Serve the HTTP upload endpoint
    Serve {
        /// Listen address, e.g. 0.0.0.0:8000
        #[arg(long)]
        bind: Option<String>,
        /// Save every parsed upload to the database
        #[arg(long)]
        persist: bool,
    },
    /// Print the raw grids detected on one page
    Grids {
        #[arg(long)]
        pdf: PathBuf,
        #[arg(long)]
        page: u32,
        /// Row tolerance in points
        #[arg(long)]
        row_tol: Option<f64>,
    },
    /// Show row counts per database table
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = Settings::load()?;

    let result = match cli.command {
        Commands::Run {
            pdf,
            output,
            year,
            markets_page,
            events_page,
            persist,
            week,
        } => {
            if let Some(output) = output {
                settings.output_dir = output;
            }
            settings.year = year.or(settings.year);
            settings.markets_page = markets_page.unwrap_or(settings.markets_page);
            settings.events_page = events_page.unwrap_or(settings.events_page);

            let detector = PdfStreamDetector::open(&pdf)?;
            println!("Loaded {:?} ({} pages)", pdf, detector.page_count());

            let opts = pipeline::RunOptions {
                parse: settings.parse_options(),
                output_dir: settings.output_dir.clone(),
                db_path: persist.then(|| settings.db_path.clone()),
                week,
            };

            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .unwrap(),
            );
            pb.enable_steady_tick(Duration::from_millis(100));
            let summary = pipeline::run(&detector, &opts, &|stage| pb.set_message(stage.to_string()));
            pb.finish_and_clear();
            let summary = summary?;

            for m in &summary.report.markets {
                println!("{:<26} {:>3} rows", m.market.title(), m.table.len());
            }
            if let Some(events) = &summary.report.events {
                println!("{:<26} {:>3} rows", "Major events", events.len());
            }
            println!(
                "{:<26} {:>3} rows",
                "Performance (all markets)",
                summary.consolidation.performance.len()
            );
            print_ranking("Top 3 (12M)", &summary.consolidation.top);
            print_ranking("Bottom 3 (12M)", &summary.consolidation.bottom);
            println!("\nWrote {} CSV files to {}", summary.files, settings.output_dir);
            if let Some(saved) = summary.saved {
                println!(
                    "Saved {} market rows, {} events for week {} to {}",
                    saved.markets, saved.events, summary.week, settings.db_path
                );
            }
            Ok(())
        }
        Commands::Serve { bind, persist } => {
            if let Some(bind) = bind {
                settings.bind = bind;
            }
            server::serve(settings, persist).await
        }
        Commands::Grids { pdf, page, row_tol } => {
            let detector = PdfStreamDetector::open(&pdf)?;
            let options = DetectOptions {
                row_tol: row_tol.unwrap_or(settings.row_tol),
            };
            let grids = detector.detect(page, &options)?;
            if grids.is_empty() {
                println!("No tables found on page {}.", page);
            }
            for (i, grid) in grids.iter().enumerate() {
                println!("--- Table {} ({} rows) ---", i + 1, grid.len());
                for (r, row) in grid.iter().enumerate() {
                    let cells: Vec<String> = row.iter().map(|c| truncate(c, 24)).collect();
                    println!("{:>3} | {}", r, cells.join(" | "));
                }
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            println!("Database: {}", settings.db_path);
            for s in db::get_stats(&conn)? {
                println!(
                    "{:<16} {:>6} rows  latest week: {}",
                    s.table,
                    s.rows,
                    s.latest_week.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn print_ranking(title: &str, table: &table::Table) {
    if table.is_empty() {
        return;
    }
    println!("\n{}", title);
    for i in 0..table.len() {
        let field = |c: &str| table.cell(i, c).map(|v| v.to_field()).unwrap_or_default();
        println!(
            "  {:<24} {:<26} {:>7}",
            truncate(&field("name"), 24),
            field("market_type"),
            field("12M")
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
