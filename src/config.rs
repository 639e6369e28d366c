use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::ParseOptions;

/// Runtime settings. Layered: defaults, then `weekly_focus.toml` in the
/// working directory if present, then `WEEKLY_FOCUS_*` environment variables.
/// CLI flags are applied on top by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: String,
    pub output_dir: String,
    pub year: Option<i32>,
    pub markets_page: u32,
    pub events_page: u32,
    pub row_tol: f64,
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        let parse = ParseOptions::default();
        Settings {
            db_path: "data/weekly_focus.sqlite".to_string(),
            output_dir: "output".to_string(),
            year: parse.year,
            markets_page: parse.markets_page,
            events_page: parse.events_page,
            row_tol: parse.row_tol,
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        Config::builder()
            .add_source(File::with_name("weekly_focus").required(false))
            .add_source(Environment::with_prefix("WEEKLY_FOCUS").try_parsing(true))
            .build()
            .and_then(|c| c.try_deserialize())
            .context("Failed to load settings")
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            year: self.year,
            markets_page: self.markets_page,
            events_page: self.events_page,
            row_tol: self.row_tol,
        }
    }
}
