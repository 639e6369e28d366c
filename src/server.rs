//! HTTP front-end: upload a report, get its CSVs back as a ZIP.
//!
//!   POST /parse   multipart: file (PDF), markets_page, events_page
//!   GET  /health

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tracing::{error, info};

use crate::config::Settings;
use crate::detect::PdfStreamDetector;
use crate::export;
use crate::parser::ParseOptions;
use crate::pipeline::{self, RunOptions};

const MAX_UPLOAD: usize = 50 * 1024 * 1024;

#[derive(Clone)]
struct AppState {
    settings: Arc<Settings>,
    persist: bool,
}

struct AppError(StatusCode, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.0, Json(serde_json::json!({"error": self.1}))).into_response()
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError(StatusCode::INTERNAL_SERVER_ERROR, s)
    }
}

fn bad_request(msg: impl Into<String>) -> AppError {
    AppError(StatusCode::BAD_REQUEST, msg.into())
}

struct Upload {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl Upload {
    fn is_pdf(&self) -> bool {
        let named_pdf = self
            .file_name
            .as_deref()
            .is_some_and(|n| n.to_lowercase().ends_with(".pdf"));
        let typed_pdf = self.content_type.as_deref() == Some("application/pdf");
        self.data.starts_with(b"%PDF") && (named_pdf || typed_pdf)
    }
}

fn parse_page(field: &str, raw: &str) -> Result<u32, AppError> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(bad_request(format!("{} must be a positive integer, got {:?}", field, raw))),
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn parse_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut upload: Option<Upload> = None;
    let mut parse = state.settings.parse_options();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| bad_request(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(|e| bad_request(e.to_string()))?;
                upload = Some(Upload {
                    file_name,
                    content_type,
                    data,
                });
            }
            "markets_page" | "events_page" => {
                let raw = field.text().await.map_err(|e| bad_request(e.to_string()))?;
                let page = parse_page(&name, &raw)?;
                if name == "markets_page" {
                    parse.markets_page = page;
                } else {
                    parse.events_page = page;
                }
            }
            _ => {}
        }
    }

    let upload = upload.ok_or_else(|| bad_request("missing 'file' field"))?;
    if !upload.is_pdf() {
        return Err(bad_request("uploaded file is not a PDF"));
    }
    info!(
        bytes = upload.data.len(),
        markets_page = parse.markets_page,
        events_page = parse.events_page,
        "Parsing upload {}",
        upload.file_name.as_deref().unwrap_or("<unnamed>")
    );

    let db_path = state.persist.then(|| state.settings.db_path.clone());
    let archive = tokio::task::spawn_blocking(move || {
        process_upload(&upload.data, parse, db_path)
    })
    .await
    .map_err(|e| AppError::from(e.to_string()))?
    .map_err(|e| {
        error!("Parse failed: {:#}", e);
        AppError::from(format!("{:#}", e))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"weekly_focus.zip\"",
            ),
        ],
        archive,
    )
        .into_response())
}

/// Run the pipeline inside a scratch directory and zip what it wrote.
/// The directory is removed when `tmp` drops, on success or failure.
fn process_upload(
    pdf: &[u8],
    parse: ParseOptions,
    db_path: Option<String>,
) -> Result<Vec<u8>> {
    let tmp = tempfile::tempdir().context("Failed to create temp dir")?;
    let output_dir = tmp
        .path()
        .to_str()
        .context("Temp dir path is not valid UTF-8")?
        .to_string();

    let detector = PdfStreamDetector::from_bytes(pdf)?;
    let opts = RunOptions {
        parse,
        output_dir,
        db_path,
        week: None,
    };
    let summary = pipeline::run(&detector, &opts, &|_| {})?;
    info!("Generated {} files for week {}", summary.files, summary.week);
    export::zip_dir(tmp.path())
}

fn app(settings: Settings, persist: bool) -> Router {
    let state = AppState {
        settings: Arc::new(settings),
        persist,
    };
    Router::new()
        .route("/parse", post(parse_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD))
        .with_state(state)
}

pub async fn serve(settings: Settings, persist: bool) -> Result<()> {
    let bind = settings.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind to {}", bind))?;
    info!("Listening on {}", bind);
    axum::serve(listener, app(settings, persist))
        .await
        .context("Server error")?;
    Ok(())
}
