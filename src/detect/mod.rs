pub mod content;
pub mod stream;

use std::path::Path;

use anyhow::{Context, Result};
use pdf_extract::Document;
use tracing::debug;

use crate::error::ReportError;
use crate::table::RawGrid;

#[derive(Debug, Clone, Copy)]
pub struct DetectOptions {
    /// Vertical distance (points) within which text belongs to the same row.
    pub row_tol: f64,
}

impl Default for DetectOptions {
    fn default() -> Self {
        DetectOptions { row_tol: 10.0 }
    }
}

/// Finds table regions on a page of the loaded document.
pub trait TableDetector {
    fn detect(&self, page: u32, options: &DetectOptions) -> Result<Vec<RawGrid>>;
}

/// Stream-flavor detector over text positioned by pdf-extract.
pub struct PdfStreamDetector {
    doc: Document,
}

impl PdfStreamDetector {
    pub fn open(path: &Path) -> Result<Self> {
        let doc = Document::load(path).with_context(|| format!("Failed to load PDF {:?}", path))?;
        Ok(PdfStreamDetector { doc })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let doc = Document::load_mem(bytes).context("Failed to load PDF from upload")?;
        Ok(PdfStreamDetector { doc })
    }

    pub fn page_count(&self) -> usize {
        self.doc.get_pages().len()
    }
}

impl TableDetector for PdfStreamDetector {
    fn detect(&self, page: u32, options: &DetectOptions) -> Result<Vec<RawGrid>> {
        if !self.doc.get_pages().contains_key(&page) {
            return Err(ReportError::PageNotFound(page).into());
        }
        let runs = content::page_runs(&self.doc, page)?;
        let grids: Vec<RawGrid> = stream::build_grid(&runs, options.row_tol).into_iter().collect();
        debug!(
            page,
            runs = runs.len(),
            tables = grids.len(),
            rows = grids.first().map(|g| g.len()).unwrap_or(0),
            "Detected tables"
        );
        Ok(grids)
    }
}
