use std::panic::{self, AssertUnwindSafe};

use anyhow::{anyhow, Result};
use pdf_extract::{output_doc_page, Document, MediaBox, OutputDev, OutputError, Transform};

/// A string shown on the page, positioned in user space (y grows upwards).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x0: f64,
    pub x1: f64,
    pub y: f64,
    pub size: f64,
    pub text: String,
}

/// Glyphs further than this many font sizes from the run's end start a new run.
const JOIN_GAP: f64 = 0.15;

/// Collects glyphs into runs. A run is one shown string, split further when
/// a glyph leaves the run's baseline or jumps ahead of its end.
#[derive(Default)]
struct RunCollector {
    runs: Vec<TextRun>,
    current: Option<TextRun>,
}

impl RunCollector {
    fn flush(&mut self) {
        if let Some(mut run) = self.current.take() {
            let trimmed = run.text.trim_end().len();
            run.text.truncate(trimmed);
            if !run.text.is_empty() {
                self.runs.push(run);
            }
        }
    }
}

impl OutputDev for RunCollector {
    fn begin_page(&mut self, _page_num: u32, _media_box: &MediaBox, _art_box: Option<(f64, f64, f64, f64)>) -> Result<(), OutputError> {
        self.runs.clear();
        self.current = None;
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn output_character(&mut self, trm: &Transform, width: f64, spacing: f64, font_size: f64, char: &str) -> Result<(), OutputError> {
        let scale = (trm.m11 * trm.m22 - trm.m12 * trm.m21).abs().sqrt();
        let size = font_size * scale;
        let (x, y) = (trm.m31, trm.m32);
        let advance = (width * font_size + spacing) * trm.m11.abs();

        let continues = self.current.as_ref().is_some_and(|run| {
            (run.y - y).abs() <= size * 0.5 && x - run.x1 <= size * JOIN_GAP
        });
        if !continues {
            self.flush();
            if char.trim().is_empty() {
                return Ok(());
            }
            self.current = Some(TextRun {
                x0: x,
                x1: x,
                y,
                size,
                text: String::new(),
            });
        }
        if let Some(run) = self.current.as_mut() {
            run.text.push_str(char);
            if !char.trim().is_empty() {
                run.x1 = x + advance;
            } else {
                run.x1 = run.x1.max(x + advance);
            }
        }
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        self.flush();
        Ok(())
    }
}

/// Every shown string on `page` with its position, decoded through the
/// page's fonts.
pub fn page_runs(doc: &Document, page: u32) -> Result<Vec<TextRun>> {
    let mut collector = RunCollector::default();
    // font parsing inside pdf-extract can panic on malformed programs
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| output_doc_page(doc, &mut collector, page)));
    match outcome {
        Ok(Ok(())) => Ok(collector.runs),
        Ok(Err(e)) => Err(anyhow!("Failed to read text on page {}: {}", page, e)),
        Err(_) => Err(anyhow!("Text extraction panicked on page {}", page)),
    }
}
