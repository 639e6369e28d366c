use std::collections::HashMap;

use super::content::TextRun;
use crate::table::RawGrid;

/// Runs closer than this many font sizes are part of the same cell.
const CELL_GAP: f64 = 1.0;
/// Runs closer than this are glued without a space (kerned fragments).
const GLUE_GAP: f64 = 0.15;

/// A horizontal piece of text in one row, after gluing adjacent runs.
#[derive(Debug, Clone)]
struct Chunk {
    x0: f64,
    x1: f64,
    text: String,
}

impl Chunk {
    fn mid(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }
}

/// Stream-flavor table reconstruction: rows by vertical proximity, columns by
/// the horizontal extents of the most typical multi-cell rows.
///
/// Returns `None` when the page has no row with at least two cells.
pub fn build_grid(runs: &[TextRun], row_tol: f64) -> Option<RawGrid> {
    let rows = group_rows(runs, row_tol);
    let chunked: Vec<Vec<Chunk>> = rows.iter().map(|r| chunk_row(r)).collect();

    let spans = column_spans(&chunked)?;

    let grid = chunked
        .iter()
        .map(|row| {
            let mut cells = vec![String::new(); spans.len()];
            for chunk in row {
                let col = nearest_span(&spans, chunk.mid());
                if cells[col].is_empty() {
                    cells[col] = chunk.text.clone();
                } else {
                    cells[col].push(' ');
                    cells[col].push_str(&chunk.text);
                }
            }
            cells
        })
        .collect();
    Some(grid)
}

/// Top-to-bottom rows; a run joins the current row while it sits within
/// `row_tol` of the row's first run.
fn group_rows(runs: &[TextRun], row_tol: f64) -> Vec<Vec<&TextRun>> {
    let mut sorted: Vec<&TextRun> = runs.iter().collect();
    sorted.sort_by(|a, b| b.y.total_cmp(&a.y).then(a.x0.total_cmp(&b.x0)));

    let mut rows: Vec<Vec<&TextRun>> = Vec::new();
    let mut anchor = f64::NAN;
    for run in sorted {
        if rows.is_empty() || (anchor - run.y).abs() > row_tol {
            anchor = run.y;
            rows.push(Vec::new());
        }
        if let Some(row) = rows.last_mut() {
            row.push(run);
        }
    }

    for row in &mut rows {
        row.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }
    rows
}

fn chunk_row(row: &[&TextRun]) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    for run in row {
        let size = run.size.max(1.0);
        match chunks.last_mut() {
            Some(last) if run.x0 - last.x1 < CELL_GAP * size => {
                if run.x0 - last.x1 >= GLUE_GAP * size {
                    last.text.push(' ');
                }
                last.text.push_str(run.text.trim());
                last.x1 = last.x1.max(run.x1);
            }
            _ => chunks.push(Chunk {
                x0: run.x0,
                x1: run.x1,
                text: run.text.trim().to_string(),
            }),
        }
    }
    chunks
}

/// Column spans are the merged extents of chunks from rows that have at
/// least the most common multi-cell count.
fn column_spans(rows: &[Vec<Chunk>]) -> Option<Vec<(f64, f64)>> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in rows.iter().filter(|r| r.len() >= 2) {
        *counts.entry(row.len()).or_default() += 1;
    }
    let typical = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then(a.0.cmp(b.0)))
        .map(|(len, _)| *len)?;

    let mut intervals: Vec<(f64, f64)> = rows
        .iter()
        .filter(|r| r.len() >= typical)
        .flat_map(|r| r.iter().map(|c| (c.x0, c.x1)))
        .collect();
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut spans: Vec<(f64, f64)> = Vec::new();
    for (x0, x1) in intervals {
        match spans.last_mut() {
            Some(last) if x0 <= last.1 => last.1 = last.1.max(x1),
            _ => spans.push((x0, x1)),
        }
    }
    Some(spans)
}

fn nearest_span(spans: &[(f64, f64)], x: f64) -> usize {
    let distance = |(x0, x1): (f64, f64)| {
        if x < x0 {
            x0 - x
        } else if x > x1 {
            x - x1
        } else {
            0.0
        }
    };
    spans
        .iter()
        .enumerate()
        .min_by(|a, b| distance(*a.1).total_cmp(&distance(*b.1)))
        .map(|(i, _)| i)
        .unwrap_or(0)
}
