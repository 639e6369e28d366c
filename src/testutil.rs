//! Fixtures shared by unit tests: a canned detector and tiny generated PDFs.

use std::collections::HashMap;

use anyhow::Result;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, StringFormat, Stream};

use crate::detect::{DetectOptions, TableDetector};
use crate::table::RawGrid;

/// Returns canned grids per page; unknown pages yield no tables.
#[derive(Default)]
pub struct FixedDetector {
    pages: HashMap<u32, Vec<RawGrid>>,
}

impl FixedDetector {
    pub fn with_page(mut self, page: u32, grids: Vec<RawGrid>) -> Self {
        self.pages.insert(page, grids);
        self
    }
}

impl TableDetector for FixedDetector {
    fn detect(&self, page: u32, _options: &DetectOptions) -> Result<Vec<RawGrid>> {
        Ok(self.pages.get(&page).cloned().unwrap_or_default())
    }
}

pub fn grid(rows: &[&[&str]]) -> RawGrid {
    rows.iter()
        .map(|r| r.iter().map(|c| c.to_string()).collect())
        .collect()
}

/// Five sections laid out the way the markets page reads after detection.
/// 14 rows: 5 titles, 9 data rows, one of them (Gold) without YTD.
pub fn markets_grid() -> RawGrid {
    grid(&[
        &["Equities", "Price", "1M", "3M", "6M", "12M", "YTD", "QTD", ""],
        &["S&P 500", "5,808", "1.1", "3.2", "10.4", "34.5", "21.8", "0.6", ""],
        &["Euro Stoxx 50", "4,943", "-0.9", "1.3", "-1.2", "19.1", "9.3", "-0.5", "*"],
        &["Rates (government bonds)", "Yield (%)", "1M", "3M", "6M", "12M", "YTD", "QTD", ""],
        &["US 10Y", "4.21", "-0.4", "1.9", "2.5", "8.3", "1.1", "0.2", ""],
        &["Bund 10Y", "2.29", "0.1", "2.2", "1.9", "6.9", "0.7", "0.4", ""],
        &["Credit", "QAS (bp)", "1M", "3M", "6M", "12M", "YTD", "QTD", ""],
        &["EUR IG", "104", "0.3", "2.4", "3.1", "9.0", "3.5", "0.8", ""],
        &["Commodities", "Price", "1M", "3M", "6M", "12M", "YTD", "QTD", ""],
        &["Brent", "74.4", "2.5", "-6.3", "-9.9", "-16.2", "-3.5", "4.1", ""],
        &["Gold", "2,734", "4.1", "11.2", "15.0", "37.9", "", "3.8", ""],
        &["Exchange rates", "", "Price", "1M", "3M", "6M", "12M", "YTD", "QTD"],
        &["EUR-USD", "", "1.08", "-2.9", "0.6", "-0.4", "2.1", "-2.2", "-2.9"],
        &["USD-JPY", "", "152.3", "6.7", "-0.6", "-3.1", "1.5", "8.0", "5.9"],
    ])
}

pub fn events_grid() -> RawGrid {
    grid(&[
        &["Major events next week", "", "", "", "", "", "", ""],
        &["Date", "Time", "Country", "Indicator/Event", "Period", "UniCredit Estimates", "Consensus (Bloomberg)", "Previous"],
        &["Mon, 28 Oct", "10:00", "DE", "Ifo business climate", "Oct", "86.0", "85.6", "85.4"],
        &["", "14:30", "US", "Durable goods orders", "Sep", "-1.0", "-1.0", "0.0"],
        &["", "", "", "", "", "", "", ""],
        &["Wed, 30 Oct", "11:00", "EMU", "GDP (flash)", "Q3", "0.2", "n.a.", "0.2"],
        &["", "13:30", "US", "GDP", "Q3", "3.0", "3,000", "3.0"],
    ])
}

/// Place each non-blank cell of `grid` on a page: one row every 20pt from the
/// top, the label column at x=40 and the rest `col_width` apart from x=200.
pub fn layout_grid(grid: &RawGrid, col_width: f64) -> Vec<(f64, f64, String)> {
    let mut items = Vec::new();
    for (r, row) in grid.iter().enumerate() {
        let y = 800.0 - 20.0 * r as f64;
        for (c, cell) in row.iter().enumerate() {
            if cell.trim().is_empty() {
                continue;
            }
            let x = if c == 0 { 40.0 } else { 200.0 + col_width * (c - 1) as f64 };
            items.push((x, y, cell.clone()));
        }
    }
    items
}

/// Three-page report: cover, markets at a glance, major events.
pub fn report_pdf() -> Vec<u8> {
    let cover = vec![(40.0, 800.0, "Macro & Markets Weekly Focus".to_string())];
    build_pdf(&[cover, layout_grid(&markets_grid(), 70.0), layout_grid(&events_grid(), 130.0)])
}

/// Build a PDF with one Helvetica 10pt text run per `(x, y, text)` item,
/// one inner vec per page. Text must be ASCII.
pub fn build_pdf<S: AsRef<str>>(pages: &[Vec<(f64, f64, S)>]) -> Vec<u8> {
    let raw: Vec<Vec<(f64, f64, Vec<u8>)>> = pages
        .iter()
        .map(|items| {
            items
                .iter()
                .map(|(x, y, text)| (*x, *y, text.as_ref().as_bytes().to_vec()))
                .collect()
        })
        .collect();
    build_pdf_raw(&raw)
}

/// Like [`build_pdf`], with each string given as WinAnsi-encoded bytes.
pub fn build_pdf_raw(pages: &[Vec<(f64, f64, Vec<u8>)>]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for items in pages {
        let mut operations = Vec::new();
        for (x, y, text) in items {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 10.into()]));
            operations.push(Operation::new(
                "Td",
                vec![Object::Integer(x.round() as i64), Object::Integer(y.round() as i64)],
            ));
            operations.push(Operation::new(
                "Tj",
                vec![Object::String(text.clone(), StringFormat::Literal)],
            ));
            operations.push(Operation::new("ET", vec![]));
        }
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}
