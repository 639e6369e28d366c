use std::io::Write;

use chrono::NaiveDate;

/// Rows of text cells exactly as the detector laid them out.
pub type RawGrid = Vec<Vec<String>>;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Missing,
}

impl Cell {
    pub fn text(s: &str) -> Cell {
        Cell::Text(s.trim().to_string())
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Missing, or text that is only whitespace.
    pub fn is_blank(&self) -> bool {
        match self {
            Cell::Missing => true,
            Cell::Text(t) => t.trim().is_empty(),
            _ => false,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(t) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// CSV field form: shortest float repr, ISO dates, empty for missing.
    pub fn to_field(&self) -> String {
        match self {
            Cell::Text(t) => t.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Missing => String::new(),
        }
    }
}

/// A named in-memory table with ordered columns.
#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: &str, columns: Vec<String>) -> Self {
        Table {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Push a row, padding or truncating it to the column count.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Missing);
        self.rows.push(row);
    }

    pub fn retain_rows<F>(&mut self, mut keep: F)
    where
        F: FnMut(&[Cell]) -> bool,
    {
        self.rows.retain(|r| keep(r));
    }

    /// Apply `f` to every cell of `column`. Returns false if the column is absent.
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> bool
    where
        F: FnMut(&Cell) -> Cell,
    {
        let Some(idx) = self.column_index(column) else {
            return false;
        };
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        true
    }

    pub fn drop_columns(&mut self, names: &[&str]) {
        let keep: Vec<bool> = self
            .columns
            .iter()
            .map(|c| !names.contains(&c.as_str()))
            .collect();
        self.columns = filter_by(&self.columns, &keep);
        for row in &mut self.rows {
            *row = filter_by(row, &keep);
        }
    }

    pub fn rename_column(&mut self, idx: usize, name: &str) {
        if let Some(c) = self.columns.get_mut(idx) {
            *c = name.to_string();
        }
    }

    pub fn insert_column(&mut self, idx: usize, name: &str, value: Cell) {
        let idx = idx.min(self.columns.len());
        self.columns.insert(idx, name.to_string());
        for row in &mut self.rows {
            row.insert(idx, value.clone());
        }
    }

    /// Stack tables vertically over the union of their columns, in first-seen order.
    pub fn concat(name: &str, tables: &[Table]) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for t in tables {
            for c in &t.columns {
                if !columns.contains(c) {
                    columns.push(c.clone());
                }
            }
        }

        let mut out = Table::new(name, columns);
        for t in tables {
            let mapping: Vec<Option<usize>> =
                out.columns.iter().map(|c| t.column_index(c)).collect();
            for row in &t.rows {
                let cells = mapping
                    .iter()
                    .map(|m| m.and_then(|i| row.get(i).cloned()).unwrap_or(Cell::Missing))
                    .collect();
                out.rows.push(cells);
            }
        }
        out
    }

    pub fn head(&self, n: usize, name: &str) -> Table {
        Table {
            name: name.to_string(),
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    pub fn tail(&self, n: usize, name: &str) -> Table {
        let start = self.rows.len().saturating_sub(n);
        Table {
            name: name.to_string(),
            columns: self.columns.clone(),
            rows: self.rows[start..].to_vec(),
        }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> csv::Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(Cell::to_field))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn filter_by<T: Clone>(items: &[T], keep: &[bool]) -> Vec<T> {
    items
        .iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(item, _)| item.clone())
        .collect()
}
