use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::error::ReportError;
use crate::table::Table;

pub fn output_dir(output_path: &str) -> Result<&Path, ReportError> {
    if output_path.trim().is_empty() {
        return Err(ReportError::EmptyOutputPath);
    }
    Ok(Path::new(output_path))
}

/// Write `table` to `<dir>/<name>.csv`, replacing any earlier file.
pub fn write_table(table: &Table, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    let path = dir.join(format!("{}.csv", table.name));
    let file = File::create(&path).with_context(|| format!("Failed to create {:?}", path))?;
    table
        .write_csv(BufWriter::new(file))
        .with_context(|| format!("Failed to write {:?}", path))?;
    debug!(rows = table.len(), "Wrote {:?}", path);
    Ok(path)
}

/// Export every table to CSV. Returns the number of files written.
pub fn export_tables(tables: &[&Table], output_path: &str) -> Result<usize> {
    if tables.is_empty() {
        warn!("No tables to export");
        return Ok(0);
    }
    let dir = output_dir(output_path)?;
    for table in tables {
        write_table(table, dir)?;
    }
    info!("Exported {} tables to {:?}", tables.len(), dir);
    Ok(tables.len())
}

/// Pack the CSV files of `dir` into an in-memory ZIP, sorted by name.
pub fn zip_dir(dir: &Path) -> Result<Vec<u8>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {:?}", dir))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "csv"))
        .collect();
    files.sort();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    let mut buf = Vec::new();
    for path in &files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        buf.clear();
        File::open(path)
            .and_then(|mut f| f.read_to_end(&mut buf))
            .with_context(|| format!("Failed to read {:?}", path))?;
        zip.start_file(name, options)?;
        zip.write_all(&buf)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    fn table(name: &str) -> Table {
        let mut t = Table::new(name, vec!["name".into(), "12M".into()]);
        t.push_row(vec![Cell::text("DAX"), Cell::Number(12.5)]);
        t
    }

    #[test]
    fn writes_one_file_per_table() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let (a, b) = (table("equities"), table("credit"));
        let n = export_tables(&[&a, &b], out.to_str().unwrap()).unwrap();
        assert_eq!(n, 2);
        let csv = fs::read_to_string(out.join("equities.csv")).unwrap();
        assert_eq!(csv, "name,12M\nDAX,12.5\n");
        assert!(out.join("credit.csv").exists());
    }

    #[test]
    fn nothing_to_export_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(export_tables(&[], dir.path().to_str().unwrap()).unwrap(), 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn empty_output_path() {
        let t = table("equities");
        let err = export_tables(&[&t], "").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ReportError>(),
            Some(ReportError::EmptyOutputPath)
        ));
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("equities.csv"), "stale").unwrap();
        write_table(&table("equities"), dir.path()).unwrap();
        let csv = fs::read_to_string(dir.path().join("equities.csv")).unwrap();
        assert!(csv.starts_with("name,12M"));
    }

    #[test]
    fn zips_csv_files_only() {
        let dir = tempfile::tempdir().unwrap();
        write_table(&table("equities"), dir.path()).unwrap();
        write_table(&table("credit"), dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "skip").unwrap();

        let bytes = zip_dir(dir.path()).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(String::from).collect::<Vec<_>>();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(sorted, vec!["credit.csv", "equities.csv"]);

        let mut content = String::new();
        archive.by_name("equities.csv").unwrap().read_to_string(&mut content).unwrap();
        assert_eq!(content, "name,12M\nDAX,12.5\n");
    }
}
