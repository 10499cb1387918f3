//! CSV export of whatever record set is currently displayed.
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub const DEFAULT_FILE_NAME: &str = "exported_data.csv";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("nothing to export")]
    Empty,
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Write a header row of field names followed by one quoted row per
/// record. Returns the number of data rows written.
pub fn write_csv<W: Write, T: Serialize>(writer: W, records: &[T]) -> Result<usize, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(records.len())
}

/// Export to `path`, creating or truncating the file. An empty record set
/// leaves the filesystem untouched.
pub fn export_to_path<T: Serialize>(path: &Path, records: &[T]) -> Result<usize, ExportError> {
    if records.is_empty() {
        return Err(ExportError::Empty);
    }
    let file = File::create(path)?;
    let rows = write_csv(file, records)?;
    info!(rows, path = %path.display(), "exported records");
    Ok(rows)
}
