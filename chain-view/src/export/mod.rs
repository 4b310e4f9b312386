//! Export serializers.
//!
//! Renders a collection to bytes for an export sink:
//! - Delimited text (CSV) in the order the records are given
//! - A structured JSON document describing the current view
//! - A bulk JSON document of an unfiltered record set
//!
//! Writing to disk is a thin helper; the serializers themselves only produce
//! strings.

pub mod delimited;
pub mod document;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

pub use delimited::{export_columns, to_csv, BOOKKEEPING_COLUMNS, CANONICAL_COLUMNS};
pub use document::{bulk_file_name, csv_file_name, view_file_name, BulkExport, ViewExport};

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Write `contents` to `dir/name`, creating `dir` if needed.
pub fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf, ExportError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(name);
    fs::write(&path, contents)?;
    info!("Wrote {} bytes to {}", contents.len(), path.display());
    Ok(path)
}
