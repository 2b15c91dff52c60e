//! CSV table infrastructure.
//!
//! Tables are delimited text with a header row and no index column. Reading
//! checks that the columns a job needs are present before any row is
//! deserialised, so a wrong input file fails fast with the missing column
//! named. Extra columns are ignored.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File handling and CSV encoding live here; jobs in the
//! `nodes` crate only see typed rows.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors raised while reading or writing a table.
#[derive(Debug, Error)]
pub enum TableError {
    /// The file could not be opened, created, or flushed.
    #[error("cannot access {path}: {source}")]
    Io {
        /// Path of the table.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A required column is absent from the header row.
    #[error("{path} has no `{column}` column")]
    MissingColumn {
        /// Path of the table.
        path: PathBuf,
        /// Name of the missing column.
        column: String,
    },

    /// A row could not be parsed or written.
    #[error("invalid CSV in {path}: {source}")]
    Csv {
        /// Path of the table.
        path: PathBuf,
        /// Underlying CSV error (carries the record position when known).
        source: csv::Error,
    },
}

/// Reads every row of the table at `path`.
///
/// # Errors
///
/// - [`TableError::MissingColumn`] if a name in `required_columns` is not in
///   the header row.
/// - [`TableError::Csv`] if a row cannot be deserialised into `T` (including
///   blank values rejected by the row type).
/// - [`TableError::Io`] if the file cannot be opened.
pub fn read_rows<T: DeserializeOwned>(
    path: &Path,
    required_columns: &[&str],
) -> Result<Vec<T>, TableError> {
    let file = fs::File::open(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
    let csv_error = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    if let Some(missing) = required_columns
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(TableError::MissingColumn {
            path: path.to_path_buf(),
            column: missing.to_string(),
        });
    }

    let rows = reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_error)?;
    info!(path = %path.display(), rows = rows.len(), "Read table");
    Ok(rows)
}

/// Writes `rows` to `path` with a header row, replacing any existing file.
///
/// Parent directories are created as needed. When `rows` is empty, `columns`
/// is written as the header so the output still describes its layout.
///
/// # Errors
///
/// Returns [`TableError::Io`] or [`TableError::Csv`] if the file cannot be
/// created or written.
pub fn write_rows<T: Serialize>(
    path: &Path,
    columns: &[&str],
    rows: &[T],
) -> Result<(), TableError> {
    let io_error = |source| TableError::Io {
        path: path.to_path_buf(),
        source,
    };
    let csv_error = |source| TableError::Csv {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    let mut writer = csv::Writer::from_path(path).map_err(csv_error)?;
    if rows.is_empty() {
        debug!(path = %path.display(), "Writing header-only table");
        writer.write_record(columns).map_err(csv_error)?;
    }
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(io_error)?;

    info!(path = %path.display(), rows = rows.len(), "Wrote table");
    Ok(())
}
