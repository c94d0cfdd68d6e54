//! Output formatting and persistence for aggregation reports.
//!
//! Supports pretty-printing, JSON to stdout or a file, and CSV export of
//! pickup grid cells.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::{debug, info};

use crate::spatial::GridCell;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: std::fmt::Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Writes `value` as pretty JSON to `writer`, followed by a newline.
pub fn write_json<W: Write, T: Serialize>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes `value` as JSON to `path`, or to stdout when `path` is `None`.
pub fn emit_json<T: Serialize>(path: Option<&str>, value: &T) -> Result<()> {
    match path {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("failed to create {path}"))?;
            write_json(BufWriter::new(file), value)?;
            info!(path, "Report written");
        }
        None => write_json(io::stdout().lock(), value)?,
    }
    Ok(())
}

/// Writes grid cells to a CSV file with a `lat,lon,count` header,
/// replacing any existing file.
pub fn write_cells_csv(path: &str, cells: &[GridCell]) -> Result<()> {
    let existed = Path::new(path).exists();
    debug!(path, existed, rows = cells.len(), "Writing grid cells CSV");

    let mut writer = WriterBuilder::new().has_headers(true).from_path(path)?;
    for cell in cells {
        writer.serialize(cell)?;
    }
    writer.flush()?;

    Ok(())
}
