//! CSV row parsing.
//!
//! The first row names the fields. Every later row becomes a [`Record`]
//! sharing those header names, so multi-million-row monthly files do not
//! duplicate column names per row.

use std::sync::Arc;

use anyhow::Result;
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

/// One parsed row: field name → raw string value, in column order.
#[derive(Debug, Clone)]
pub struct Record {
    headers: Arc<StringRecord>,
    values: StringRecord,
}

impl Record {
    /// Returns the raw value of `field`, or `None` if the column is absent
    /// or this row is too short to reach it.
    pub fn get(&self, field: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == field)?;
        self.values.get(idx)
    }

    /// Builds a record from explicit pairs; mostly useful in tests.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let (headers, values): (Vec<&str>, Vec<&str>) = pairs.into_iter().unzip();
        Self {
            headers: Arc::new(StringRecord::from(headers)),
            values: StringRecord::from(values),
        }
    }
}

/// Parses delimited text into records.
///
/// Rows are independent: a row that cannot be decoded (for example invalid
/// UTF-8) is dropped and parsing continues. Short or long rows are kept.
///
/// # Errors
///
/// Returns an error only if the header row itself cannot be read.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(bytes);
    let headers = Arc::new(rdr.headers()?.clone());

    let mut records = Vec::new();
    let mut dropped = 0usize;

    for result in rdr.records() {
        match result {
            Ok(values) => records.push(Record {
                headers: Arc::clone(&headers),
                values,
            }),
            Err(_) => dropped += 1,
        }
    }

    debug!(rows = records.len(), dropped, "CSV parsed");
    Ok(records)
}
