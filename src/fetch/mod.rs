//! Static file retrieval for datasets.
//!
//! A source is either a local path or an `http(s)://` URL. Sources ending
//! in `.gz` are gunzipped after retrieval.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use std::io::Read;

use anyhow::{Context, Result};
use bytes::Bytes;
use flate2::read::GzDecoder;
use tracing::debug;

use crate::error::AnalyticsError;

pub fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Joins a data directory (or base URL) and a file name with a single `/`.
pub fn join_source(base: &str, file: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), file)
}

/// GETs `url` and returns the body. Non-2xx responses are errors.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Bytes> {
    let resp = client.get(url.parse()?).await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(AnalyticsError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        }
        .into());
    }

    Ok(resp.bytes().await?)
}

/// Loads a source from disk or over HTTP, decompressing `.gz` sources.
pub async fn read_source<C: HttpClient>(client: &C, source: &str) -> Result<Bytes> {
    let raw = if is_remote(source) {
        fetch_bytes(client, source).await?
    } else {
        Bytes::from(
            tokio::fs::read(source)
                .await
                .with_context(|| format!("failed to read {source}"))?,
        )
    };
    debug!(source, bytes = raw.len(), "Source loaded");

    if source.ends_with(".gz") {
        gunzip(&raw).with_context(|| format!("failed to decompress {source}"))
    } else {
        Ok(raw)
    }
}

fn gunzip(bytes: &[u8]) -> Result<Bytes> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(Bytes::from(out))
}
