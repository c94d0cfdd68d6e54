//! Error kinds surfaced by dataset loading and configuration.
//!
//! Per-record problems (a non-numeric field, an unknown weekday) are never
//! errors: aggregators skip those records silently.

/// Failures that stop a dataset from loading at all.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// The server answered a static file request with a non-success status.
    #[error("request for {url} failed with status {status}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// A month selection did not match any monthly pickup dataset.
    #[error("no monthly dataset matches '{0}'")]
    UnknownMonth(String),

    /// The boundary file parsed as GeoJSON but was not a `FeatureCollection`.
    #[error("boundary file is not a GeoJSON FeatureCollection")]
    NotAFeatureCollection,

    /// An environment or CLI setting could not be used.
    #[error("invalid value '{value}' for setting {name}")]
    InvalidSetting {
        /// The setting name (e.g. `MAX_ROWS`).
        name: &'static str,
        /// The rejected raw value.
        value: String,
    },
}
