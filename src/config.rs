//! Dataset catalogue and runtime settings.
//!
//! Settings come from the environment (a `.env` file is loaded by the
//! binary) and may be overridden by CLI flags:
//!
//! | Variable    | Default | Meaning                                   |
//! |-------------|---------|-------------------------------------------|
//! | `DATA_DIR`  | `data`  | Local directory or `http(s)://` base URL  |
//! | `MAX_ROWS`  | 200000  | Row ceiling before pickup subsampling     |
//! | `GRID_SIZE` | 0.01    | Pickup lattice resolution, in degrees     |

use std::num::NonZeroUsize;

use anyhow::Result;
use serde::Serialize;

use crate::error::AnalyticsError;
use crate::fetch::join_source;
use crate::spatial::GridConfig;
use crate::temporal::TemporalFields;

pub const CLEANED_DATASET: &str = "UberDatasetCleaned.csv";
pub const BOUNDARY_FILE: &str = "nyc-zip-code-tabulation-areas-polygons.geojson";

pub const DAY_FIELD: &str = "day";
pub const HOUR_FIELD: &str = "start_hour";
pub const DURATION_FIELD: &str = "duration";
pub const LAT_FIELD: &str = "Lat";
pub const LON_FIELD: &str = "Lon";

pub const DEFAULT_DATA_DIR: &str = "data";
pub const DEFAULT_MAX_ROWS: usize = 200_000;
pub const DEFAULT_GRID_SIZE: f64 = 0.01;

/// One month of raw pickups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthlyDataset {
    pub key: &'static str,
    pub file: &'static str,
    pub label: &'static str,
}

pub static MONTHLY_DATASETS: &[MonthlyDataset] = &[
    MonthlyDataset { key: "apr14", file: "uber-raw-data-apr14.csv", label: "April 2014" },
    MonthlyDataset { key: "may14", file: "uber-raw-data-may14.csv", label: "May 2014" },
    MonthlyDataset { key: "jun14", file: "uber-raw-data-jun14.csv", label: "June 2014" },
    MonthlyDataset { key: "jul14", file: "uber-raw-data-jul14.csv", label: "July 2014" },
    MonthlyDataset { key: "aug14", file: "uber-raw-data-aug14.csv", label: "August 2014" },
    MonthlyDataset { key: "sep14", file: "uber-raw-data-sep14.csv", label: "September 2014" },
];

/// Looks up a month by key (`"apr14"`) or label (`"April 2014"`), ignoring case.
pub fn find_month(selection: &str) -> Result<&'static MonthlyDataset, AnalyticsError> {
    MONTHLY_DATASETS
        .iter()
        .find(|m| m.key.eq_ignore_ascii_case(selection) || m.label.eq_ignore_ascii_case(selection))
        .ok_or_else(|| AnalyticsError::UnknownMonth(selection.to_string()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: String,
    pub max_rows: NonZeroUsize,
    pub grid_size: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            max_rows: NonZeroUsize::new(DEFAULT_MAX_ROWS).unwrap_or(NonZeroUsize::MIN),
            grid_size: DEFAULT_GRID_SIZE,
        }
    }
}

impl Settings {
    /// Reads `DATA_DIR`, `MAX_ROWS` and `GRID_SIZE` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`Settings::from_env`] with an injectable variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let max_rows = match lookup("MAX_ROWS") {
            Some(raw) => parse_max_rows(&raw)?,
            None => defaults.max_rows,
        };
        let grid_size = match lookup("GRID_SIZE") {
            Some(raw) => parse_grid_size(&raw)?,
            None => defaults.grid_size,
        };

        Ok(Self {
            data_dir: lookup("DATA_DIR").unwrap_or(defaults.data_dir),
            max_rows,
            grid_size,
        })
    }

    /// Applies CLI overrides on top of the environment.
    pub fn with_overrides(
        mut self,
        data_dir: Option<String>,
        max_rows: Option<usize>,
        grid_size: Option<f64>,
    ) -> Result<Self> {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        if let Some(rows) = max_rows {
            self.max_rows = NonZeroUsize::new(rows).ok_or(AnalyticsError::InvalidSetting {
                name: "MAX_ROWS",
                value: rows.to_string(),
            })?;
        }
        if let Some(size) = grid_size {
            self.grid_size = check_grid_size(size, &size.to_string())?;
        }
        Ok(self)
    }

    pub fn grid_config(&self) -> GridConfig {
        GridConfig {
            bin_size: self.grid_size,
            max_rows: self.max_rows,
            lat_field: LAT_FIELD,
            lon_field: LON_FIELD,
        }
    }

    pub fn temporal_fields(&self) -> TemporalFields<'static> {
        TemporalFields {
            day: DAY_FIELD,
            hour: HOUR_FIELD,
        }
    }

    pub fn cleaned_source(&self) -> String {
        join_source(&self.data_dir, CLEANED_DATASET)
    }

    pub fn month_source(&self, month: &MonthlyDataset) -> String {
        join_source(&self.data_dir, month.file)
    }

    pub fn boundary_source(&self) -> String {
        join_source(&self.data_dir, BOUNDARY_FILE)
    }
}

fn parse_max_rows(raw: &str) -> Result<NonZeroUsize> {
    let rows = raw
        .trim()
        .parse::<NonZeroUsize>()
        .map_err(|_| AnalyticsError::InvalidSetting {
            name: "MAX_ROWS",
            value: raw.to_string(),
        })?;
    Ok(rows)
}

fn parse_grid_size(raw: &str) -> Result<f64> {
    check_grid_size(raw.trim().parse::<f64>().unwrap_or(f64::NAN), raw)
}

fn check_grid_size(size: f64, raw: &str) -> Result<f64> {
    if size.is_finite() && size > 0.0 {
        Ok(size)
    } else {
        Err(AnalyticsError::InvalidSetting {
            name: "GRID_SIZE",
            value: raw.to_string(),
        }
        .into())
    }
}
