//! Serializable artifacts handed to the charting side, one per visualization.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::boundary::{self, BoroughLabel, BoundaryShape, LegendEntry};
use crate::config::{MONTHLY_DATASETS, MonthlyDataset};
use crate::duration::DurationFit;
use crate::spatial::{self, GridCell};
use crate::temporal::{self, DAY_LABELS, TemporalMatrix};

/// Envelope written for every report.
#[derive(Debug, Serialize)]
pub struct Report<T> {
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: T,
}

impl<T> Report<T> {
    pub fn new(body: T) -> Self {
        Self {
            generated_at: Utc::now(),
            body,
        }
    }
}

/// Weekday × hour heatmap with axis labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapReport {
    pub day_labels: Vec<&'static str>,
    pub hour_labels: Vec<String>,
    pub total: u64,
    pub matrix: TemporalMatrix,
}

impl From<TemporalMatrix> for HeatmapReport {
    fn from(matrix: TemporalMatrix) -> Self {
        Self {
            day_labels: DAY_LABELS.to_vec(),
            hour_labels: temporal::hour_labels(),
            total: matrix.total(),
            matrix,
        }
    }
}

/// Aggregated pickups for one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PickupReport {
    pub month: MonthlyDataset,
    pub region_count: usize,
    pub count_range: Option<(u64, u64)>,
    pub cells: Vec<GridCell>,
    /// Marker size per entry of `cells`.
    pub bubble_sizes: Vec<f64>,
}

impl PickupReport {
    pub fn new(month: MonthlyDataset, cells: Vec<GridCell>) -> Self {
        Self {
            month,
            region_count: cells.len(),
            count_range: spatial::count_range(&cells),
            bubble_sizes: spatial::bubble_sizes(&cells),
            cells,
        }
    }
}

/// The monthly pickup datasets a dashboard can switch between.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCatalog {
    pub months: &'static [MonthlyDataset],
}

impl Default for MonthCatalog {
    fn default() -> Self {
        Self {
            months: MONTHLY_DATASETS,
        }
    }
}

/// Duration histogram and fitted curve. `fit` is absent when no sample parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationReport {
    pub raw_count: usize,
    pub fit: Option<DurationFit>,
}

impl DurationReport {
    pub fn from_samples(samples: &[f64]) -> Self {
        Self {
            raw_count: samples.len(),
            fit: DurationFit::from_samples(samples),
        }
    }
}

/// Borough overlay for the pickup map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryReport {
    pub shapes: Vec<BoundaryShape>,
    pub legend: Vec<LegendEntry>,
    pub labels: Vec<BoroughLabel>,
}

impl From<Vec<BoundaryShape>> for BoundaryReport {
    fn from(shapes: Vec<BoundaryShape>) -> Self {
        Self {
            shapes,
            legend: boundary::legend(),
            labels: boundary::labels(),
        }
    }
}
