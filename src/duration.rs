//! Trip-duration distribution: outlier trimming, normal fit and display histogram.
//!
//! The top tail is cut at a nearest-rank 95th percentile, then a Gaussian
//! is fitted to what is left and scaled so it overlays a bar histogram.
//!
//! The curve is scaled as if the histogram had [`CURVE_SCALE_BINS`] bins,
//! while the display histogram uses [`HISTOGRAM_BINS`]. The two are kept
//! separate on purpose; the overlay is an approximation.

use serde::Serialize;

use crate::record::Record;

pub const TRIM_PERCENTILE: f64 = 0.95;
/// Number of intervals across [min, max]; the curve has one more point.
pub const CURVE_STEPS: usize = 100;
pub const CURVE_SCALE_BINS: usize = 12;
pub const HISTOGRAM_BINS: usize = 20;
/// Substituted for a zero variance so the density stays finite.
pub const VARIANCE_FLOOR: f64 = 1e-6;

/// A point on the fitted curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

/// One equal-width histogram bar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: u64,
}

/// Everything the duration panel needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationFit {
    /// Samples at or below `threshold`, in input order.
    pub samples: Vec<f64>,
    pub threshold: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub curve: Vec<CurvePoint>,
    pub histogram: Vec<HistogramBin>,
}

impl DurationFit {
    /// Trims and fits `samples`. Returns `None` for an empty input.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let threshold = nearest_rank(&sorted, TRIM_PERCENTILE)?;

        let trimmed = trim_above(samples, threshold);
        let avg = mean(&trimmed);
        let var = variance(&trimmed, avg);
        let std_dev = (if var == 0.0 { VARIANCE_FLOOR } else { var }).sqrt();

        let curve = fitted_curve(&trimmed, avg, std_dev);
        let histogram = histogram(&trimmed, HISTOGRAM_BINS);

        Some(Self {
            samples: trimmed,
            threshold,
            mean: avg,
            std_dev,
            curve,
            histogram,
        })
    }
}

/// Reads `field` from every record as a number, skipping values that are
/// missing, non-numeric or non-finite.
pub fn parse_durations(records: &[Record], field: &str) -> Vec<f64> {
    records
        .iter()
        .filter_map(|r| r.get(field)?.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

/// Nearest-rank percentile of an ascending slice: the value at
/// `floor(len * q)`, clamped to the last element. No interpolation.
pub fn nearest_rank(sorted: &[f64], q: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let idx = ((sorted.len() as f64 * q).floor() as usize).min(last);
    Some(sorted[idx])
}

/// Keeps every sample `<= threshold`, preserving order.
pub fn trim_above(samples: &[f64], threshold: f64) -> Vec<f64> {
    samples.iter().copied().filter(|v| *v <= threshold).collect()
}

/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance given a pre-computed mean. Returns 0.0 for empty input.
pub fn variance(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
    )
}

fn normal_pdf(x: f64, mean: f64, std_dev: f64) -> f64 {
    let z = (x - mean) / std_dev;
    (-0.5 * z * z).exp() / (std_dev * (2.0 * std::f64::consts::PI).sqrt())
}

/// `CURVE_STEPS + 1` points of the normal density across [min, max] of
/// `values`, scaled by `values.len() * bin_width`.
pub fn fitted_curve(values: &[f64], mean: f64, std_dev: f64) -> Vec<CurvePoint> {
    let Some((lo, hi)) = min_max(values) else {
        return Vec::new();
    };
    let span = hi - lo;
    let bin_width = match span / CURVE_SCALE_BINS as f64 {
        w if w == 0.0 => 1.0,
        w => w,
    };
    let scale = values.len() as f64 * bin_width;

    (0..=CURVE_STEPS)
        .map(|i| {
            let x = lo + span * i as f64 / CURVE_STEPS as f64;
            CurvePoint {
                x,
                y: normal_pdf(x, mean, std_dev) * scale,
            }
        })
        .collect()
}

/// Equal-width histogram over [min, max] with the last bin closed.
/// All-equal input collapses to a single bin.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let Some((lo, hi)) = min_max(values) else {
        return Vec::new();
    };
    if bins == 0 {
        return Vec::new();
    }
    if hi == lo {
        return vec![HistogramBin {
            start: lo,
            end: hi,
            count: values.len() as u64,
        }];
    }

    let width = (hi - lo) / bins as f64;
    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: lo + width * i as f64,
            end: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }

    out
}
