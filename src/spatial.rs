//! Grid aggregation of pickup coordinates for the bubble map.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use serde::Serialize;

use crate::record::Record;

/// Marker size range, in pixels, for the smallest and largest cell counts.
pub const MIN_BUBBLE_PX: f64 = 6.0;
pub const MAX_BUBBLE_PX: f64 = 28.0;
/// Marker size used when every cell has the same count.
pub const UNIFORM_BUBBLE_PX: f64 = 10.0;

/// Aggregation parameters.
#[derive(Debug, Clone, Copy)]
pub struct GridConfig {
    /// Lattice resolution in degrees.
    pub bin_size: f64,
    /// Ceiling on rows considered before subsampling kicks in.
    pub max_rows: NonZeroUsize,
    pub lat_field: &'static str,
    pub lon_field: &'static str,
}

/// One occupied lattice cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub lat: f64,
    pub lon: f64,
    pub count: u64,
}

/// Row stride used to bring `total` rows under `ceiling`.
///
/// Returns 1 when no subsampling is needed, otherwise `ceil(total / ceiling)`.
pub fn sample_stride(total: usize, ceiling: NonZeroUsize) -> usize {
    if total <= ceiling.get() {
        1
    } else {
        total.div_ceil(ceiling.get())
    }
}

/// Takes every `stride`-th record starting from the first, keeping order.
pub fn subsample(records: &[Record], ceiling: NonZeroUsize) -> impl Iterator<Item = &Record> {
    records.iter().step_by(sample_stride(records.len(), ceiling))
}

/// Snaps `value` to the index of the nearest multiple of `bin_size`.
/// Halfway values round towards positive infinity.
fn bin_index(value: f64, bin_size: f64) -> i64 {
    (value / bin_size + 0.5).floor() as i64
}

fn parse_coord(record: &Record, field: &str) -> Option<f64> {
    let value: f64 = record.get(field)?.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Counts records per lattice cell.
///
/// Cells come out in order of first occurrence. Records whose latitude or
/// longitude does not parse are skipped.
pub fn aggregate(records: &[Record], config: &GridConfig) -> Vec<GridCell> {
    let mut index: HashMap<(i64, i64), usize> = HashMap::new();
    let mut cells: Vec<GridCell> = Vec::new();

    for record in subsample(records, config.max_rows) {
        let (Some(lat), Some(lon)) = (
            parse_coord(record, config.lat_field),
            parse_coord(record, config.lon_field),
        ) else {
            continue;
        };

        let key = (
            bin_index(lat, config.bin_size),
            bin_index(lon, config.bin_size),
        );

        let slot = *index.entry(key).or_insert_with(|| {
            cells.push(GridCell {
                lat: key.0 as f64 * config.bin_size,
                lon: key.1 as f64 * config.bin_size,
                count: 0,
            });
            cells.len() - 1
        });
        cells[slot].count += 1;
    }

    cells
}

/// Smallest and largest cell count, or `None` for an empty list.
pub fn count_range(cells: &[GridCell]) -> Option<(u64, u64)> {
    let min = cells.iter().map(|c| c.count).min()?;
    let max = cells.iter().map(|c| c.count).max()?;
    Some((min, max))
}

/// Marker sizes scaled linearly between [`MIN_BUBBLE_PX`] and [`MAX_BUBBLE_PX`].
pub fn bubble_sizes(cells: &[GridCell]) -> Vec<f64> {
    let Some((min, max)) = count_range(cells) else {
        return Vec::new();
    };

    cells
        .iter()
        .map(|c| {
            if max == min {
                UNIFORM_BUBBLE_PX
            } else {
                let norm = (c.count - min) as f64 / (max - min) as f64;
                MIN_BUBBLE_PX + norm * (MAX_BUBBLE_PX - MIN_BUBBLE_PX)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_rows: usize) -> GridConfig {
        GridConfig {
            bin_size: 0.01,
            max_rows: NonZeroUsize::new(max_rows).unwrap(),
            lat_field: "Lat",
            lon_field: "Lon",
        }
    }

    fn pickup(lat: &'static str, lon: &'static str) -> Record {
        Record::from_pairs([("Lat", lat), ("Lon", lon)])
    }

    #[test]
    fn test_stride_without_subsampling() {
        let ceiling = NonZeroUsize::new(10).unwrap();
        assert_eq!(sample_stride(0, ceiling), 1);
        assert_eq!(sample_stride(10, ceiling), 1);
    }

    #[test]
    fn test_stride_rounds_up() {
        let ceiling = NonZeroUsize::new(10).unwrap();
        assert_eq!(sample_stride(11, ceiling), 2);
        assert_eq!(sample_stride(25, ceiling), 3);
        assert_eq!(sample_stride(100, ceiling), 10);
    }

    #[test]
    fn test_subsample_counts() {
        let rows: Vec<Record> = (0..25).map(|_| pickup("40.7", "-73.9")).collect();

        // 25 rows, ceiling 10 -> stride 3 -> ceil(25 / 3) = 9 rows
        let taken = subsample(&rows, NonZeroUsize::new(10).unwrap()).count();
        assert_eq!(taken, 9);

        let all = subsample(&rows, NonZeroUsize::new(25).unwrap()).count();
        assert_eq!(all, 25);
    }

    #[test]
    fn test_aggregate_groups_nearby_points() {
        let rows = vec![
            pickup("40.7512", "-73.9821"),
            pickup("40.7488", "-73.9779"),
            pickup("40.6401", "-73.7781"),
        ];
        let cells = aggregate(&rows, &config(100));

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].count, 2);
        assert!((cells[0].lat - 40.75).abs() < 1e-9);
        assert!((cells[0].lon - -73.98).abs() < 1e-9);
        assert_eq!(cells[1].count, 1);
    }

    #[test]
    fn test_aggregate_rounds_half_up_on_negative_values() {
        let coarse = GridConfig {
            bin_size: 0.5,
            ..config(100)
        };
        let rows = vec![pickup("0.25", "-0.25")];
        let cells = aggregate(&rows, &coarse);

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].lat, 0.5);
        assert_eq!(cells[0].lon, 0.0);
    }

    #[test]
    fn test_aggregate_skips_bad_coordinates() {
        let rows = vec![
            pickup("abc", "-73.9"),
            pickup("40.7", ""),
            pickup("inf", "-73.9"),
            Record::from_pairs([("Lat", "40.7")]),
            pickup("40.7", "-73.9"),
        ];
        let cells = aggregate(&rows, &config(100));

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 1);
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let rows: Vec<Record> = (0..50)
            .map(|i| if i % 2 == 0 { pickup("40.70", "-73.90") } else { pickup("40.80", "-73.95") })
            .collect();
        let first = aggregate(&rows, &config(7));
        let second = aggregate(&rows, &config(7));
        assert_eq!(first, second);
    }

    #[test]
    fn test_aggregate_counts_only_sampled_rows() {
        let rows: Vec<Record> = (0..30).map(|_| pickup("40.7", "-73.9")).collect();
        let cells = aggregate(&rows, &config(10));
        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].count, 10);
    }

    #[test]
    fn test_bubble_sizes_scale_linearly() {
        let cells = vec![
            GridCell { lat: 0.0, lon: 0.0, count: 1 },
            GridCell { lat: 0.0, lon: 0.01, count: 6 },
            GridCell { lat: 0.0, lon: 0.02, count: 11 },
        ];
        assert_eq!(count_range(&cells), Some((1, 11)));
        assert_eq!(bubble_sizes(&cells), vec![6.0, 17.0, 28.0]);
    }

    #[test]
    fn test_bubble_sizes_uniform_and_empty() {
        let cells = vec![
            GridCell { lat: 0.0, lon: 0.0, count: 4 },
            GridCell { lat: 0.0, lon: 0.01, count: 4 },
        ];
        assert_eq!(bubble_sizes(&cells), vec![10.0, 10.0]);
        assert!(bubble_sizes(&[]).is_empty());
        assert_eq!(count_range(&[]), None);
    }
}
