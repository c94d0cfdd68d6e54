use std::num::NonZeroUsize;

use chrono::Weekday;
use trip_analytics::boundary::{FALLBACK_COLOR, UNKNOWN_BOROUGH, borough_color, classify_collection};
use trip_analytics::config::{DURATION_FIELD, LAT_FIELD, LON_FIELD, Settings};
use trip_analytics::duration::parse_durations;
use trip_analytics::fetch::BasicClient;
use trip_analytics::pipeline::Dashboard;
use trip_analytics::record::{Record, parse_records};
use trip_analytics::report::DurationReport;
use trip_analytics::spatial::{GridConfig, aggregate};
use trip_analytics::temporal::{TemporalFields, TemporalMatrix};

fn fixtures_dir() -> String {
    format!("{}/tests/fixtures", env!("CARGO_MANIFEST_DIR"))
}

fn grid(max_rows: usize) -> GridConfig {
    GridConfig {
        bin_size: 0.01,
        max_rows: NonZeroUsize::new(max_rows).unwrap(),
        lat_field: LAT_FIELD,
        lon_field: LON_FIELD,
    }
}

#[test]
fn test_heatmap_from_cleaned_dataset() {
    let records = parse_records(include_bytes!("fixtures/UberDatasetCleaned.csv")).unwrap();
    assert_eq!(records.len(), 20);

    let matrix = TemporalMatrix::from_records(&records, TemporalFields::default());

    // unknown weekday and non-numeric hour rows are skipped
    assert_eq!(matrix.total(), 18);
    assert_eq!(matrix.get(Weekday::Mon, 11), Some(2));
    assert_eq!(matrix.get(Weekday::Wed, 17), Some(2));
    assert_eq!(matrix.get(Weekday::Tue, 12), Some(0));
}

#[test]
fn test_end_to_end_three_rows() {
    let rows = vec![
        Record::from_pairs([("day", "Monday"), ("start_hour", "5")]),
        Record::from_pairs([("day", "Monday"), ("start_hour", "5")]),
        Record::from_pairs([("day", "Friday"), ("start_hour", "23")]),
    ];
    let matrix = TemporalMatrix::from_records(&rows, TemporalFields::default());

    for (day, hours) in matrix.rows().iter().enumerate() {
        for (hour, count) in hours.iter().enumerate() {
            let expected = match (day, hour) {
                (1, 5) => 2,
                (5, 23) => 1,
                _ => 0,
            };
            assert_eq!(*count, expected, "day {day} hour {hour}");
        }
    }
}

#[test]
fn test_durations_from_cleaned_dataset() {
    let records = parse_records(include_bytes!("fixtures/UberDatasetCleaned.csv")).unwrap();
    let samples = parse_durations(&records, DURATION_FIELD);
    assert_eq!(samples.len(), 19);

    let report = DurationReport::from_samples(&samples);
    let fit = report.fit.unwrap();

    // floor(19 * 0.95) = 18, the largest of 19 values
    assert_eq!(fit.threshold, 67.0);
    assert_eq!(fit.samples.len(), 19);
    assert_eq!(fit.curve.len(), 101);
    assert_eq!(fit.curve[0].x, 6.0);
    assert_eq!(fit.curve[100].x, 67.0);
    assert_eq!(fit.histogram.iter().map(|b| b.count).sum::<u64>(), 19);
}

#[test]
fn test_pickups_without_subsampling() {
    let records = parse_records(include_bytes!("fixtures/uber-raw-data-apr14.csv")).unwrap();
    let cells = aggregate(&records, &grid(1000));

    // 12 rows, one with an unparseable latitude
    assert_eq!(cells.iter().map(|c| c.count).sum::<u64>(), 11);
    assert!(cells.iter().all(|c| c.count > 0));
}

#[test]
fn test_pickups_with_subsampling() {
    let records = parse_records(include_bytes!("fixtures/uber-raw-data-apr14.csv")).unwrap();
    // 12 rows, ceiling 5 -> stride 3 -> rows 0, 3, 6, 9
    let cells = aggregate(&records, &grid(5));

    assert_eq!(cells.len(), 3);
    assert_eq!(cells.iter().map(|c| c.count).sum::<u64>(), 4);
    assert_eq!(cells[1].count, 2);
    assert_eq!(aggregate(&records, &grid(5)), cells);
}

#[test]
fn test_boundaries_from_fixture() {
    let text = include_str!("fixtures/nyc-zip-code-tabulation-areas-polygons.geojson");
    let shapes = classify_collection(text).unwrap();

    // 1 polygon ring + 2 multipolygon rings + 1 unnamed ring; null geometry skipped
    assert_eq!(shapes.len(), 4);

    let queens: Vec<_> = shapes.iter().filter(|s| s.borough == "Queens").collect();
    assert_eq!(queens.len(), 2);
    assert!(queens.iter().all(|s| s.fill_color == borough_color("Queens")));

    let unknown = shapes.iter().find(|s| s.borough == UNKNOWN_BOROUGH).unwrap();
    assert_eq!(unknown.fill_color, FALLBACK_COLOR);
    assert!(shapes.iter().all(|s| s.borough != "Brooklyn"));
}

#[tokio::test]
async fn test_dashboard_initial_load_from_fixtures() {
    let settings = Settings::default()
        .with_overrides(Some(fixtures_dir()), Some(5), None)
        .unwrap();
    let mut dashboard = Dashboard::new(BasicClient::new().unwrap(), settings);

    dashboard.initial_load().await.unwrap();

    assert_eq!(dashboard.heatmap.state().ready().unwrap().total, 18);
    assert_eq!(dashboard.durations.state().ready().unwrap().raw_count, 19);
    assert_eq!(dashboard.boundaries.state().ready().unwrap().shapes.len(), 4);

    let pickups = dashboard.pickups.state().ready().unwrap();
    assert_eq!(pickups.month.key, "apr14");
    assert_eq!(pickups.region_count, 3);
    assert_eq!(pickups.count_range, Some((1, 2)));
}

#[tokio::test]
async fn test_dashboard_missing_month_stays_loading() {
    let settings = Settings::default()
        .with_overrides(Some(fixtures_dir()), None, None)
        .unwrap();
    let mut dashboard = Dashboard::new(BasicClient::new().unwrap(), settings);

    // apr14 exists in the fixtures, may14 does not; may14 was selected last
    dashboard.select_months(&["apr14", "may14"]).await.unwrap();

    assert!(dashboard.pickups.state().is_loading());
}
