//! Load → parse → aggregate, per visualization, and the [`Dashboard`] that
//! owns the current result of each.
//!
//! Retrieval is async; each aggregation pass itself is synchronous and runs
//! to completion once its source has been read.

use anyhow::Result;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::boundary::{self, BoundaryShape};
use crate::config::{self, DURATION_FIELD, MonthlyDataset, Settings};
use crate::duration;
use crate::fetch::{HttpClient, read_source};
use crate::load::{Generation, Panel};
use crate::record::{Record, parse_records};
use crate::report::{BoundaryReport, DurationReport, HeatmapReport, PickupReport};
use crate::spatial::{self, GridCell, GridConfig};
use crate::temporal::{TemporalFields, TemporalMatrix};

/// Reads and parses a CSV source.
#[tracing::instrument(skip(client))]
pub async fn load_records<C: HttpClient>(client: &C, source: &str) -> Result<Vec<Record>> {
    let bytes = read_source(client, source).await?;
    let records = parse_records(&bytes)?;
    info!(rows = records.len(), "Records loaded");
    Ok(records)
}

#[tracing::instrument(skip(client, fields))]
pub async fn load_heatmap<C: HttpClient>(
    client: &C,
    source: &str,
    fields: TemporalFields<'_>,
) -> Result<TemporalMatrix> {
    let records = load_records(client, source).await?;
    Ok(TemporalMatrix::from_records(&records, fields))
}

#[tracing::instrument(skip(client, grid))]
pub async fn load_pickups<C: HttpClient>(
    client: &C,
    source: &str,
    grid: &GridConfig,
) -> Result<Vec<GridCell>> {
    let records = load_records(client, source).await?;
    let stride = spatial::sample_stride(records.len(), grid.max_rows);
    if stride > 1 {
        debug!(rows = records.len(), stride, "Subsampling pickups");
    }
    let cells = spatial::aggregate(&records, grid);
    info!(regions = cells.len(), "Pickups aggregated");
    Ok(cells)
}

#[tracing::instrument(skip(client))]
pub async fn load_durations<C: HttpClient>(
    client: &C,
    source: &str,
    field: &str,
) -> Result<DurationReport> {
    let records = load_records(client, source).await?;
    let samples = duration::parse_durations(&records, field);
    Ok(DurationReport::from_samples(&samples))
}

#[tracing::instrument(skip(client))]
pub async fn load_boundaries<C: HttpClient>(
    client: &C,
    source: &str,
) -> Result<Vec<BoundaryShape>> {
    let bytes = read_source(client, source).await?;
    let text = std::str::from_utf8(&bytes)?;
    boundary::classify_collection(text)
}

/// Current results of every visualization.
pub struct Dashboard<C> {
    client: C,
    settings: Settings,
    pub heatmap: Panel<HeatmapReport>,
    pub pickups: Panel<PickupReport>,
    pub durations: Panel<DurationReport>,
    pub boundaries: Panel<BoundaryReport>,
}

impl<C> Dashboard<C>
where
    C: HttpClient + Clone + 'static,
{
    pub fn new(client: C, settings: Settings) -> Self {
        Self {
            client,
            settings,
            heatmap: Panel::new("heatmap"),
            pickups: Panel::new("pickups"),
            durations: Panel::new("durations"),
            boundaries: Panel::new("boundaries"),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Loads the cleaned dataset once and feeds both the heatmap and the
    /// duration panels from it.
    pub async fn load_cleaned(&mut self) {
        let heatmap_gen = self.heatmap.begin();
        let durations_gen = self.durations.begin();
        let source = self.settings.cleaned_source();

        match load_records(&self.client, &source).await {
            Ok(records) => {
                let matrix = TemporalMatrix::from_records(&records, self.settings.temporal_fields());
                self.heatmap.commit(heatmap_gen, HeatmapReport::from(matrix));

                let samples = duration::parse_durations(&records, DURATION_FIELD);
                self.durations
                    .commit(durations_gen, DurationReport::from_samples(&samples));
            }
            Err(e) => {
                self.heatmap.fail(heatmap_gen, &e);
                self.durations.fail(durations_gen, &e);
            }
        }
    }

    pub async fn load_boundaries(&mut self) {
        let generation = self.boundaries.begin();
        let source = self.settings.boundary_source();

        match load_boundaries(&self.client, &source).await {
            Ok(shapes) => {
                self.boundaries.commit(generation, BoundaryReport::from(shapes));
            }
            Err(e) => self.boundaries.fail(generation, &e),
        }
    }

    /// Applies a sequence of month selections as if each superseded the
    /// previous one. All loads run concurrently; only the last selection's
    /// result is kept, whatever order they finish in.
    ///
    /// # Errors
    ///
    /// Fails before starting any load if a selection names no known month.
    pub async fn select_months<S: AsRef<str>>(&mut self, selections: &[S]) -> Result<()> {
        let months = selections
            .iter()
            .map(|s| config::find_month(s.as_ref()))
            .collect::<Result<Vec<&'static MonthlyDataset>, _>>()?;

        let mut set: JoinSet<(Generation, &'static MonthlyDataset, Result<Vec<GridCell>>)> =
            JoinSet::new();

        for month in months {
            let generation = self.pickups.begin();
            let source = self.settings.month_source(month);
            let grid = self.settings.grid_config();
            let client = self.client.clone();

            info!(month = month.label, generation = generation.get(), "Month selected");
            set.spawn(async move {
                let result = load_pickups(&client, &source, &grid).await;
                (generation, month, result)
            });
        }

        while let Some(joined) = set.join_next().await {
            let (generation, month, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "Pickup load task did not complete");
                    continue;
                }
            };

            match result {
                Ok(cells) => {
                    self.pickups
                        .commit(generation, PickupReport::new(*month, cells));
                }
                Err(e) => self.pickups.fail(generation, &e),
            }
        }

        Ok(())
    }

    /// Loads everything a fresh dashboard shows: the cleaned dataset, the
    /// boundary overlay and the first monthly pickup file.
    pub async fn initial_load(&mut self) -> Result<()> {
        self.load_cleaned().await;
        self.load_boundaries().await;
        let first = config::MONTHLY_DATASETS[0].key;
        self.select_months(&[first]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BasicClient;
    use std::env;
    use std::fs;

    fn temp_dir(name: &str) -> String {
        let dir = format!("{}/{}", env::temp_dir().display(), name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Every request comes back `404 Not Found`.
    #[derive(Clone)]
    struct NotFoundClient;

    #[async_trait::async_trait]
    impl HttpClient for NotFoundClient {
        async fn execute(&self, _req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
            let resp = http::Response::builder().status(404).body("").unwrap();
            Ok(resp.into())
        }
    }

    fn settings_for(dir: &str) -> Settings {
        Settings::default()
            .with_overrides(Some(dir.to_string()), Some(1000), None)
            .unwrap()
    }

    #[tokio::test]
    async fn test_load_cleaned_fills_both_panels() {
        let dir = temp_dir("trip_analytics_pipeline_cleaned");
        fs::write(
            format!("{dir}/{}", config::CLEANED_DATASET),
            "day,start_hour,duration\nMonday,5,10\nMonday,5,12\nFriday,23,30\n",
        )
        .unwrap();

        let mut dashboard = Dashboard::new(BasicClient::new().unwrap(), settings_for(&dir));
        dashboard.load_cleaned().await;

        let heatmap = dashboard.heatmap.state().ready().unwrap();
        assert_eq!(heatmap.total, 3);
        let durations = dashboard.durations.state().ready().unwrap();
        assert_eq!(durations.raw_count, 3);
        assert_eq!(durations.fit.as_ref().unwrap().threshold, 30.0);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_missing_file_leaves_panels_loading() {
        let dir = temp_dir("trip_analytics_pipeline_missing");
        let mut dashboard = Dashboard::new(BasicClient::new().unwrap(), settings_for(&dir));

        dashboard.load_cleaned().await;
        dashboard.load_boundaries().await;

        assert!(dashboard.heatmap.state().is_loading());
        assert!(dashboard.durations.state().is_loading());
        assert!(dashboard.boundaries.state().is_loading());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_select_months_keeps_last_selection() {
        let dir = temp_dir("trip_analytics_pipeline_months");
        fs::write(
            format!("{dir}/uber-raw-data-apr14.csv"),
            "Date/Time,Lat,Lon,Base\n4/1/2014 0:11:00,40.769,-73.9549,B02512\n",
        )
        .unwrap();
        fs::write(
            format!("{dir}/uber-raw-data-may14.csv"),
            "Date/Time,Lat,Lon,Base\n5/1/2014 0:02:00,40.7521,-73.9914,B02512\n5/1/2014 0:06:00,40.6965,-73.9715,B02512\n",
        )
        .unwrap();

        let mut dashboard = Dashboard::new(BasicClient::new().unwrap(), settings_for(&dir));
        dashboard.select_months(&["apr14", "may14"]).await.unwrap();

        let report = dashboard.pickups.state().ready().unwrap();
        assert_eq!(report.month.key, "may14");
        assert_eq!(report.region_count, 2);
        assert_eq!(dashboard.pickups.committed().unwrap().get(), 2);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_select_unknown_month_errors() {
        let dir = temp_dir("trip_analytics_pipeline_unknown");
        let mut dashboard = Dashboard::new(BasicClient::new().unwrap(), settings_for(&dir));

        assert!(dashboard.select_months(&["jan15"]).await.is_err());
        assert!(dashboard.pickups.committed().is_none());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_load_boundaries_from_file() {
        let dir = temp_dir("trip_analytics_pipeline_boundaries");
        fs::write(
            format!("{dir}/{}", config::BOUNDARY_FILE),
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"borough":"Queens"},"geometry":{"type":"Polygon","coordinates":[[[-73.8,40.7],[-73.7,40.7],[-73.7,40.8],[-73.8,40.7]]]}}]}"#,
        )
        .unwrap();

        let mut dashboard = Dashboard::new(BasicClient::new().unwrap(), settings_for(&dir));
        dashboard.load_boundaries().await;

        let report = dashboard.boundaries.state().ready().unwrap();
        assert_eq!(report.shapes.len(), 1);
        assert_eq!(report.shapes[0].borough, "Queens");
        assert_eq!(report.legend.len(), 5);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn test_remote_not_found_leaves_boundaries_loading() {
        let settings = Settings::default()
            .with_overrides(Some("https://data.example/nyc".to_string()), None, None)
            .unwrap();
        let mut dashboard = Dashboard::new(NotFoundClient, settings);

        dashboard.load_boundaries().await;

        assert!(dashboard.boundaries.state().is_loading());
        assert!(dashboard.boundaries.committed().is_none());
    }
}
