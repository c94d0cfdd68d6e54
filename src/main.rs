//! CLI entry point for the trip analytics tool.
//!
//! Each subcommand loads one dataset, runs its aggregation and writes the
//! resulting report as JSON. `dashboard` drives all panels together the way
//! the interactive dashboard does.

use std::ffi::OsStr;
use std::path::Path;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use trip_analytics::{
    config::{self, DURATION_FIELD, Settings},
    fetch::BasicClient,
    load::LoadState,
    output::{emit_json, print_pretty, write_cells_csv},
    pipeline::{Dashboard, load_boundaries, load_durations, load_heatmap, load_pickups},
    report::{
        BoundaryReport, DurationReport, HeatmapReport, MonthCatalog, PickupReport, Report,
    },
};

#[derive(Parser)]
#[command(name = "trip_analytics")]
#[command(about = "Aggregate trip-record datasets for dashboard charts", long_about = None)]
struct Cli {
    /// Directory or base URL holding the datasets (overrides DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Row ceiling before pickups are subsampled (overrides MAX_ROWS)
    #[arg(long, global = true)]
    max_rows: Option<usize>,

    /// Pickup grid resolution in degrees (overrides GRID_SIZE)
    #[arg(long, global = true)]
    grid_size: Option<f64>,

    /// Write the JSON report here instead of stdout
    #[arg(short, long, global = true)]
    output: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Weekday × hour trip counts from the cleaned dataset
    Heatmap {
        /// Path or URL of the CSV (defaults to the cleaned dataset)
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// Grid-aggregated pickups for one month
    Pickups {
        /// Month key or label, e.g. "apr14" or "April 2014"
        #[arg(short, long, default_value = "apr14")]
        month: String,

        /// Read this CSV instead of the month's default file
        #[arg(long, value_name = "FILE_OR_URL")]
        source: Option<String>,

        /// Also write the grid cells to this CSV file
        #[arg(long)]
        csv: Option<String>,
    },
    /// Trimmed duration histogram with a fitted normal curve
    Durations {
        /// Path or URL of the CSV (defaults to the cleaned dataset)
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// Borough-colored boundary rings
    Boundaries {
        /// Path or URL of the GeoJSON (defaults to the boundary file)
        #[arg(value_name = "FILE_OR_URL")]
        source: Option<String>,
    },
    /// List the monthly pickup datasets
    Months,
    /// Load every panel; later --month selections supersede earlier ones
    Dashboard {
        #[arg(short, long = "month")]
        months: Vec<String>,
    },
}

/// Panel states written by the `dashboard` subcommand.
#[derive(Serialize)]
struct DashboardSnapshot {
    heatmap: LoadState<HeatmapReport>,
    pickups: LoadState<PickupReport>,
    durations: LoadState<DurationReport>,
    boundaries: LoadState<BoundaryReport>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/trip_analytics.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("trip_analytics.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let settings =
        Settings::from_env()?.with_overrides(cli.data_dir, cli.max_rows, cli.grid_size)?;
    let output = cli.output.as_deref();
    let client = BasicClient::new()?;

    info!(
        data_dir = %settings.data_dir,
        max_rows = settings.max_rows.get(),
        grid_size = settings.grid_size,
        "Settings resolved"
    );

    match cli.command {
        Commands::Heatmap { source } => {
            let source = source.unwrap_or_else(|| settings.cleaned_source());
            let matrix = load_heatmap(&client, &source, settings.temporal_fields())
                .await
                .inspect_err(|e| error!(error = %e, "Heatmap load failed"))?;
            emit_json(output, &Report::new(HeatmapReport::from(matrix)))?;
        }
        Commands::Pickups { month, source, csv } => {
            let month = config::find_month(&month)?;
            let source = source.unwrap_or_else(|| settings.month_source(month));
            let cells = load_pickups(&client, &source, &settings.grid_config())
                .await
                .inspect_err(|e| error!(error = %e, "Pickup load failed"))?;

            if let Some(path) = csv {
                write_cells_csv(&path, &cells)?;
            }
            emit_json(output, &Report::new(PickupReport::new(*month, cells)))?;
        }
        Commands::Durations { source } => {
            let source = source.unwrap_or_else(|| settings.cleaned_source());
            let report = load_durations(&client, &source, DURATION_FIELD)
                .await
                .inspect_err(|e| error!(error = %e, "Duration load failed"))?;
            if report.fit.is_none() {
                info!("No valid durations found");
            }
            emit_json(output, &Report::new(report))?;
        }
        Commands::Boundaries { source } => {
            let source = source.unwrap_or_else(|| settings.boundary_source());
            let shapes = load_boundaries(&client, &source)
                .await
                .inspect_err(|e| error!(error = %e, "Boundary load failed"))?;
            emit_json(output, &Report::new(BoundaryReport::from(shapes)))?;
        }
        Commands::Months => {
            emit_json(output, &Report::new(MonthCatalog::default()))?;
        }
        Commands::Dashboard { months } => {
            let mut dashboard = Dashboard::new(client, settings);
            dashboard.initial_load().await?;
            if !months.is_empty() {
                dashboard.select_months(months.as_slice()).await?;
            }

            for (panel, loading) in [
                (dashboard.heatmap.name(), dashboard.heatmap.state().is_loading()),
                (dashboard.pickups.name(), dashboard.pickups.state().is_loading()),
                (dashboard.durations.name(), dashboard.durations.state().is_loading()),
                (dashboard.boundaries.name(), dashboard.boundaries.state().is_loading()),
            ] {
                if loading {
                    info!(panel, "Panel still loading");
                }
            }
            print_pretty(dashboard.settings());

            let snapshot = DashboardSnapshot {
                heatmap: dashboard.heatmap.take(),
                pickups: dashboard.pickups.take(),
                durations: dashboard.durations.take(),
                boundaries: dashboard.boundaries.take(),
            };
            emit_json(output, &Report::new(snapshot))?;
        }
    }

    Ok(())
}
