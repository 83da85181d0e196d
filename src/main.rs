mod ui;

use std::{
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
    time::Duration,
};

use clap::{Parser, Subcommand};
use egui::Vec2;
use log::{error, info};
use pitlane::{
    AppConfig, MapCatalog, PitlaneError, TelemetryProducer, TelemetrySample, TrackHistory,
    telemetry::{DemoTelemetryProducer, LinkStats, ReplayTelemetryProducer, collect_telemetry},
};
use ui::dashboard::DashboardApp;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Directory holding the catalog and the map images
    #[arg(long, global = true)]
    maps_dir: Option<PathBuf>,

    /// Catalog file, relative to the maps directory unless absolute
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Drive the dashboard with a synthetic vehicle lapping the selected map
    Demo {
        #[arg(short, long)]
        map: Option<String>,
    },
    /// Play back telemetry samples recorded as JSON lines
    Replay {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        map: Option<String>,
    },
}

impl Commands {
    fn map(&self) -> Option<&str> {
        match self {
            Commands::Demo { map } | Commands::Replay { map, .. } => map.as_deref(),
        }
    }
}

/// Pick the map to open with: command line first, then the last one used, then
/// the first catalog entry
fn select_map(
    catalog: &MapCatalog,
    catalog_path: &Path,
    requested: Option<&str>,
    remembered: Option<&str>,
) -> Result<String, PitlaneError> {
    if let Some(name) = requested {
        return catalog
            .entry(name)
            .map(|e| e.name.clone())
            .ok_or_else(|| PitlaneError::UnknownMap {
                name: name.to_string(),
            });
    }
    remembered
        .filter(|name| catalog.entry(name).is_some())
        .or_else(|| catalog.names().next())
        .map(str::to_string)
        .ok_or_else(|| PitlaneError::EmptyCatalog {
            path: catalog_path.to_path_buf(),
        })
}

fn spawn_link(
    producer: impl TelemetryProducer + Send + 'static,
    track: TrackHistory,
    telemetry_tx: mpsc::Sender<TelemetrySample>,
    link_stats: LinkStats,
    refresh: Duration,
) {
    thread::spawn(move || {
        match collect_telemetry(producer, track, telemetry_tx, link_stats, refresh) {
            Ok(stats) => info!("Telemetry link finished after {} samples", stats.samples()),
            Err(e) => error!("Error while reading telemetry: {}", e),
        }
    });
}

fn run(cli: Args) -> Result<(), PitlaneError> {
    let mut app_config = AppConfig::from_local_file().unwrap_or_default();
    if let Some(maps_dir) = cli.maps_dir {
        app_config.maps_dir = maps_dir;
    }
    if let Some(catalog) = cli.catalog {
        app_config.catalog_file = catalog;
    }

    let catalog_path = app_config.catalog_path();
    let catalog = MapCatalog::load(&catalog_path, &app_config.maps_dir)?;
    let selected_map = select_map(
        &catalog,
        &catalog_path,
        cli.command.map(),
        app_config.selected_map.as_deref(),
    )?;
    info!("Opening map '{}'", selected_map);

    let refresh = Duration::from_millis(app_config.telemetry_refresh_ms);
    let track = TrackHistory::new();
    let link_stats = LinkStats::new();
    let (telemetry_tx, telemetry_rx) = mpsc::channel();

    match &cli.command {
        Commands::Demo { .. } => {
            let bounds = catalog
                .entry(&selected_map)
                .map(|e| e.bounds)
                .ok_or_else(|| PitlaneError::UnknownMap {
                    name: selected_map.clone(),
                })?;
            spawn_link(
                DemoTelemetryProducer::new(bounds, refresh),
                track.clone(),
                telemetry_tx,
                link_stats.clone(),
                refresh,
            );
        }
        Commands::Replay { input, .. } => {
            spawn_link(
                ReplayTelemetryProducer::from_path(input)?,
                track.clone(),
                telemetry_tx,
                link_stats.clone(),
                refresh,
            );
        }
    }

    let window_position = app_config.window_position.clone();
    let mut native_options = eframe::NativeOptions::default();
    native_options.viewport = native_options
        .viewport
        .with_inner_size(Vec2::new(1260., 760.))
        .with_position(window_position);

    eframe::run_native(
        "Pitlane",
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(DashboardApp::new(
                telemetry_rx,
                link_stats,
                track,
                catalog,
                Some(selected_map),
                app_config,
                cc,
            )))
        }),
    )
    .map_err(|e| PitlaneError::UiError {
        reason: e.to_string(),
    })
}

fn main() {
    colog::init();

    let cli = Args::parse();
    if let Err(e) = ctrlc::set_handler(move || {
        println!("Exiting...");
        std::process::exit(0);
    }) {
        error!("Could not set Ctrl-C handler: {}", e);
    }

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}
