use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::PitlaneError;
use crate::telemetry::LINK_TIMEOUT_S;

const CONFIG_DIR_NAME: &str = "pitlane";
const CONFIG_FILE_NAME: &str = "config.json";
pub const TELEMETRY_REFRESH_MS: u64 = 50;
pub const MAP_REFRESH_MS: u64 = 200;
const DEFAULT_MAPS_DIR: &str = "maps";
const DEFAULT_CATALOG_FILE: &str = "locations.csv";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct WindowPosition {
    pub x: f32,
    pub y: f32,
}

impl From<WindowPosition> for egui::Pos2 {
    fn from(value: WindowPosition) -> Self {
        egui::Pos2::new(value.x, value.y)
    }
}

impl From<egui::Pos2> for WindowPosition {
    fn from(value: egui::Pos2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Telemetry polling period, ~20 Hz by default
    pub telemetry_refresh_ms: u64,
    /// Map redraw period, ~5 Hz by default
    pub map_refresh_ms: u64,
    pub maps_dir: PathBuf,
    /// Catalog file name, relative to `maps_dir`
    pub catalog_file: PathBuf,
    pub selected_map: Option<String>,
    pub link_timeout_s: f64,
    pub window_position: WindowPosition,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            telemetry_refresh_ms: TELEMETRY_REFRESH_MS,
            map_refresh_ms: MAP_REFRESH_MS,
            maps_dir: PathBuf::from(DEFAULT_MAPS_DIR),
            catalog_file: PathBuf::from(DEFAULT_CATALOG_FILE),
            selected_map: None,
            link_timeout_s: LINK_TIMEOUT_S,
            window_position: WindowPosition::default(),
        }
    }
}

impl AppConfig {
    pub fn config_path() -> Option<PathBuf> {
        Some(
            dirs::config_dir()?
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        )
    }

    pub fn from_local_file() -> Option<Self> {
        Self::from_file(&Self::config_path()?)
    }

    /// Read a config file. A missing file is not an error; a broken one is
    /// reported and ignored so the dashboard still starts with defaults.
    pub fn from_file(config_path: &Path) -> Option<Self> {
        if !config_path.exists() {
            return None;
        }
        let file = match std::fs::File::open(config_path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Could not open config file {:?}: {}", config_path, e);
                return None;
            }
        };
        match serde_json::from_reader(file) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Could not parse config file {:?}: {}", config_path, e);
                None
            }
        }
    }

    pub fn save(&self) -> Result<(), PitlaneError> {
        let config_path = Self::config_path().ok_or(PitlaneError::NoConfigDir)?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), PitlaneError> {
        if let Some(parent) = config_path.parent()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PitlaneError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| PitlaneError::ConfigIOError { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| PitlaneError::ConfigSerializeError { source: e })
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.maps_dir.join(&self.catalog_file)
    }
}
