// Library interface for pitlane
// This allows integration tests and benches to access internal modules

pub mod config;
pub mod errors;
pub mod map;
pub mod telemetry;
pub mod track;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::PitlaneError;
pub use map::{
    GeoBox, GeoPoint, MapCatalog, MapProjector, MapTile, RenderedFrame, TileSource, ViewCommand,
    Viewport,
};
pub use telemetry::{GpsFixType, TelemetryProducer, TelemetrySample};
pub use track::{TrackHistory, TrackSnapshot};
