// Error types for pitlane

use crate::telemetry::TelemetrySample;
use snafu::Snafu;
use std::{io, path::PathBuf, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum PitlaneError {
    // Map catalog errors
    #[snafu(display("Unknown map: {name}"))]
    UnknownMap { name: String },
    #[snafu(display("Unable to load map tile {path:?}: {reason}"))]
    MapLoad { path: PathBuf, reason: String },
    #[snafu(display("Degenerate geometry for map {name}: {reason}"))]
    GeometryDegenerate { name: String, reason: String },
    #[snafu(display("Unable to read map catalog"))]
    CatalogIo { source: io::Error },
    #[snafu(display("Malformed map catalog row at line {line}: {reason}"))]
    CatalogParse { line: usize, reason: String },
    #[snafu(display("Map catalog {path:?} lists no maps"))]
    EmptyCatalog { path: PathBuf },

    // Rendering errors
    #[snafu(display("Unable to render map frame: {reason}"))]
    Render { reason: String },
    #[snafu(display("Dashboard failed: {reason}"))]
    UiError { reason: String },

    // Errors while reading and broadcasting telemetry data
    #[snafu(display("Telemetry producer error: {description}"))]
    TelemetryProducerError { description: String },
    #[snafu(display("Error broadcasting telemetry sample"))]
    TelemetryBroadcastError {
        source: Box<SendError<TelemetrySample>>,
    },
    #[snafu(display("Unable to open telemetry replay {path:?}"))]
    ReplayIo { path: PathBuf, source: io::Error },
    #[snafu(display("Invalid telemetry sample in replay"))]
    ReplayParse { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },
}

impl From<SendError<TelemetrySample>> for PitlaneError {
    fn from(value: SendError<TelemetrySample>) -> Self {
        PitlaneError::TelemetryBroadcastError {
            source: Box::new(value),
        }
    }
}
