use std::{
    f64::consts::TAU,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    time::Duration,
};

use log::{debug, info};
use serde_jsonlines::JsonLinesReader;

use crate::{
    PitlaneError,
    map::{GeoBox, GeoPoint},
};

use super::{GpsFixType, TelemetrySample};

const METERS_PER_DEGREE: f64 = 111_320.0;
const MPS_TO_MPH: f64 = 2.236_936;
const DEMO_SAMPLES_PER_LAP: usize = 600;
const DEMO_TRACK_FRACTION: f64 = 0.35;
const DEMO_IDLE_RPM: f64 = 1200.0;
const DEMO_RPM_PER_MPH: f64 = 55.0;
const DEMO_HEARTBEAT_AGE_S: f64 = 0.1;

/// Source of telemetry samples. Implementations wrap whatever link the vehicle
/// talks over; the wire format stays behind this trait.
pub trait TelemetryProducer {
    fn start(&mut self) -> Result<(), PitlaneError>;

    /// Next sample, `Ok(None)` once the source is exhausted
    fn telemetry(&mut self) -> Result<Option<TelemetrySample>, PitlaneError>;

    fn stop(&mut self) {}
}

/// Synthetic vehicle lapping an ellipse inside a map's bounds
pub struct DemoTelemetryProducer {
    center: GeoPoint,
    radius_lat: f64,
    radius_lon: f64,
    tick_s: f64,
    step: usize,
    started: bool,
}

impl DemoTelemetryProducer {
    pub fn new(bounds: GeoBox, tick: Duration) -> Self {
        Self {
            center: bounds.center(),
            radius_lat: bounds.lat_span() * DEMO_TRACK_FRACTION,
            radius_lon: bounds.lon_span() * DEMO_TRACK_FRACTION,
            tick_s: tick.as_secs_f64().max(f64::EPSILON),
            step: 0,
            started: false,
        }
    }

    fn position_at(&self, theta: f64) -> GeoPoint {
        GeoPoint::new(
            self.center.lat + self.radius_lat * theta.sin(),
            self.center.lon + self.radius_lon * theta.cos(),
        )
    }

    /// Ground velocity in meters per radian of lap angle, (east, north)
    fn velocity_at(&self, theta: f64) -> (f64, f64) {
        let lat_scale = self.center.lat.to_radians().cos();
        let east = -self.radius_lon * theta.sin() * lat_scale * METERS_PER_DEGREE;
        let north = self.radius_lat * theta.cos() * METERS_PER_DEGREE;
        (east, north)
    }
}

impl TelemetryProducer for DemoTelemetryProducer {
    fn start(&mut self) -> Result<(), PitlaneError> {
        info!(
            "Starting demo telemetry around ({:.5}, {:.5})",
            self.center.lat, self.center.lon
        );
        self.started = true;
        Ok(())
    }

    fn telemetry(&mut self) -> Result<Option<TelemetrySample>, PitlaneError> {
        if !self.started {
            return Err(PitlaneError::TelemetryProducerError {
                description: "demo producer not started".to_string(),
            });
        }

        let dtheta = TAU / DEMO_SAMPLES_PER_LAP as f64;
        let theta = self.step as f64 * dtheta;
        self.step = (self.step + 1) % DEMO_SAMPLES_PER_LAP;

        let position = self.position_at(theta);
        let (east, north) = self.velocity_at(theta);
        let heading_deg = east.atan2(north).to_degrees().rem_euclid(360.0);
        let mph = east.hypot(north) * dtheta / self.tick_s * MPS_TO_MPH;

        Ok(Some(TelemetrySample {
            mph,
            rpm: DEMO_IDLE_RPM + mph * DEMO_RPM_PER_MPH,
            heading_deg,
            lat: position.lat,
            lon: position.lon,
            gps_fix_type: GpsFixType::Fix3D,
            heartbeat_age_s: DEMO_HEARTBEAT_AGE_S,
        }))
    }
}

/// Plays back a capture of newline delimited JSON samples
pub struct ReplayTelemetryProducer<R: BufRead> {
    reader: JsonLinesReader<R>,
    samples_read: usize,
}

impl ReplayTelemetryProducer<BufReader<File>> {
    pub fn from_path(path: &Path) -> Result<Self, PitlaneError> {
        let file = File::open(path).map_err(|e| PitlaneError::ReplayIo {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayTelemetryProducer<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader: JsonLinesReader::new(reader),
            samples_read: 0,
        }
    }
}

impl<R: BufRead> TelemetryProducer for ReplayTelemetryProducer<R> {
    fn start(&mut self) -> Result<(), PitlaneError> {
        info!("Starting telemetry replay");
        Ok(())
    }

    fn telemetry(&mut self) -> Result<Option<TelemetrySample>, PitlaneError> {
        let sample = self
            .reader
            .read::<TelemetrySample>()
            .map_err(|e| PitlaneError::ReplayParse { source: e })?;
        match sample {
            Some(sample) => {
                self.samples_read += 1;
                Ok(Some(sample))
            }
            None => {
                debug!("Replay exhausted after {} samples", self.samples_read);
                Ok(None)
            }
        }
    }
}
