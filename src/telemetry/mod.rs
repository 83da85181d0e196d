pub(crate) mod collector;
pub mod producer;

pub use collector::{LinkStats, collect_telemetry};
pub use producer::{DemoTelemetryProducer, ReplayTelemetryProducer, TelemetryProducer};

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::map::GeoPoint;

/// Heartbeat age after which the link is considered lost
pub const LINK_TIMEOUT_S: f64 = 3.0;

/// GPS quality as reported by the vehicle. Serialized as the MAVLink integer code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum GpsFixType {
    #[default]
    NoGps,
    NoFix,
    Fix2D,
    Fix3D,
}

impl GpsFixType {
    /// Decode the integer fix type used by MAVLink style links
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::NoFix,
            2 => Self::Fix2D,
            3 => Self::Fix3D,
            _ => Self::NoGps,
        }
    }

    pub fn has_fix(&self) -> bool {
        matches!(self, Self::Fix2D | Self::Fix3D)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NoGps => "No GPS",
            Self::NoFix => "No Fix",
            Self::Fix2D => "2D Fix",
            Self::Fix3D => "3D Fix",
        }
    }
}

impl From<u8> for GpsFixType {
    fn from(raw: u8) -> Self {
        Self::from_raw(raw)
    }
}

impl From<GpsFixType> for u8 {
    fn from(fix: GpsFixType) -> Self {
        match fix {
            GpsFixType::NoGps => 0,
            GpsFixType::NoFix => 1,
            GpsFixType::Fix2D => 2,
            GpsFixType::Fix3D => 3,
        }
    }
}

/// One reading from the vehicle link
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    /// Ground speed in miles per hour
    pub mph: f64,
    /// Engine RPM
    pub rpm: f64,
    /// Heading in degrees, 0 = north, clockwise positive
    pub heading_deg: f64,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lon: f64,
    pub gps_fix_type: GpsFixType,
    /// Seconds since the last heartbeat from the vehicle
    pub heartbeat_age_s: f64,
}

impl TelemetrySample {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon)
    }

    pub fn has_fix(&self) -> bool {
        self.gps_fix_type.has_fix()
    }

    /// Heartbeat age once `since_receipt` has passed without a newer sample
    pub fn heartbeat_age_after(&self, since_receipt: Duration) -> f64 {
        self.heartbeat_age_s + since_receipt.as_secs_f64()
    }

    pub fn link_lost_after(&self, since_receipt: Duration, timeout_s: f64) -> bool {
        self.heartbeat_age_after(since_receipt) > timeout_s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fix_type_decoding() {
        assert_eq!(GpsFixType::from_raw(0), GpsFixType::NoGps);
        assert_eq!(GpsFixType::from_raw(1), GpsFixType::NoFix);
        assert_eq!(GpsFixType::from_raw(2), GpsFixType::Fix2D);
        assert_eq!(GpsFixType::from_raw(3), GpsFixType::Fix3D);
        assert_eq!(GpsFixType::from_raw(42), GpsFixType::NoGps);

        assert!(!GpsFixType::NoFix.has_fix());
        assert!(GpsFixType::Fix2D.has_fix());
        assert_eq!(GpsFixType::Fix3D.label(), "3D Fix");
    }

    #[test]
    fn test_link_lost() {
        let mut sample = TelemetrySample {
            heartbeat_age_s: 1.0,
            ..Default::default()
        };
        assert!(!sample.link_lost_after(Duration::ZERO, LINK_TIMEOUT_S));
        // a silent link ages the last heartbeat
        assert!(!sample.link_lost_after(Duration::from_millis(1500), LINK_TIMEOUT_S));
        assert!(sample.link_lost_after(Duration::from_millis(2500), LINK_TIMEOUT_S));
        assert!((sample.heartbeat_age_after(Duration::from_millis(500)) - 1.5).abs() < 1e-9);

        sample.heartbeat_age_s = 3.5;
        assert!(sample.link_lost_after(Duration::ZERO, LINK_TIMEOUT_S));
    }

    #[test]
    fn test_sample_json_shape() {
        let sample = TelemetrySample {
            mph: 42.5,
            rpm: 3100.0,
            heading_deg: 270.0,
            lat: 29.7174,
            lon: -95.4018,
            gps_fix_type: GpsFixType::Fix3D,
            heartbeat_age_s: 0.2,
        };

        let json = serde_json::to_string(&sample).unwrap();
        assert!(json.contains("\"gps_fix_type\":3"));
        let parsed: TelemetrySample = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sample);
    }

    #[test]
    fn test_raw_fix_codes_in_json() {
        let line = r#"{"mph":0,"rpm":0,"heading_deg":0,"lat":1,"lon":2,"gps_fix_type":2,"heartbeat_age_s":0}"#;
        let parsed: TelemetrySample = serde_json::from_str(line).unwrap();
        assert_eq!(parsed.gps_fix_type, GpsFixType::Fix2D);

        // unknown codes read as no GPS
        let line = line.replace("\"gps_fix_type\":2", "\"gps_fix_type\":9");
        let parsed: TelemetrySample = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.gps_fix_type, GpsFixType::NoGps);
    }
}
