// Map model: geographic boxes, tiles, and the logical canvas all viewport math is expressed in

pub mod catalog;
pub mod overlay;
pub mod projector;
pub mod viewport;

pub use catalog::{CatalogEntry, MapCatalog, TileSource};
pub use overlay::{DrawCommand, Layer, Rgb};
pub use projector::{MapProjector, RenderedFrame};
pub use viewport::{ViewCommand, Viewport, VisibleRegion};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::errors::PitlaneError;

/// Width of the logical canvas
pub const LOGICAL_W: f64 = 1000.0;
/// Height of the logical canvas. Every tile must share the 8:5 aspect ratio of the canvas.
pub const LOGICAL_H: f64 = 625.0;
/// Width in pixels of every rendered frame
pub const OUTPUT_WIDTH: u32 = 1000;

/// A position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Geographic bounding box aligned to the edges of a map image.
///
/// North is numerically greater than south and east greater than west, so a
/// valid box always has `top_lat > bottom_lat` and `right_lon > left_lon`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBox {
    pub top_lat: f64,
    pub left_lon: f64,
    pub bottom_lat: f64,
    pub right_lon: f64,
}

impl GeoBox {
    /// Build a box from its top-left and bottom-right corners, rejecting boxes
    /// that would divide by zero (or flip the image) during projection.
    pub fn new(
        name: &str,
        top_lat: f64,
        left_lon: f64,
        bottom_lat: f64,
        right_lon: f64,
    ) -> Result<Self, PitlaneError> {
        let corners = [top_lat, left_lon, bottom_lat, right_lon];
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(PitlaneError::GeometryDegenerate {
                name: name.to_string(),
                reason: "corner coordinates must be finite".to_string(),
            });
        }
        if top_lat <= bottom_lat {
            return Err(PitlaneError::GeometryDegenerate {
                name: name.to_string(),
                reason: format!(
                    "top latitude {} must be north of bottom latitude {}",
                    top_lat, bottom_lat
                ),
            });
        }
        if right_lon <= left_lon {
            return Err(PitlaneError::GeometryDegenerate {
                name: name.to_string(),
                reason: format!(
                    "right longitude {} must be east of left longitude {}",
                    right_lon, left_lon
                ),
            });
        }

        Ok(Self {
            top_lat,
            left_lon,
            bottom_lat,
            right_lon,
        })
    }

    /// Map a position onto the logical canvas. Points outside the box land
    /// outside `[0, LOGICAL_W] x [0, LOGICAL_H]`.
    pub fn to_logical(&self, point: GeoPoint) -> (f64, f64) {
        let x = (point.lon - self.left_lon) * LOGICAL_W / (self.right_lon - self.left_lon);
        let y = (point.lat - self.top_lat) * LOGICAL_H / (self.bottom_lat - self.top_lat);
        (x, y)
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat <= self.top_lat
            && point.lat >= self.bottom_lat
            && point.lon >= self.left_lon
            && point.lon <= self.right_lon
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint::new(
            (self.top_lat + self.bottom_lat) / 2.0,
            (self.left_lon + self.right_lon) / 2.0,
        )
    }

    pub fn lat_span(&self) -> f64 {
        self.top_lat - self.bottom_lat
    }

    pub fn lon_span(&self) -> f64 {
        self.right_lon - self.left_lon
    }
}

/// A decoded map image together with the area it covers
#[derive(Debug, Clone)]
pub struct MapTile {
    pub image: RgbaImage,
    pub bounds: GeoBox,
}

impl MapTile {
    pub fn new(image: RgbaImage, bounds: GeoBox) -> Self {
        Self { image, bounds }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
