// Map frame composition: crop the tile to the viewport, scale it and draw the overlay

use image::{RgbaImage, imageops::FilterType};
use log::debug;

use crate::{PitlaneError, telemetry::TelemetrySample, track::TrackSnapshot};

use super::{
    LOGICAL_H, LOGICAL_W, MapTile, OUTPUT_WIDTH, TileSource, Viewport, VisibleRegion,
    overlay::{self, DrawCommand, FrameTransform, Layer},
};

const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

/// A composed map frame
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub image: RgbaImage,
    /// Overlay strokes already burnt into `image`, in drawing order
    pub commands: Vec<DrawCommand>,
}

impl RenderedFrame {
    pub fn track_segments(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| c.layer() == Layer::Track && c.is_line())
            .count()
    }

    pub fn has_compass(&self) -> bool {
        self.commands.iter().any(|c| c.layer() == Layer::Compass)
    }
}

/// Integer crop rectangle in tile pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Renders one frame of the map view from explicit inputs. Holds no per-frame
/// state, so every call is independent of the previous one.
#[derive(Debug, Clone)]
pub struct MapProjector {
    output_width: u32,
}

impl Default for MapProjector {
    fn default() -> Self {
        Self {
            output_width: OUTPUT_WIDTH,
        }
    }
}

impl MapProjector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose the frame for `map_name`.
    ///
    /// The overlay is only drawn when a sample is available: the track needs at
    /// least two recorded positions, the compass only needs the sample's
    /// heading. Nothing passed in is modified, so on error the caller can keep
    /// showing its previous frame.
    pub fn render(
        &self,
        tiles: &mut impl TileSource,
        map_name: &str,
        viewport: &Viewport,
        track: &TrackSnapshot,
        latest: Option<&TelemetrySample>,
    ) -> Result<RenderedFrame, PitlaneError> {
        let tile = tiles.lookup(map_name)?;
        let region = viewport.visible_region();
        let crop = crop_rect(&tile, &region);

        let cropped = image::imageops::crop_imm(&tile.image, crop.x, crop.y, crop.width, crop.height)
            .to_image();
        let output_height = ((crop.height as f64 * self.output_width as f64 / crop.width as f64)
            .round() as u32)
            .max(1);
        let mut image =
            image::imageops::resize(&cropped, self.output_width, output_height, RESAMPLE_FILTER);

        let mut commands = Vec::new();
        if let Some(sample) = latest {
            let transform = crop_transform(&tile, &crop, image.dimensions());
            commands.extend(overlay::track_commands(&tile.bounds, &transform, track));
            commands.extend(overlay::compass_commands(sample.heading_deg));
        }
        overlay::rasterize(&mut image, &commands)?;

        debug!(
            "Rendered '{}' crop {:?} -> {}x{} with {} overlay strokes",
            map_name,
            crop,
            image.width(),
            image.height(),
            commands.len()
        );
        Ok(RenderedFrame { image, commands })
    }
}

/// Scale the logical visible region into tile pixels, clamped to the tile
pub fn crop_rect(tile: &MapTile, region: &VisibleRegion) -> CropRect {
    let (tile_w, tile_h) = (tile.width(), tile.height());
    let scale_x = tile_w as f64 / LOGICAL_W;
    let scale_y = tile_h as f64 / LOGICAL_H;

    let (x, width) = clamp_span(region.left_x * scale_x, region.width * scale_x, tile_w);
    let (y, height) = clamp_span(region.top_y * scale_y, region.height * scale_y, tile_h);
    CropRect {
        x,
        y,
        width,
        height,
    }
}

/// Overlay transform for a frame cut from `crop`. Uses the whole-pixel crop
/// rather than the requested region so the track stays registered with the map.
fn crop_transform(tile: &MapTile, crop: &CropRect, frame_size: (u32, u32)) -> FrameTransform {
    let scale_x = tile.width() as f64 / LOGICAL_W;
    let scale_y = tile.height() as f64 / LOGICAL_H;
    FrameTransform::new(
        (crop.x as f64 / scale_x, crop.y as f64 / scale_y),
        (crop.width as f64 / scale_x, crop.height as f64 / scale_y),
        frame_size,
    )
}

fn clamp_span(start: f64, len: f64, limit: u32) -> (u32, u32) {
    let start = (start.round().max(0.) as u32).min(limit.saturating_sub(1));
    let len = (len.round().max(1.) as u32).min(limit - start);
    (start, len.max(1))
}
