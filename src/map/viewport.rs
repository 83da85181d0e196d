// Pan and zoom state over the logical canvas

use super::{LOGICAL_H, LOGICAL_W};

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 1.0;
const ZOOM_IN_FACTOR: f64 = 0.9;
const ZOOM_OUT_FACTOR: f64 = 1.11;
/// Fraction of the visible window moved by a single pan command
const PAN_STEP: f64 = 0.1;

/// Navigation commands issued by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCommand {
    PanUp,
    PanDown,
    PanLeft,
    PanRight,
    ZoomIn,
    ZoomOut,
    Reset,
}

/// Visible window in logical canvas units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibleRegion {
    pub top_y: f64,
    pub left_x: f64,
    pub width: f64,
    pub height: f64,
}

impl VisibleRegion {
    pub fn bottom_y(&self) -> f64 {
        self.top_y + self.height
    }

    pub fn right_x(&self) -> f64 {
        self.left_x + self.width
    }
}

/// Pan center and zoom factor of the map view.
///
/// `zoom` is the fraction of the canvas visible on each axis: 1.0 shows the
/// whole tile, 0.1 shows a tenth of it. The window of size
/// `(zoom * LOGICAL_W, zoom * LOGICAL_H)` centered on `center` never leaves the
/// canvas; every mutator clamps to keep it inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    center_x: f64,
    center_y: f64,
    zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center_x: LOGICAL_W / 2.0,
            center_y: LOGICAL_H / 2.0,
            zoom: MAX_ZOOM,
        }
    }
}

impl Viewport {
    /// Create a viewport, clamping the requested state into a valid one
    pub fn new(center_x: f64, center_y: f64, zoom: f64) -> Self {
        let mut viewport = Self {
            center_x,
            center_y,
            zoom: if zoom.is_finite() {
                zoom.clamp(MIN_ZOOM, MAX_ZOOM)
            } else {
                MAX_ZOOM
            },
        };
        viewport.clamp_center();
        viewport
    }

    pub fn center(&self) -> (f64, f64) {
        (self.center_x, self.center_y)
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Shift the center by a delta in logical units, then clamp each axis
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center_x += dx;
        self.center_y += dy;
        self.clamp_center();
    }

    pub fn pan_up(&mut self) {
        self.pan(0.0, -self.pan_step_y());
    }

    pub fn pan_down(&mut self) {
        self.pan(0.0, self.pan_step_y());
    }

    pub fn pan_left(&mut self) {
        self.pan(-self.pan_step_x(), 0.0);
    }

    pub fn pan_right(&mut self) {
        self.pan(self.pan_step_x(), 0.0);
    }

    /// Narrow the visible window. The center is re-clamped like on zoom out so
    /// both directions leave the viewport in the same normalized state.
    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * ZOOM_IN_FACTOR).max(MIN_ZOOM);
        self.clamp_center();
    }

    /// Widen the visible window, never past the full tile
    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom * ZOOM_OUT_FACTOR).min(MAX_ZOOM);
        self.clamp_center();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn apply(&mut self, command: ViewCommand) {
        match command {
            ViewCommand::PanUp => self.pan_up(),
            ViewCommand::PanDown => self.pan_down(),
            ViewCommand::PanLeft => self.pan_left(),
            ViewCommand::PanRight => self.pan_right(),
            ViewCommand::ZoomIn => self.zoom_in(),
            ViewCommand::ZoomOut => self.zoom_out(),
            ViewCommand::Reset => self.reset(),
        }
    }

    pub fn visible_region(&self) -> VisibleRegion {
        let width = self.zoom * LOGICAL_W;
        let height = self.zoom * LOGICAL_H;
        VisibleRegion {
            top_y: self.center_y - height / 2.0,
            left_x: self.center_x - width / 2.0,
            width,
            height,
        }
    }

    fn pan_step_x(&self) -> f64 {
        self.zoom * LOGICAL_W * PAN_STEP
    }

    fn pan_step_y(&self) -> f64 {
        self.zoom * LOGICAL_H * PAN_STEP
    }

    fn clamp_center(&mut self) {
        self.center_x = clamp_axis(self.center_x, self.zoom, LOGICAL_W);
        self.center_y = clamp_axis(self.center_y, self.zoom, LOGICAL_H);
    }
}

fn clamp_axis(value: f64, zoom: f64, dim: f64) -> f64 {
    let half = zoom * dim / 2.0;
    if value.is_nan() {
        return dim / 2.0;
    }
    value.clamp(half, dim - half)
}
