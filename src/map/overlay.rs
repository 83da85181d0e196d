// Overlay primitives drawn over the map crop: the track polyline and the heading compass

use image::{Rgba, RgbaImage};
use tiny_skia::{ColorU8, LineCap, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

use crate::{PitlaneError, track::TrackSnapshot};

use super::{GeoBox, VisibleRegion};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const BLACK: Rgb = Rgb(0, 0, 0);
pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const NORTH_RED: Rgb = Rgb(150, 0, 0);

pub const TRACK_COLOR: Rgb = BLACK;
pub const TRACK_WIDTH: f32 = 2.0;

/// Compass box size, anchored at the frame's top-left corner
pub const COMPASS_SIZE: f64 = 100.0;
const COMPASS_CENTER: f64 = COMPASS_SIZE / 2.0;
const COMPASS_RADIUS: f64 = 40.0;
const NEEDLE_HALF_LENGTH: f64 = 35.0;
const ARROWHEAD_BASE: f64 = 20.0;
const ARROWHEAD_HALF_WIDTH: f64 = 5.0;
const TICK_OUTER: f64 = 45.0;
const TICK_INNER: f64 = 35.0;

/// Outline pass color and width, then the symbol pass on top
const COMPASS_PASSES: [(Rgb, f32, Rgb); 2] = [(BLACK, 8.0, BLACK), (WHITE, 2.5, NORTH_RED)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Track,
    Compass,
}

/// A stroke in output pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Line {
        layer: Layer,
        from: (f32, f32),
        to: (f32, f32),
        color: Rgb,
        width: f32,
    },
    Circle {
        layer: Layer,
        center: (f32, f32),
        radius: f32,
        color: Rgb,
        width: f32,
    },
}

impl DrawCommand {
    pub fn layer(&self) -> Layer {
        match self {
            DrawCommand::Line { layer, .. } | DrawCommand::Circle { layer, .. } => *layer,
        }
    }

    pub fn is_line(&self) -> bool {
        matches!(self, DrawCommand::Line { .. })
    }

    fn style(&self) -> (Rgb, f32) {
        match self {
            DrawCommand::Line { color, width, .. } | DrawCommand::Circle { color, width, .. } => {
                (*color, *width)
            }
        }
    }
}

fn line(layer: Layer, from: (f64, f64), to: (f64, f64), color: Rgb, width: f32) -> DrawCommand {
    DrawCommand::Line {
        layer,
        from: (from.0 as f32, from.1 as f32),
        to: (to.0 as f32, to.1 as f32),
        color,
        width,
    }
}

/// Where the needle tip lands inside the compass box. 0 degrees points up and
/// angles grow clockwise, so 90 degrees points right.
pub fn heading_tip(heading_deg: f64) -> (f64, f64) {
    let (dx, dy) = heading_direction(heading_deg);
    (
        COMPASS_CENTER + NEEDLE_HALF_LENGTH * dx,
        COMPASS_CENTER + NEEDLE_HALF_LENGTH * dy,
    )
}

/// Unit vector of the heading in screen coordinates (y grows downwards)
fn heading_direction(heading_deg: f64) -> (f64, f64) {
    let heading = heading_deg.to_radians();
    (heading.sin(), -heading.cos())
}

/// Compass rose with the needle rotated to `heading_deg`. Drawn as a wide dark
/// outline and a narrow light symbol on top so it reads on any map.
pub fn compass_commands(heading_deg: f64) -> Vec<DrawCommand> {
    let c = COMPASS_CENTER;
    let (dx, dy) = heading_direction(heading_deg);
    let tip = heading_tip(heading_deg);
    let tail = (c - NEEDLE_HALF_LENGTH * dx, c - NEEDLE_HALF_LENGTH * dy);
    let base = (c + ARROWHEAD_BASE * dx, c + ARROWHEAD_BASE * dy);
    // perpendicular to the needle
    let (px, py) = (-dy, dx);
    let head_left = (
        base.0 - ARROWHEAD_HALF_WIDTH * px,
        base.1 - ARROWHEAD_HALF_WIDTH * py,
    );
    let head_right = (
        base.0 + ARROWHEAD_HALF_WIDTH * px,
        base.1 + ARROWHEAD_HALF_WIDTH * py,
    );

    let mut commands = Vec::with_capacity(COMPASS_PASSES.len() * 8);
    for (color, width, north_color) in COMPASS_PASSES {
        commands.push(DrawCommand::Circle {
            layer: Layer::Compass,
            center: (c as f32, c as f32),
            radius: COMPASS_RADIUS as f32,
            color,
            width,
        });
        commands.push(line(Layer::Compass, tip, tail, color, width));
        commands.push(line(Layer::Compass, tip, head_left, color, width));
        commands.push(line(Layer::Compass, tip, head_right, color, width));

        // south, east, west
        commands.push(line(
            Layer::Compass,
            (c, c + TICK_OUTER),
            (c, c + TICK_INNER),
            color,
            width,
        ));
        commands.push(line(
            Layer::Compass,
            (c + TICK_OUTER, c),
            (c + TICK_INNER, c),
            color,
            width,
        ));
        commands.push(line(
            Layer::Compass,
            (c - TICK_OUTER, c),
            (c - TICK_INNER, c),
            color,
            width,
        ));
        // north is drawn last so it sits on top
        commands.push(line(
            Layer::Compass,
            (c, c - TICK_OUTER),
            (c, c - TICK_INNER),
            north_color,
            width,
        ));
    }
    commands
}

/// Frame pixels a stroke may extend past the edge before it is clipped
const CLIP_MARGIN: f64 = 16.0;

/// Maps logical canvas coordinates onto the pixels of a rendered frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    origin: (f64, f64),
    scale: (f64, f64),
    size: (f64, f64),
}

impl FrameTransform {
    /// Frame showing the logical `region` at `zoom`, `OUTPUT_WIDTH` pixels wide
    pub fn for_region(region: &VisibleRegion, zoom: f64) -> Self {
        Self {
            origin: (region.left_x, region.top_y),
            scale: (1.0 / zoom, 1.0 / zoom),
            size: (region.width / zoom, region.height / zoom),
        }
    }

    /// Frame whose top-left corner sits at logical `origin` and which spans
    /// `logical_size` canvas units over `frame_size` pixels
    pub fn new(origin: (f64, f64), logical_size: (f64, f64), frame_size: (u32, u32)) -> Self {
        let size = (frame_size.0 as f64, frame_size.1 as f64);
        Self {
            origin,
            scale: (size.0 / logical_size.0, size.1 / logical_size.1),
            size,
        }
    }

    pub fn apply(&self, logical: (f64, f64)) -> (f64, f64) {
        (
            (logical.0 - self.origin.0) * self.scale.0,
            (logical.1 - self.origin.1) * self.scale.1,
        )
    }

    /// Clip a segment to the frame grown by `CLIP_MARGIN` (Liang-Barsky).
    /// Returns `None` when nothing of the segment is left.
    fn clip(&self, a: (f64, f64), b: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
        let (min_x, min_y) = (-CLIP_MARGIN, -CLIP_MARGIN);
        let (max_x, max_y) = (self.size.0 + CLIP_MARGIN, self.size.1 + CLIP_MARGIN);
        let (dx, dy) = (b.0 - a.0, b.1 - a.1);

        let mut t0: f64 = 0.0;
        let mut t1: f64 = 1.0;
        for (p, q) in [
            (-dx, a.0 - min_x),
            (dx, max_x - a.0),
            (-dy, a.1 - min_y),
            (dy, max_y - a.1),
        ] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }

        Some((
            (a.0 + t0 * dx, a.1 + t0 * dy),
            (a.0 + t1 * dx, a.1 + t1 * dy),
        ))
    }
}

/// One line per consecutive pair of recorded positions, clipped to the frame.
/// Segments that never cross the frame are dropped.
pub fn track_commands(
    bounds: &GeoBox,
    transform: &FrameTransform,
    track: &TrackSnapshot,
) -> Vec<DrawCommand> {
    track
        .segments()
        .map(|(a, b)| {
            (
                transform.apply(bounds.to_logical(a)),
                transform.apply(bounds.to_logical(b)),
            )
        })
        .filter(|(a, b)| [a.0, a.1, b.0, b.1].iter().all(|v| v.is_finite()))
        .filter_map(|(a, b)| transform.clip(a, b))
        .map(|(a, b)| line(Layer::Track, a, b, TRACK_COLOR, TRACK_WIDTH))
        .filter(|command| match command {
            DrawCommand::Line { from, to, .. } => {
                [from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite())
            }
            DrawCommand::Circle { .. } => true,
        })
        .collect()
}

/// Burn the commands into `image`, in order. Consecutive lines sharing a style
/// are stroked as a single path.
pub fn rasterize(image: &mut RgbaImage, commands: &[DrawCommand]) -> Result<(), PitlaneError> {
    if commands.is_empty() {
        return Ok(());
    }

    let (width, height) = image.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| PitlaneError::Render {
        reason: format!("cannot allocate a {}x{} drawing surface", width, height),
    })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }

    let mut batch: Option<((Rgb, f32), PathBuilder)> = None;
    for command in commands {
        let style = command.style();
        match command {
            DrawCommand::Line { from, to, .. } => {
                if batch.as_ref().is_some_and(|(s, _)| *s != style) {
                    flush(&mut pixmap, batch.take());
                }
                let (_, builder) = batch.get_or_insert_with(|| (style, PathBuilder::new()));
                builder.move_to(from.0, from.1);
                builder.line_to(to.0, to.1);
            }
            DrawCommand::Circle { center, radius, .. } => {
                flush(&mut pixmap, batch.take());
                if let Some(path) = PathBuilder::from_circle(center.0, center.1, *radius) {
                    stroke(&mut pixmap, &path, style);
                }
            }
        }
    }
    flush(&mut pixmap, batch.take());

    for (dst, src) in image.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    Ok(())
}

fn flush(pixmap: &mut Pixmap, batch: Option<((Rgb, f32), PathBuilder)>) {
    if let Some((style, builder)) = batch
        && let Some(path) = builder.finish()
    {
        stroke(pixmap, &path, style);
    }
}

fn stroke(pixmap: &mut Pixmap, path: &Path, (color, width): (Rgb, f32)) {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color.0, color.1, color.2, 255);
    paint.anti_alias = true;
    let stroke = Stroke {
        width,
        line_cap: LineCap::Round,
        ..Default::default()
    };
    pixmap.stroke_path(path, &paint, &stroke, Transform::identity(), None);
}
