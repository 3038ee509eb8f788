use std::io::Cursor;

use anyhow::{Context, Result};
use image::{ImageFormat, Rgba, RgbaImage};

use super::path::PathPoint;

const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Fixed-size RGBA raster the waveform is stroked onto.
#[derive(Debug, Clone)]
pub struct Surface {
    image: RgbaImage,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, CLEAR),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = CLEAR;
        }
    }

    pub fn is_blank(&self) -> bool {
        self.image.pixels().all(|pixel| *pixel == CLEAR)
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        (x < self.width() && y < self.height()).then(|| *self.image.get_pixel(x, y))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Strokes straight segments between consecutive points. Pixels outside the
    /// raster are clipped; a segment with a non-finite endpoint is skipped.
    pub fn stroke_polyline(&mut self, points: &[PathPoint], color: Rgba<u8>, line_width: u32) {
        for pair in points.windows(2) {
            let (from, to) = (pair[0], pair[1]);
            if !(from.is_finite() && to.is_finite()) {
                continue;
            }
            self.stroke_segment(from, to, color, line_width.max(1));
        }
    }

    fn stroke_segment(&mut self, from: PathPoint, to: PathPoint, color: Rgba<u8>, line_width: u32) {
        let margin = line_width as f64;
        let bounds = (
            -margin,
            -margin,
            self.width() as f64 + margin,
            self.height() as f64 + margin,
        );
        let Some((from, to)) = clip_segment(from, to, bounds) else {
            return;
        };
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as u32;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            self.stamp(from.x + dx * t, from.y + dy * t, color, line_width);
        }
    }

    fn stamp(&mut self, cx: f64, cy: f64, color: Rgba<u8>, line_width: u32) {
        let half = (line_width as f64 - 1.0) / 2.0;
        let (Some(xs), Some(ys)) = (
            stamp_span(cx - half, line_width, self.width()),
            stamp_span(cy - half, line_width, self.height()),
        ) else {
            return;
        };
        for py in ys {
            for px in xs.clone() {
                self.image.put_pixel(px, py, color);
            }
        }
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }
}

/// Pixels covered by a run of `len` starting at `start`, limited to `0..limit`.
fn stamp_span(start: f64, len: u32, limit: u32) -> Option<std::ops::Range<u32>> {
    let first = (start + 0.5).floor();
    let lo = first.max(0.0);
    let hi = (first + len as f64).min(limit as f64);
    (lo < hi).then(|| lo as u32..hi as u32)
}

/// Liang-Barsky clip of `from`-`to` against `(x_min, y_min, x_max, y_max)`.
/// Keeps far out-of-range samples from costing one step per virtual pixel.
fn clip_segment(
    from: PathPoint,
    to: PathPoint,
    (x_min, y_min, x_max, y_max): (f64, f64, f64, f64),
) -> Option<(PathPoint, PathPoint)> {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);

    for (p, q) in [
        (-dx, from.x - x_min),
        (dx, x_max - from.x),
        (-dy, from.y - y_min),
        (dy, y_max - from.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                t0 = t0.max(r);
            } else {
                t1 = t1.min(r);
            }
        }
    }

    (t0 <= t1).then(|| {
        (
            PathPoint::new(from.x + t0 * dx, from.y + t0 * dy),
            PathPoint::new(from.x + t1 * dx, from.y + t1 * dy),
        )
    })
}

pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .context("failed to encode raster as PNG")?;
    Ok(bytes)
}
