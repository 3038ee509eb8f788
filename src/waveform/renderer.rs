use anyhow::{anyhow, bail, Result};
use image::Rgba;
use serde::{Deserialize, Serialize};

use super::path::{trace_path, WaveformPath};
use super::surface::Surface;

/// Widest stroke the renderer accepts; each step stamps a square this wide.
pub const MAX_LINE_WIDTH: u32 = 16;

/// Raster geometry and stroke for a waveform plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WaveformConfig {
    pub width: u32,
    pub height: u32,
    /// Upper bound of the sample domain; samples are expected in `0..=domain_max`.
    pub domain_max: f64,
    /// `#rrggbb` or `#rrggbbaa`.
    pub stroke: String,
    pub line_width: u32,
}

impl Default for WaveformConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 160,
            domain_max: 100.0,
            stroke: "#2563eb".into(),
            line_width: 2,
        }
    }
}

impl WaveformConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("waveform raster must be non-empty, got {}x{}", self.width, self.height);
        }
        if !(self.domain_max.is_finite() && self.domain_max > 0.0) {
            bail!("waveform domain_max must be positive, got {}", self.domain_max);
        }
        if !(1..=MAX_LINE_WIDTH).contains(&self.line_width) {
            bail!(
                "waveform line_width must be within 1..={MAX_LINE_WIDTH}, got {}",
                self.line_width
            );
        }
        self.stroke_color().map(|_| ())
    }

    pub fn stroke_color(&self) -> Result<Rgba<u8>> {
        parse_hex_color(&self.stroke)
    }
}

fn parse_hex_color(raw: &str) -> Result<Rgba<u8>> {
    let hex = raw.trim().trim_start_matches('#');
    if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
        bail!("invalid stroke colour '{raw}'");
    }
    let channel = |idx: usize| {
        u8::from_str_radix(&hex[idx..idx + 2], 16).map_err(|_| anyhow!("invalid stroke colour '{raw}'"))
    };
    let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
    Ok(Rgba([channel(0)?, channel(2)?, channel(4)?, alpha]))
}

/// Paints one waveform buffer at a time onto a fixed raster.
///
/// Every call to [`WaveformRenderer::render`] clears the whole surface first,
/// so successive buffers never accumulate.
#[derive(Debug, Clone)]
pub struct WaveformRenderer {
    config: WaveformConfig,
    stroke: Rgba<u8>,
    surface: Surface,
    path: Option<WaveformPath>,
}

impl WaveformRenderer {
    pub fn new(config: WaveformConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            stroke: config.stroke_color()?,
            surface: Surface::new(config.width, config.height),
            path: None,
            config,
        })
    }

    /// Clears the surface and draws `samples`. With fewer than two samples the
    /// surface is left blank and `None` is returned.
    pub fn render(&mut self, samples: &[f64]) -> Option<&WaveformPath> {
        self.surface.clear();
        self.path = trace_path(
            samples,
            self.config.width as f64,
            self.config.height as f64,
            self.config.domain_max,
        );
        if let Some(path) = &self.path {
            self.surface
                .stroke_polyline(&path.points(), self.stroke, self.config.line_width);
        }
        self.path.as_ref()
    }

    pub fn config(&self) -> &WaveformConfig {
        &self.config
    }

    pub fn path(&self) -> Option<&WaveformPath> {
        self.path.as_ref()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn to_png(&self) -> Result<Vec<u8>> {
        self.surface.to_png()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> WaveformRenderer {
        WaveformRenderer::new(WaveformConfig::default()).unwrap()
    }

    fn inked_pixels(surface: &Surface) -> Vec<(u32, u32)> {
        surface
            .image()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] != 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn zero_or_one_sample_draws_nothing() {
        let mut r = renderer();
        assert!(r.render(&[]).is_none());
        assert!(r.surface().is_blank());

        assert!(r.render(&[73.0]).is_none());
        assert!(r.surface().is_blank());
    }

    #[test]
    fn single_sample_after_a_trace_blanks_the_surface() {
        let mut r = renderer();
        r.render(&[10.0, 90.0, 10.0]);
        assert!(!r.surface().is_blank());

        r.render(&[50.0]);
        assert!(r.surface().is_blank());
        assert!(r.path().is_none());
    }

    #[test]
    fn second_render_leaves_no_trace_of_the_first() {
        let mut r = renderer();
        r.render(&[10.0, 90.0, 10.0]);
        // The peak at x=300 plots near y=16; a flat line at 50 never goes there.
        assert!(r.surface().pixel(300, 16).is_some_and(|p| p.0[3] != 0));

        r.render(&[50.0, 50.0, 50.0]);
        let inked = inked_pixels(r.surface());
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|&(_, y)| (79..=81).contains(&y)), "stray pixels from first buffer");

        let mut fresh = renderer();
        fresh.render(&[50.0, 50.0, 50.0]);
        assert_eq!(r.surface().image(), fresh.surface().image());
    }

    #[test]
    fn rejects_bad_geometry() {
        let zero = WaveformConfig {
            width: 0,
            ..Default::default()
        };
        assert!(WaveformRenderer::new(zero).is_err());

        let domain = WaveformConfig {
            domain_max: 0.0,
            ..Default::default()
        };
        assert!(WaveformRenderer::new(domain).is_err());

        let colour = WaveformConfig {
            stroke: "blue".into(),
            ..Default::default()
        };
        assert!(WaveformRenderer::new(colour).is_err());
    }

    #[test]
    fn line_width_is_bounded() {
        for line_width in [0, MAX_LINE_WIDTH + 1, 1_000_000] {
            let config = WaveformConfig {
                line_width,
                ..Default::default()
            };
            assert!(config.validate().is_err(), "accepted line_width {line_width}");
        }

        let widest = WaveformConfig {
            line_width: MAX_LINE_WIDTH,
            ..Default::default()
        };
        let mut r = WaveformRenderer::new(widest).unwrap();
        assert!(r.render(&[0.0, 100.0, 0.0, 100.0]).is_some());
    }

    #[test]
    fn segments_touching_non_finite_samples_are_skipped() {
        let mut r = renderer();
        // x positions 0, 200, 400, 600; only the 90 -> 50 segment is drawable.
        let path = r.render(&[10.0, f64::NAN, 90.0, 50.0]).unwrap();
        assert_eq!(path.line_to.len(), 3);

        let inked = inked_pixels(r.surface());
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|&(x, _)| x >= 399), "ink left of the last segment");
        assert!(r.surface().pixel(500, 48).is_some_and(|p| p.0[3] != 0));

        r.render(&[f64::INFINITY, 50.0, 50.0]);
        let inked = inked_pixels(r.surface());
        assert!(!inked.is_empty());
        assert!(inked.iter().all(|&(x, _)| x >= 299));

        r.render(&[f64::NAN, f64::NEG_INFINITY]);
        assert!(r.surface().is_blank());
    }

    #[test]
    fn out_of_domain_samples_are_clipped_to_the_raster() {
        let mut r = renderer();
        let path = r.render(&[50.0, 250.0, -1e12, 50.0]).unwrap();
        // The path keeps the unclipped coordinates.
        assert_eq!(path.line_to[0].y, -240.0);

        let inked = inked_pixels(r.surface());
        assert!(inked.iter().any(|&(_, y)| y <= 1), "peak should reach the top edge");
        assert!(inked.iter().any(|&(_, y)| y >= 158), "trough should reach the bottom edge");
        assert!(r.surface().pixel(0, 80).is_some_and(|p| p.0[3] != 0));
    }

    #[test]
    fn stroke_colour_parses_hex() {
        assert_eq!(parse_hex_color("#2563eb").unwrap(), Rgba([0x25, 0x63, 0xeb, 0xff]));
        assert_eq!(parse_hex_color("00ff0080").unwrap(), Rgba([0, 0xff, 0, 0x80]));
    }
}
