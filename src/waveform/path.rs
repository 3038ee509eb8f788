use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PathPoint {
    pub x: f64,
    pub y: f64,
}

impl PathPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A polyline in raster coordinates: one move-to, then line-tos in sample
/// order. No smoothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveformPath {
    pub move_to: PathPoint,
    pub line_to: Vec<PathPoint>,
}

impl WaveformPath {
    pub fn points(&self) -> Vec<PathPoint> {
        std::iter::once(self.move_to)
            .chain(self.line_to.iter().copied())
            .collect()
    }
}

/// Maps samples onto a `width`×`height` raster.
///
/// Sample `i` of `n` lands at `x = i / (n - 1) * width`; value `v` lands at
/// `y = height - v / domain_max * height`, so larger values plot higher.
/// Fewer than two samples cannot form a line and yield `None`.
pub fn trace_path(samples: &[f64], width: f64, height: f64, domain_max: f64) -> Option<WaveformPath> {
    if samples.len() < 2 {
        return None;
    }

    let last = (samples.len() - 1) as f64;
    let mut points = samples.iter().enumerate().map(|(i, &value)| {
        PathPoint::new(
            i as f64 / last * width,
            height - (value / domain_max) * height,
        )
    });

    let move_to = points.next()?;
    Some(WaveformPath {
        move_to,
        line_to: points.collect(),
    })
}
