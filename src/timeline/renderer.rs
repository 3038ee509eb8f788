use anyhow::Result;
use chrono::{DateTime, Utc};
use image::{Rgba, RgbaImage};
use serde::Serialize;

use crate::models::{SleepSegment, SleepStage};
use crate::waveform::encode_png;

use super::accounting::width_fractions;

const TRACK_BACKGROUND: Rgba<u8> = Rgba([226, 232, 240, 255]);

/// Fixed presentation style per stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageStyle {
    pub class: &'static str,
    pub color: &'static str,
    #[serde(skip)]
    pub rgb: [u8; 3],
}

pub fn stage_style(stage: SleepStage) -> StageStyle {
    match stage {
        SleepStage::Light => StageStyle {
            class: "bg-green-400",
            color: "#4ade80",
            rgb: [0x4a, 0xde, 0x80],
        },
        SleepStage::Deep => StageStyle {
            class: "bg-red-500",
            color: "#ef4444",
            rgb: [0xef, 0x44, 0x44],
        },
        SleepStage::Awake => StageStyle {
            class: "bg-yellow-400",
            color: "#facc15",
            rgb: [0xfa, 0xcc, 0x15],
        },
        SleepStage::Rem => StageStyle {
            class: "bg-blue-500",
            color: "#3b82f6",
            rgb: [0x3b, 0x82, 0xf6],
        },
        SleepStage::Unknown => StageStyle {
            class: "bg-gray-300",
            color: "#d1d5db",
            rgb: [0xd1, 0xd5, 0xdb],
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSlice {
    pub stage: SleepStage,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Share of the bar, 0..=1.
    pub fraction: f64,
    /// Sum of the fractions of every slice before this one.
    pub offset: f64,
    pub width_percent: f64,
    pub offset_percent: f64,
    pub style: StageStyle,
    pub title: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub stage: SleepStage,
    pub label: &'static str,
    pub style: StageStyle,
}

/// A horizontal bar partitioned into abutting stage slices, plus the legend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineBar {
    pub slices: Vec<TimelineSlice>,
    pub legend: Vec<LegendEntry>,
}

/// Legend for every stage, whether or not it occurs in the data.
pub fn legend() -> Vec<LegendEntry> {
    SleepStage::LEGEND
        .into_iter()
        .map(|stage| LegendEntry {
            stage,
            label: stage.as_str(),
            style: stage_style(stage),
        })
        .collect()
}

/// Lays segments out left to right in the order given. Segments are never
/// re-sorted; supplying them chronologically is the caller's job.
pub fn render_timeline(segments: &[SleepSegment]) -> TimelineBar {
    let fractions = width_fractions(segments);
    let mut offset = 0.0;
    let slices = segments
        .iter()
        .zip(fractions)
        .map(|(segment, fraction)| {
            let slice = TimelineSlice {
                stage: segment.stage,
                start: segment.start,
                end: segment.end,
                fraction,
                offset,
                width_percent: fraction * 100.0,
                offset_percent: offset * 100.0,
                style: stage_style(segment.stage),
                title: segment.stage.as_str(),
            };
            offset += fraction;
            slice
        })
        .collect();

    TimelineBar {
        slices,
        legend: legend(),
    }
}

impl TimelineBar {
    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Paints the bar onto a `width`×`height` raster. Slice edges are rounded
    /// from the cumulative offsets, so neighbours share a pixel boundary.
    pub fn paint(&self, width: u32, height: u32) -> RgbaImage {
        let mut image = RgbaImage::from_pixel(width, height, TRACK_BACKGROUND);
        let edge = |position: f64| -> u32 { ((position * width as f64).round() as u32).min(width) };

        for slice in &self.slices {
            let x0 = edge(slice.offset);
            let x1 = edge(slice.offset + slice.fraction);
            let [r, g, b] = slice.style.rgb;
            for x in x0..x1 {
                for y in 0..height {
                    image.put_pixel(x, y, Rgba([r, g, b, 255]));
                }
            }
        }
        image
    }

    pub fn to_png(&self, width: u32, height: u32) -> Result<Vec<u8>> {
        encode_png(&self.paint(width, height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_ms(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn seg(start: i64, end: i64, stage: SleepStage) -> SleepSegment {
        SleepSegment::new(at_ms(start), at_ms(end), stage)
    }

    #[test]
    fn two_segments_split_two_thirds_one_third() {
        let bar = render_timeline(&[
            seg(1000, 2000, SleepStage::Light),
            seg(2000, 2500, SleepStage::Deep),
        ]);

        assert_eq!(bar.slices.len(), 2);
        assert!((bar.slices[0].width_percent - 66.666_666).abs() < 0.01);
        assert!((bar.slices[1].width_percent - 33.333_333).abs() < 0.01);
        assert_eq!(bar.slices[0].offset, 0.0);
        assert_eq!(bar.slices[1].offset, bar.slices[0].offset + bar.slices[0].fraction);
        assert_eq!(bar.slices[0].style.class, "bg-green-400");
        assert_eq!(bar.slices[1].style.class, "bg-red-500");
    }

    #[test]
    fn slices_abut_and_fill_the_bar() {
        let bar = render_timeline(&[
            seg(0, 1_800_000, SleepStage::Light),
            seg(1_800_000, 4_500_000, SleepStage::Deep),
            seg(4_500_000, 4_800_000, SleepStage::Awake),
            seg(4_800_000, 6_600_000, SleepStage::Rem),
            seg(6_600_000, 7_000_000, SleepStage::Light),
        ]);

        for pair in bar.slices.windows(2) {
            assert_eq!(pair[1].offset, pair[0].offset + pair[0].fraction);
        }
        let last = bar.slices.last().unwrap();
        assert!((last.offset + last.fraction - 1.0).abs() < 1e-9);
    }

    #[test]
    fn legend_lists_every_stage_even_when_absent() {
        let bar = render_timeline(&[seg(0, 10, SleepStage::Rem)]);
        let stages: Vec<_> = bar.legend.iter().map(|e| e.stage).collect();
        assert_eq!(stages, SleepStage::LEGEND.to_vec());

        let empty = render_timeline(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.legend.len(), 4);
    }

    #[test]
    fn misordered_input_is_kept_as_given() {
        let bar = render_timeline(&[
            seg(2000, 2500, SleepStage::Deep),
            seg(1000, 2000, SleepStage::Light),
        ]);
        assert_eq!(bar.slices[0].stage, SleepStage::Deep);
        assert_eq!(bar.slices[1].stage, SleepStage::Light);
    }

    #[test]
    fn painted_bar_has_no_gaps() {
        let bar = render_timeline(&[
            seg(0, 1000, SleepStage::Light),
            seg(1000, 1333, SleepStage::Deep),
            seg(1333, 3000, SleepStage::Awake),
        ]);
        let image = bar.paint(97, 4);

        for x in 0..97 {
            assert_ne!(*image.get_pixel(x, 2), TRACK_BACKGROUND, "gap at x={x}");
        }
        assert_eq!(image.get_pixel(0, 0).0[..3], stage_style(SleepStage::Light).rgb);
        assert_eq!(image.get_pixel(96, 0).0[..3], stage_style(SleepStage::Awake).rgb);
    }

    #[test]
    fn empty_bar_exports_bare_track() {
        let png = render_timeline(&[]).to_png(40, 4).unwrap();
        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert!(decoded.pixels().all(|p| *p == TRACK_BACKGROUND));
    }
}
