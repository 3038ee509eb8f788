//! Sleep-stage timelines: proportional width accounting and bar layout.

pub mod accounting;
pub mod renderer;

pub use accounting::{width_fractions, TimeSpan};
pub use renderer::{legend, render_timeline, stage_style, LegendEntry, StageStyle, TimelineBar, TimelineSlice};
