mod aggregator;
mod map;

#[cfg(feature = "desktop")]
pub mod commands;

pub use aggregator::{DashboardSnapshot, DashboardTable, DashboardView, Slot, SlotName};
pub use map::{layout_markers, marker_position, MapMarker};
