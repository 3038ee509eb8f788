pub mod detail;
pub mod list;

#[cfg(feature = "desktop")]
pub mod commands;

pub use detail::{DeviceDetailView, EcgRender, SleepSessionView, StageMinutes};
pub use list::DeviceListView;
