pub mod device;
pub mod event;
pub mod map_point;
pub mod readiness;
pub mod sleep;
pub mod summary;
pub mod timestamp;

use serde::{Deserialize, Serialize};

pub use device::{DeviceDetail, DeviceSummary, EcgFrame, HealthSnapshot};
pub use event::{EventKind, EventRecord};
pub use map_point::MapPoint;
pub use readiness::{ReadinessRecord, ReadinessStatus};
pub use sleep::{SleepSegment, SleepSession, SleepStage};
pub use summary::FleetSummary;

/// `{ "items": [...] }` envelope used by every collection endpoint. A missing
/// `items` key is an empty collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Items<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Items<T> {
    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}
