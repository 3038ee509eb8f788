use serde::{Deserialize, Serialize};

/// Fleet-wide counters shown at the top of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSummary {
    pub high_bp_count: Option<u64>,
    pub low_sleep_score_count: Option<u64>,
    pub under_sleep_duration_count: Option<u64>,
    pub online_devices: Option<u64>,
    pub offline_devices: Option<u64>,
}

impl FleetSummary {
    pub fn total_devices(&self) -> Option<u64> {
        Some(self.online_devices? + self.offline_devices?)
    }
}
