use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::FieldLookup;

use super::timestamp;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReadinessStatus {
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "not approved")]
    NotApproved,
}

impl ReadinessStatus {
    pub const ALL: [ReadinessStatus; 2] = [ReadinessStatus::Approved, ReadinessStatus::NotApproved];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadinessStatus::Approved => "approved",
            ReadinessStatus::NotApproved => "not approved",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value.trim()))
    }
}

/// Daily fitness-for-duty determination for one driver/device pair.
///
/// Status stays a raw string: the filter matches on whatever the backend sent,
/// and an unknown value must not drop the row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessRecord {
    #[serde(deserialize_with = "timestamp::lenient")]
    pub datetime: Option<DateTime<Utc>>,
    pub driver_name: Option<String>,
    pub device_id: Option<String>,
    pub last_sleep_score: Option<f64>,
    pub last_bp_systolic: Option<f64>,
    pub last_bp_diastolic: Option<f64>,
    pub status: Option<String>,
}

impl ReadinessRecord {
    pub fn readiness(&self) -> Option<ReadinessStatus> {
        self.status.as_deref().and_then(ReadinessStatus::parse)
    }

    pub fn is_approved(&self) -> bool {
        self.readiness() == Some(ReadinessStatus::Approved)
    }
}

impl FieldLookup for ReadinessRecord {
    fn field(&self, key: &str) -> Option<&str> {
        match key {
            "driver_name" => self.driver_name.as_deref(),
            "device_id" => self.device_id.as_deref(),
            "status" => self.status.as_deref(),
            _ => None,
        }
    }
}
