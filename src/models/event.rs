use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::filter::FieldLookup;

use super::timestamp;

/// Alarm kinds the console knows how to label. The backend may send others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    #[serde(rename = "SOS")]
    Sos,
    #[serde(rename = "Fall Down")]
    FallDown,
    #[serde(rename = "Low Battery")]
    LowBattery,
    #[serde(rename = "Remove Smart Wearable")]
    RemoveSmartWearable,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Sos,
        EventKind::FallDown,
        EventKind::LowBattery,
        EventKind::RemoveSmartWearable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Sos => "SOS",
            EventKind::FallDown => "Fall Down",
            EventKind::LowBattery => "Low Battery",
            EventKind::RemoveSmartWearable => "Remove Smart Wearable",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRecord {
    #[serde(deserialize_with = "timestamp::lenient")]
    pub datetime: Option<DateTime<Utc>>,
    pub driver_name: Option<String>,
    pub device_id: Option<String>,
    pub status_event: Option<String>,
    pub address: Option<String>,
}

impl FieldLookup for EventRecord {
    fn field(&self, key: &str) -> Option<&str> {
        match key {
            "driver_name" => self.driver_name.as_deref(),
            "device_id" => self.device_id.as_deref(),
            "status_event" => self.status_event.as_deref(),
            "address" => self.address.as_deref(),
            _ => None,
        }
    }
}
