use serde::{Deserialize, Serialize};

use crate::filter::FieldLookup;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSummary {
    pub device_id: Option<String>,
    pub driver_name: Option<String>,
}

impl FieldLookup for DeviceSummary {
    fn field(&self, key: &str) -> Option<&str> {
        match key {
            "device_id" => self.device_id.as_deref(),
            "driver_name" => self.driver_name.as_deref(),
            _ => None,
        }
    }
}

/// Latest vitals and activity counters for one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthSnapshot {
    pub heart_rate: Option<f64>,
    pub bp_systolic: Option<f64>,
    pub bp_diastolic: Option<f64>,
    pub temperature: Option<f64>,
    pub calories: Option<f64>,
    pub steps: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub kilometers: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceDetail {
    pub health: Option<HealthSnapshot>,
}

/// One ECG refresh payload. Samples are in the device's 0..=100 range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcgFrame {
    pub samples: Vec<f64>,
}
