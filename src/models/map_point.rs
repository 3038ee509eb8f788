use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapPoint {
    pub device_id: Option<String>,
    pub driver_name: Option<String>,
    pub battery: Option<f64>,
    pub event: Option<String>,
    pub address: Option<String>,
}

impl MapPoint {
    /// Battery level rounded and clamped to 0..=100.
    pub fn battery_percent(&self) -> Option<u8> {
        self.battery
            .filter(|level| level.is_finite())
            .map(|level| level.round().clamp(0.0, 100.0) as u8)
    }

    /// The point's active event, ignoring blank strings.
    pub fn active_event(&self) -> Option<&str> {
        self.event.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}
