use serde::Serialize;

use crate::models::MapPoint;

const LEFT_BASE: u32 = 20;
const LEFT_STEP: u32 = 20;
const LEFT_SLOTS: u32 = 4;
const TOP_BASE: u32 = 30;
const TOP_STEP: u32 = 10;
const TOP_SLOTS: u32 = 7;

/// One device pin on the schematic fleet map. Positions are percentages of
/// the map canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub device_id: String,
    pub driver_name: String,
    pub battery: Option<u8>,
    pub event: String,
    pub address: String,
    pub alert: bool,
    pub left_percent: u32,
    pub top_percent: u32,
}

/// Deterministic pin position for the `index`-th point. Wraps so that every
/// pin stays on the canvas however long the list is.
pub fn marker_position(index: usize) -> (u32, u32) {
    let left = LEFT_BASE + (index as u32 % LEFT_SLOTS) * LEFT_STEP;
    let top = TOP_BASE + (index as u32 % TOP_SLOTS) * TOP_STEP;
    (left, top)
}

pub fn layout_markers(points: &[MapPoint]) -> Vec<MapMarker> {
    points
        .iter()
        .enumerate()
        .map(|(index, point)| {
            let (left_percent, top_percent) = marker_position(index);
            MapMarker {
                device_id: point.device_id.clone().unwrap_or_else(|| "-".into()),
                driver_name: point.driver_name.clone().unwrap_or_default(),
                battery: point.battery_percent(),
                event: point.active_event().unwrap_or("Normal").to_string(),
                address: point
                    .address
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .unwrap_or("-")
                    .to_string(),
                alert: point.active_event().is_some(),
                left_percent,
                top_percent,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_wrap_within_canvas() {
        assert_eq!(marker_position(0), (20, 30));
        assert_eq!(marker_position(1), (40, 40));
        assert_eq!(marker_position(3), (80, 60));
        assert_eq!(marker_position(4), (20, 70));
        assert_eq!(marker_position(7), (80, 30));
        for index in 0..100 {
            let (left, top) = marker_position(index);
            assert!(left <= 80 && top <= 90);
        }
    }

    #[test]
    fn missing_fields_get_display_fallbacks() {
        let markers = layout_markers(&[
            MapPoint {
                device_id: Some("DEV-1".into()),
                driver_name: Some("Adi".into()),
                battery: Some(130.0),
                event: Some("SOS".into()),
                address: Some("Jl. Sudirman".into()),
            },
            MapPoint {
                battery: Some(-4.0),
                event: Some("  ".into()),
                ..MapPoint::default()
            },
        ]);

        assert_eq!(markers[0].battery, Some(100));
        assert!(markers[0].alert);
        assert_eq!(markers[0].event, "SOS");

        assert_eq!(markers[1].device_id, "-");
        assert_eq!(markers[1].battery, Some(0));
        assert_eq!(markers[1].event, "Normal");
        assert_eq!(markers[1].address, "-");
        assert!(!markers[1].alert);
        assert_eq!((markers[1].left_percent, markers[1].top_percent), (40, 40));
    }
}
