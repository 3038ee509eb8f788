use chrono::NaiveDate;
use serde::Serialize;
use tauri::State;

use crate::dashboard::Slot;
use crate::filter::TableView;
use crate::models::{DeviceSummary, HealthSnapshot};
use crate::refresh::RefreshState;
use crate::AppState;

use super::{EcgRender, SleepSessionView};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetailSnapshot {
    pub device_id: Option<String>,
    pub date: Option<NaiveDate>,
    pub health: Slot<Option<HealthSnapshot>>,
    pub sleep: Slot<Vec<SleepSessionView>>,
    pub refresh: RefreshState,
}

async fn detail_snapshot(state: &State<'_, AppState>) -> DeviceDetailSnapshot {
    let detail = &state.detail;
    DeviceDetailSnapshot {
        device_id: detail.device_id(),
        date: detail.date(),
        health: detail.health(),
        sleep: detail.sleep_views(),
        refresh: detail.refresh_state().await,
    }
}

fn parse_date(raw: Option<String>) -> Result<Option<NaiveDate>, String> {
    match raw.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
        None => Ok(None),
        Some(day) => NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| format!("invalid date {day:?}: {e}")),
    }
}

#[tauri::command]
pub async fn load_devices(
    state: State<'_, AppState>,
) -> Result<Slot<TableView<DeviceSummary>>, String> {
    Ok(state.devices.load().await)
}

#[tauri::command]
pub fn search_devices(
    state: State<'_, AppState>,
    text: String,
) -> Result<Slot<TableView<DeviceSummary>>, String> {
    state.devices.set_text(text);
    Ok(state.devices.view())
}

#[tauri::command]
pub async fn open_device(
    state: State<'_, AppState>,
    device_id: String,
) -> Result<DeviceDetailSnapshot, String> {
    state
        .detail
        .open(&device_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(detail_snapshot(&state).await)
}

#[tauri::command]
pub async fn get_device_detail(state: State<'_, AppState>) -> Result<DeviceDetailSnapshot, String> {
    Ok(detail_snapshot(&state).await)
}

#[tauri::command]
pub async fn set_sleep_date(
    state: State<'_, AppState>,
    date: Option<String>,
) -> Result<DeviceDetailSnapshot, String> {
    let date = parse_date(date)?;
    state.detail.set_date(date).await;
    Ok(detail_snapshot(&state).await)
}

#[tauri::command]
pub async fn close_device(state: State<'_, AppState>) -> Result<(), String> {
    state.detail.close().await;
    Ok(())
}

#[tauri::command]
pub fn render_ecg(state: State<'_, AppState>) -> Result<EcgRender, String> {
    state.detail.render_ecg().map_err(|e| e.to_string())
}
