use tauri::State;

use crate::filter::FilterQuery;
use crate::AppState;

use super::{DashboardSnapshot, DashboardTable};

#[tauri::command]
pub async fn activate_dashboard(state: State<'_, AppState>) -> Result<DashboardSnapshot, String> {
    Ok(state.dashboard.activate().await)
}

#[tauri::command]
pub fn get_dashboard(state: State<'_, AppState>) -> Result<DashboardSnapshot, String> {
    Ok(state.dashboard.snapshot())
}

#[tauri::command]
pub fn set_dashboard_filter(
    state: State<'_, AppState>,
    table: DashboardTable,
    query: FilterQuery,
) -> Result<DashboardSnapshot, String> {
    state.dashboard.set_query(table, query);
    Ok(state.dashboard.snapshot())
}
