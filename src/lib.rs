pub mod utils;

pub mod api;
pub mod dashboard;
pub mod device;
pub mod filter;
pub mod models;
pub mod refresh;
pub mod settings;
pub mod timeline;
pub mod waveform;

#[cfg(test)]
mod testing;

pub use utils::init_logging;

#[cfg(feature = "desktop")]
pub use desktop::run;

#[cfg(feature = "desktop")]
pub(crate) use desktop::AppState;

#[cfg(feature = "desktop")]
mod desktop {
    use std::sync::Arc;

    use tauri::{AppHandle, Emitter, Manager, State};

    use crate::api::ApiClient;
    use crate::dashboard::{
        commands::{activate_dashboard, get_dashboard, set_dashboard_filter},
        DashboardView,
    };
    use crate::device::{
        commands::{
            close_device, get_device_detail, load_devices, open_device, render_ecg,
            search_devices, set_sleep_date,
        },
        DeviceDetailView, DeviceListView,
    };
    use crate::settings::{ConsoleSettings, SettingsStore};
    use crate::utils::init_logging;

    const ENABLE_LOGS: bool = true;

    use crate::{log_info, log_warn};

    pub(crate) struct AppState {
        pub(crate) settings: SettingsStore,
        pub(crate) dashboard: DashboardView<ApiClient>,
        pub(crate) devices: DeviceListView<ApiClient>,
        pub(crate) detail: DeviceDetailView<ApiClient>,
    }

    impl AppState {
        fn new(settings: SettingsStore) -> anyhow::Result<Self> {
            let current = settings.get();
            let api = Arc::new(ApiClient::from_settings(&current)?);
            Ok(Self {
                dashboard: DashboardView::new(api.clone())
                    .with_seed_on_activate(current.seed_on_activate),
                devices: DeviceListView::new(api.clone()),
                detail: DeviceDetailView::from_settings(api, &current)?,
                settings,
            })
        }
    }

    #[tauri::command]
    fn get_settings(state: State<AppState>) -> Result<ConsoleSettings, String> {
        Ok(state.settings.get())
    }

    /// Persists new settings. Backend and refresh changes apply on next launch.
    #[tauri::command]
    fn update_settings(
        settings: ConsoleSettings,
        state: State<AppState>,
        app_handle: AppHandle,
    ) -> Result<(), String> {
        state
            .settings
            .update(settings.clone())
            .map_err(|e| e.to_string())?;

        app_handle
            .emit("settings-updated", &settings)
            .map_err(|e| e.to_string())?;

        Ok(())
    }

    /// Pushes each applied ECG frame and each settled dashboard slot to the
    /// webview.
    fn forward_updates(app_handle: AppHandle, state: &AppState) {
        let mut frames = state.detail.subscribe_ecg();
        let handle = app_handle.clone();
        tauri::async_runtime::spawn(async move {
            while frames.changed().await.is_ok() {
                let frame = frames.borrow_and_update().clone();
                if let Err(err) = handle.emit("ecg-updated", frame) {
                    log_warn!("failed to emit ecg-updated: {err}");
                }
            }
        });

        let mut slots = state.dashboard.subscribe();
        tauri::async_runtime::spawn(async move {
            while let Ok(slot) = slots.recv().await {
                if let Err(err) = app_handle.emit("dashboard-slot-updated", slot) {
                    log_warn!("failed to emit dashboard-slot-updated: {err}");
                }
            }
        });
    }

    #[cfg_attr(mobile, tauri::mobile_entry_point)]
    pub fn run() {
        init_logging();

        log_info!("FleetVitals starting up...");

        tauri::Builder::default()
            .plugin(tauri_plugin_opener::init())
            .setup(|app| {
                let result = (|| -> anyhow::Result<()> {
                    let app_data_dir = app
                        .path()
                        .app_data_dir()
                        .map_err(|err| anyhow::anyhow!(err))?;
                    std::fs::create_dir_all(&app_data_dir)?;

                    let settings_store = SettingsStore::new(app_data_dir.join("settings.json"))?;
                    log_info!("backend: {}", settings_store.get().backend_url);

                    let state = AppState::new(settings_store)?;
                    forward_updates(app.handle().clone(), &state);
                    app.manage(state);

                    Ok(())
                })();

                result.map_err(|err| err.into())
            })
            .invoke_handler(tauri::generate_handler![
                get_settings,
                update_settings,
                activate_dashboard,
                get_dashboard,
                set_dashboard_filter,
                load_devices,
                search_devices,
                open_device,
                get_device_detail,
                set_sleep_date,
                close_device,
                render_ecg,
            ])
            .run(tauri::generate_context!())
            .expect("error while running tauri application");
    }
}
