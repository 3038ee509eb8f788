use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::FleetApi;
use crate::dashboard::Slot;
use crate::filter::{FieldBindings, FilterTable, TableView};
use crate::models::DeviceSummary;

/// Searchable device roster. The search text matches against
/// `"<device_id> <driver_name>"`.
pub struct DeviceListView<A: FleetApi> {
    api: Arc<A>,
    table: Mutex<Slot<FilterTable<DeviceSummary>>>,
}

impl<A: FleetApi> DeviceListView<A> {
    pub fn new(api: Arc<A>) -> Self {
        let table = FilterTable::new(FieldBindings::searching(["device_id", "driver_name"]));
        Self {
            api,
            table: Mutex::new(Slot::new(table)),
        }
    }

    pub async fn load(&self) -> Slot<TableView<DeviceSummary>> {
        let outcome = self.api.devices().await;
        let mut table = self.lock();
        table.settle("devices", outcome, FilterTable::set_rows);
        table.project(FilterTable::view)
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.lock().value.set_text(text);
    }

    pub fn view(&self) -> Slot<TableView<DeviceSummary>> {
        self.lock().project(FilterTable::view)
    }

    fn lock(&self) -> MutexGuard<'_, Slot<FilterTable<DeviceSummary>>> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
