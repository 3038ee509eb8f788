use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::api::FleetApi;
use crate::filter::{FieldBindings, FilterQuery, FilterTable, TableView};
use crate::models::{EventKind, EventRecord, FleetSummary, MapPoint, ReadinessRecord, ReadinessStatus};

use super::map::{layout_markers, MapMarker};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SlotName {
    Summary,
    Readiness,
    Events,
    Map,
}

impl SlotName {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Summary => "summary",
            SlotName::Readiness => "readiness",
            SlotName::Events => "events",
            SlotName::Map => "map",
        }
    }
}

/// The two filterable tables on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DashboardTable {
    Readiness,
    Events,
}

/// One independently populated region of the dashboard. A failed fetch keeps
/// whatever value the slot already had.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot<T> {
    pub value: T,
    pub loaded: bool,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> Slot<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            loaded: false,
            error: None,
            updated_at: None,
        }
    }

    pub(crate) fn settle<V>(&mut self, name: &str, outcome: Result<V>, apply: impl FnOnce(&mut T, V)) {
        match outcome {
            Ok(fetched) => {
                apply(&mut self.value, fetched);
                self.loaded = true;
                self.error = None;
                self.updated_at = Some(Utc::now());
            }
            Err(err) => {
                log_warn!("{} fetch failed: {err:#}", name);
                self.error = Some(format!("{err:#}"));
            }
        }
    }

    pub fn project<U>(&self, f: impl FnOnce(&T) -> U) -> Slot<U> {
        Slot {
            value: f(&self.value),
            loaded: self.loaded,
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

struct DashboardState {
    summary: Slot<Option<FleetSummary>>,
    readiness: Slot<FilterTable<ReadinessRecord>>,
    events: Slot<FilterTable<EventRecord>>,
    map: Slot<Vec<MapPoint>>,
}

impl DashboardState {
    fn new() -> Self {
        let readiness = FilterTable::new(FieldBindings::new("driver_name").with_status("status"))
            .with_status_options(ReadinessStatus::ALL.iter().map(ReadinessStatus::as_str));
        let events = FilterTable::new(FieldBindings::new("driver_name").with_status("status_event"))
            .with_status_options(EventKind::ALL.iter().map(EventKind::as_str));

        Self {
            summary: Slot::new(None),
            readiness: Slot::new(readiness),
            events: Slot::new(events),
            map: Slot::new(Vec::new()),
        }
    }

    fn table_query(&mut self, table: DashboardTable) -> &mut FilterQuery {
        match table {
            DashboardTable::Readiness => self.readiness.value.query_mut(),
            DashboardTable::Events => self.events.value.query_mut(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub summary: Slot<Option<FleetSummary>>,
    pub readiness: Slot<TableView<ReadinessRecord>>,
    pub events: Slot<TableView<EventRecord>>,
    pub map: Slot<Vec<MapMarker>>,
}

/// Fleet overview: summary counters, the readiness and event tables, and the
/// device map, each fed by its own fetch.
pub struct DashboardView<A: FleetApi> {
    api: Arc<A>,
    seed_on_activate: bool,
    state: Mutex<DashboardState>,
    updates: broadcast::Sender<SlotName>,
}

impl<A: FleetApi> DashboardView<A> {
    pub fn new(api: Arc<A>) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            api,
            seed_on_activate: false,
            state: Mutex::new(DashboardState::new()),
            updates,
        }
    }

    pub fn with_seed_on_activate(mut self, seed: bool) -> Self {
        self.seed_on_activate = seed;
        self
    }

    /// Receives the name of each slot as it settles, success or failure.
    pub fn subscribe(&self) -> broadcast::Receiver<SlotName> {
        self.updates.subscribe()
    }

    /// Fetches all four slots concurrently. Each slot is written the moment
    /// its own response lands; a failure only marks that slot.
    pub async fn activate(&self) -> DashboardSnapshot {
        if self.seed_on_activate {
            match self.api.seed().await {
                Ok(()) => log_info!("backend seeded before dashboard load"),
                Err(err) => log_warn!("seeding failed, loading dashboard anyway: {err:#}"),
            }
        }

        let summary = async {
            let outcome = self.api.summary().await;
            self.publish(SlotName::Summary, |state| {
                state.summary.settle(SlotName::Summary.as_str(), outcome, |value, fetched| {
                    *value = Some(fetched)
                })
            });
        };
        let readiness = async {
            let outcome = self.api.readiness().await;
            self.publish(SlotName::Readiness, |state| {
                state
                    .readiness
                    .settle(SlotName::Readiness.as_str(), outcome, FilterTable::set_rows)
            });
        };
        let events = async {
            let outcome = self.api.events().await;
            self.publish(SlotName::Events, |state| {
                state.events.settle(SlotName::Events.as_str(), outcome, FilterTable::set_rows)
            });
        };
        let map = async {
            let outcome = self.api.map_points().await;
            self.publish(SlotName::Map, |state| {
                state.map.settle(SlotName::Map.as_str(), outcome, |value, fetched| *value = fetched)
            });
        };
        tokio::join!(summary, readiness, events, map);

        self.snapshot()
    }

    fn publish(&self, name: SlotName, apply: impl FnOnce(&mut DashboardState)) {
        apply(&mut self.lock());
        // No subscribers is fine.
        let _ = self.updates.send(name);
    }

    pub fn set_query(&self, table: DashboardTable, query: FilterQuery) {
        *self.lock().table_query(table) = query;
    }

    pub fn set_text(&self, table: DashboardTable, text: impl Into<String>) {
        self.lock().table_query(table).text = text.into();
    }

    pub fn set_status(&self, table: DashboardTable, status: Option<String>) {
        self.lock().table_query(table).status_exact = status;
    }

    pub fn summary(&self) -> Slot<Option<FleetSummary>> {
        self.lock().summary.clone()
    }

    pub fn readiness_view(&self) -> Slot<TableView<ReadinessRecord>> {
        self.lock().readiness.project(FilterTable::view)
    }

    pub fn events_view(&self) -> Slot<TableView<EventRecord>> {
        self.lock().events.project(FilterTable::view)
    }

    pub fn map_markers(&self) -> Slot<Vec<MapMarker>> {
        self.lock().map.project(|points| layout_markers(points))
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let state = self.lock();
        DashboardSnapshot {
            summary: state.summary.clone(),
            readiness: state.readiness.project(FilterTable::view),
            events: state.events.project(FilterTable::view),
            map: state.map.project(|points| layout_markers(points)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DashboardState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
