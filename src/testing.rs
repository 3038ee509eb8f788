//! Scripted backend double for view and controller tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::NaiveDate;

use crate::api::FleetApi;
use crate::models::{
    DeviceDetail, DeviceSummary, EcgFrame, EventRecord, FleetSummary, MapPoint, ReadinessRecord,
    SleepSession,
};

/// One canned response: wait `delay` on the (usually paused) tokio clock,
/// then return `result`.
#[derive(Debug, Clone)]
pub struct Scripted<T> {
    pub delay: Duration,
    pub result: Result<T, String>,
}

impl<T> Scripted<T> {
    pub fn ok(value: T) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Ok(value),
        }
    }

    pub fn fail(message: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            result: Err(message.to_string()),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    async fn resolve(self) -> Result<T> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.result.map_err(|message| anyhow!(message))
    }
}

fn empty<T>() -> Scripted<Vec<T>> {
    Scripted::ok(Vec::new())
}

pub struct ScriptedFleet {
    summary: Scripted<FleetSummary>,
    readiness: Scripted<Vec<ReadinessRecord>>,
    events: Scripted<Vec<EventRecord>>,
    map: Scripted<Vec<MapPoint>>,
    devices: Scripted<Vec<DeviceSummary>>,
    seed: Scripted<()>,
    details: HashMap<String, Scripted<DeviceDetail>>,
    sleep: HashMap<String, Scripted<Vec<SleepSession>>>,
    ecg_defaults: HashMap<String, Vec<f64>>,
    ecg_queue: Mutex<HashMap<String, VecDeque<Scripted<Vec<f64>>>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFleet {
    pub fn new() -> Self {
        Self {
            summary: Scripted::ok(FleetSummary::default()),
            readiness: empty(),
            events: empty(),
            map: empty(),
            devices: empty(),
            seed: Scripted::ok(()),
            details: HashMap::new(),
            sleep: HashMap::new(),
            ecg_defaults: HashMap::new(),
            ecg_queue: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_summary(mut self, step: Scripted<FleetSummary>) -> Self {
        self.summary = step;
        self
    }

    pub fn with_readiness(mut self, step: Scripted<Vec<ReadinessRecord>>) -> Self {
        self.readiness = step;
        self
    }

    pub fn with_events(mut self, step: Scripted<Vec<EventRecord>>) -> Self {
        self.events = step;
        self
    }

    pub fn with_map(mut self, step: Scripted<Vec<MapPoint>>) -> Self {
        self.map = step;
        self
    }

    pub fn with_devices(mut self, step: Scripted<Vec<DeviceSummary>>) -> Self {
        self.devices = step;
        self
    }

    pub fn with_seed(mut self, step: Scripted<()>) -> Self {
        self.seed = step;
        self
    }

    pub fn with_detail(mut self, device_id: &str, step: Scripted<DeviceDetail>) -> Self {
        self.details.insert(device_id.to_string(), step);
        self
    }

    pub fn with_sleep(mut self, device_id: &str, step: Scripted<Vec<SleepSession>>) -> Self {
        self.sleep.insert(device_id.to_string(), step);
        self
    }

    /// Samples returned once the device's queue is empty.
    pub fn with_ecg_default(mut self, device_id: &str, samples: Vec<f64>) -> Self {
        self.ecg_defaults.insert(device_id.to_string(), samples);
        self
    }

    /// Queues the next ECG response for `device_id`.
    pub fn push_ecg(&self, device_id: &str, step: Scripted<Vec<f64>>) {
        self.ecg_queue
            .lock()
            .unwrap()
            .entry(device_id.to_string())
            .or_default()
            .push_back(step);
    }

    /// Every call made so far, as `endpoint` or `endpoint:device[:date]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_ecg(&self, device_id: &str) -> Scripted<Vec<f64>> {
        self.record(format!("ecg:{device_id}"));
        let queued = self
            .ecg_queue
            .lock()
            .unwrap()
            .get_mut(device_id)
            .and_then(VecDeque::pop_front);
        queued.unwrap_or_else(|| {
            Scripted::ok(self.ecg_defaults.get(device_id).cloned().unwrap_or_default())
        })
    }
}

impl FleetApi for ScriptedFleet {
    async fn summary(&self) -> Result<FleetSummary> {
        self.record("summary".into());
        self.summary.clone().resolve().await
    }

    async fn readiness(&self) -> Result<Vec<ReadinessRecord>> {
        self.record("readiness".into());
        self.readiness.clone().resolve().await
    }

    async fn events(&self) -> Result<Vec<EventRecord>> {
        self.record("events".into());
        self.events.clone().resolve().await
    }

    async fn map_points(&self) -> Result<Vec<MapPoint>> {
        self.record("map".into());
        self.map.clone().resolve().await
    }

    async fn devices(&self) -> Result<Vec<DeviceSummary>> {
        self.record("devices".into());
        self.devices.clone().resolve().await
    }

    async fn device_detail(&self, device_id: &str) -> Result<DeviceDetail> {
        self.record(format!("detail:{device_id}"));
        let step = self
            .details
            .get(device_id)
            .cloned()
            .unwrap_or_else(|| Scripted::fail("unknown device"));
        step.resolve().await
    }

    async fn ecg(&self, device_id: &str) -> Result<EcgFrame> {
        let step = self.next_ecg(device_id);
        step.resolve().await.map(|samples| EcgFrame { samples })
    }

    async fn sleep_sessions(
        &self,
        device_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SleepSession>> {
        match date {
            Some(date) => self.record(format!("sleep:{device_id}:{date}")),
            None => self.record(format!("sleep:{device_id}")),
        }
        let step = self.sleep.get(device_id).cloned().unwrap_or_else(empty);
        step.resolve().await
    }

    async fn seed(&self) -> Result<()> {
        self.record("seed".into());
        self.seed.clone().resolve().await
    }
}

/// Lets spawned tasks run without moving the paused clock meaningfully.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
