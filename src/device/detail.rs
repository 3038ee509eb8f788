use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::api::FleetApi;
use crate::dashboard::Slot;
use crate::models::{HealthSnapshot, SleepSegment, SleepSession, SleepStage};
use crate::refresh::{LiveRefreshController, LiveWaveform, RefreshState};
use crate::settings::ConsoleSettings;
use crate::timeline::{render_timeline, TimelineBar};
use crate::waveform::{WaveformConfig, WaveformPath, WaveformRenderer};

const ENABLE_LOGS: bool = true;

use crate::log_info;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageMinutes {
    pub stage: SleepStage,
    pub minutes: f64,
}

/// One night, laid out for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSessionView {
    pub date: Option<String>,
    pub score: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub timeline: TimelineBar,
    pub segments: Vec<SleepSegment>,
    pub stage_minutes: Vec<StageMinutes>,
}

impl From<&SleepSession> for SleepSessionView {
    fn from(session: &SleepSession) -> Self {
        Self {
            date: session.date.clone(),
            score: session.score,
            duration_minutes: session.duration_minutes,
            timeline: render_timeline(&session.segments),
            segments: session.segments.clone(),
            stage_minutes: session
                .stage_minutes()
                .into_iter()
                .map(|(stage, minutes)| StageMinutes { stage, minutes })
                .collect(),
        }
    }
}

/// The current waveform buffer drawn onto the renderer's raster.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EcgRender {
    pub device_id: Option<String>,
    pub seq: Option<u64>,
    pub received_at: Option<DateTime<Utc>>,
    pub width: u32,
    pub height: u32,
    pub path: Option<WaveformPath>,
    pub png: Vec<u8>,
}

struct DetailState {
    device_id: Option<String>,
    date: Option<NaiveDate>,
    health: Slot<Option<HealthSnapshot>>,
    sleep: Slot<Vec<SleepSession>>,
}

impl DetailState {
    fn new() -> Self {
        Self {
            device_id: None,
            date: None,
            health: Slot::new(None),
            sleep: Slot::new(Vec::new()),
        }
    }

    fn showing(&self, device_id: &str) -> bool {
        self.device_id.as_deref() == Some(device_id)
    }
}

/// Per-device page: health snapshot, sleep history and the live ECG trace.
///
/// Owns its refresh controller and waveform renderer; nothing here is shared
/// with other views.
pub struct DeviceDetailView<A: FleetApi> {
    api: Arc<A>,
    refresh: LiveRefreshController<A>,
    renderer: Mutex<WaveformRenderer>,
    state: Mutex<DetailState>,
    // Held from picking the device until its polling has started.
    switching: tokio::sync::Mutex<()>,
}

impl<A: FleetApi> DeviceDetailView<A> {
    pub fn new(api: Arc<A>, refresh: LiveRefreshController<A>, waveform: WaveformConfig) -> Result<Self> {
        Ok(Self {
            api,
            refresh,
            renderer: Mutex::new(WaveformRenderer::new(waveform)?),
            state: Mutex::new(DetailState::new()),
            switching: tokio::sync::Mutex::new(()),
        })
    }

    pub fn from_settings(api: Arc<A>, settings: &ConsoleSettings) -> Result<Self> {
        let refresh = LiveRefreshController::from_settings(api.clone(), settings);
        Self::new(api, refresh, settings.waveform.clone())
    }

    /// Shows `device_id`: starts live ECG polling and loads the health
    /// snapshot and sleep sessions concurrently. Switching from another
    /// device drops everything shown for it.
    pub async fn open(&self, device_id: &str) -> Result<()> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            bail!("device id must not be empty");
        }

        let switching = self.switching.lock().await;
        let date = {
            let mut state = self.lock();
            if !state.showing(device_id) {
                if let Some(previous) = state.device_id.as_deref() {
                    log_info!("device view switching {} -> {}", previous, device_id);
                }
                state.device_id = Some(device_id.to_string());
                state.health = Slot::new(None);
                state.sleep = Slot::new(Vec::new());
            }
            state.date
        };
        self.refresh.start(device_id).await?;
        drop(switching);

        tokio::join!(self.load_health(device_id), self.load_sleep(device_id, date));
        Ok(())
    }

    pub async fn switch_device(&self, device_id: &str) -> Result<()> {
        self.open(device_id).await
    }

    /// Narrows the sleep list to one date (`None` for all) and re-fetches it.
    pub async fn set_date(&self, date: Option<NaiveDate>) {
        let device_id = {
            let mut state = self.lock();
            state.date = date;
            state.device_id.clone()
        };
        if let Some(device_id) = device_id {
            self.load_sleep(&device_id, date).await;
        }
    }

    /// Tears the view down: stops polling. Loaded data stays readable.
    pub async fn close(&self) {
        self.refresh.stop().await;
    }

    async fn load_health(&self, device_id: &str) {
        let outcome = self.api.device_detail(device_id).await;
        let mut state = self.lock();
        if state.showing(device_id) {
            state
                .health
                .settle("device detail", outcome, |value, detail| *value = detail.health);
        }
    }

    async fn load_sleep(&self, device_id: &str, date: Option<NaiveDate>) {
        let outcome = self.api.sleep_sessions(device_id, date).await;
        let mut state = self.lock();
        if state.showing(device_id) && state.date == date {
            state.sleep.settle("sleep sessions", outcome, |value, sessions| *value = sessions);
        }
    }

    pub fn device_id(&self) -> Option<String> {
        self.lock().device_id.clone()
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.lock().date
    }

    pub fn health(&self) -> Slot<Option<HealthSnapshot>> {
        self.lock().health.clone()
    }

    pub fn sleep_views(&self) -> Slot<Vec<SleepSessionView>> {
        self.lock()
            .sleep
            .project(|sessions| sessions.iter().map(SleepSessionView::from).collect())
    }

    pub fn live_waveform(&self) -> Option<LiveWaveform> {
        self.refresh.current()
    }

    pub fn subscribe_ecg(&self) -> watch::Receiver<Option<LiveWaveform>> {
        self.refresh.subscribe()
    }

    pub async fn refresh_state(&self) -> RefreshState {
        self.refresh.state().await
    }

    /// Redraws the current waveform buffer. An empty or single-sample buffer
    /// yields a blank raster and no path.
    pub fn render_ecg(&self) -> Result<EcgRender> {
        let live = self.refresh.current();
        let samples = live.as_ref().map(|w| w.samples.as_slice()).unwrap_or(&[]);

        let mut renderer = self
            .renderer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let path = renderer.render(samples).cloned();
        Ok(EcgRender {
            device_id: live.as_ref().map(|w| w.device_id.clone()),
            seq: live.as_ref().map(|w| w.seq),
            received_at: live.as_ref().map(|w| w.received_at),
            width: renderer.config().width,
            height: renderer.config().height,
            path,
            png: renderer.to_png()?,
        })
    }

    fn lock(&self) -> MutexGuard<'_, DetailState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
