use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::api::FleetApi;
use crate::settings::ConsoleSettings;

use super::state::{Admission, FetchTicket, RefreshState, RefreshStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(3000);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The waveform buffer: the most recent ECG frame applied for the current
/// target. Replaced wholesale, never merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveWaveform {
    pub device_id: String,
    pub seq: u64,
    pub samples: Vec<f64>,
    pub received_at: DateTime<Utc>,
}

struct Ticker {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl Ticker {
    fn shutdown(self) {
        self.cancel.cancel();
        self.handle.abort();
    }
}

/// Polls `devices/{id}/ecg` for one device at a fixed period and publishes
/// each admitted frame on a watch channel.
pub struct LiveRefreshController<A: FleetApi> {
    api: Arc<A>,
    state: Arc<Mutex<RefreshState>>,
    buffer: Arc<watch::Sender<Option<LiveWaveform>>>,
    ticker: Mutex<Option<Ticker>>,
    interval: Duration,
    fetch_timeout: Duration,
}

impl<A: FleetApi> LiveRefreshController<A> {
    pub fn new(api: Arc<A>, interval: Duration, fetch_timeout: Duration) -> Self {
        let (buffer, _) = watch::channel(None);
        Self {
            api,
            state: Arc::new(Mutex::new(RefreshState::new())),
            buffer: Arc::new(buffer),
            ticker: Mutex::new(None),
            interval,
            fetch_timeout,
        }
    }

    pub fn from_settings(api: Arc<A>, settings: &ConsoleSettings) -> Self {
        Self::new(api, settings.ecg_refresh_interval(), settings.fetch_timeout())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LiveWaveform>> {
        self.buffer.subscribe()
    }

    pub fn current(&self) -> Option<LiveWaveform> {
        self.buffer.borrow().clone()
    }

    pub async fn state(&self) -> RefreshState {
        self.state.lock().await.clone()
    }

    pub async fn status(&self) -> RefreshStatus {
        self.state.lock().await.status
    }

    /// Starts polling `device_id`: one fetch now, then one per interval.
    ///
    /// Already polling the same device is a no-op. Polling a different device
    /// stops the old timer first and clears the buffer.
    pub async fn start(&self, device_id: &str) -> Result<()> {
        let device_id = device_id.trim();
        if device_id.is_empty() {
            bail!("device id must not be empty");
        }

        let mut ticker = self.ticker.lock().await;
        let generation = {
            let mut state = self.state.lock().await;
            if state.is_polling_device(device_id) {
                return Ok(());
            }
            match state.device_id.as_deref().filter(|_| state.is_polling()) {
                Some(previous) => log_info!("ecg refresh switching {} -> {}", previous, device_id),
                None => log_info!("ecg refresh starting for {}", device_id),
            }
            let generation = state.begin_polling(device_id.to_string());
            self.buffer.send_replace(None);
            generation
        };

        if let Some(old) = ticker.take() {
            old.shutdown();
        }

        let cancel = CancellationToken::new();
        let poller = Poller {
            api: self.api.clone(),
            state: self.state.clone(),
            buffer: self.buffer.clone(),
            device_id: device_id.to_string(),
            generation,
            fetch_timeout: self.fetch_timeout,
        };
        let handle = tokio::spawn(poll_loop(poller, self.interval, cancel.clone()));
        *ticker = Some(Ticker { handle, cancel });
        Ok(())
    }

    /// Follows the view's current target: `None` stops, `Some` (re)starts.
    pub async fn set_target(&self, device_id: Option<&str>) -> Result<()> {
        match device_id {
            Some(id) => self.start(id).await,
            None => {
                self.stop().await;
                Ok(())
            }
        }
    }

    /// Cancels the timer and every in-flight fetch. Nothing issued before this
    /// call touches the buffer afterwards.
    pub async fn stop(&self) {
        let mut ticker = self.ticker.lock().await;
        {
            let mut state = self.state.lock().await;
            if state.is_polling() {
                log_info!(
                    "ecg refresh stopped for {}",
                    state.device_id.as_deref().unwrap_or("-")
                );
            }
            state.stop();
        }
        if let Some(old) = ticker.take() {
            old.shutdown();
        }
    }
}

impl<A: FleetApi> Drop for LiveRefreshController<A> {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.get_mut().take() {
            ticker.shutdown();
        }
    }
}

struct Poller<A> {
    api: Arc<A>,
    state: Arc<Mutex<RefreshState>>,
    buffer: Arc<watch::Sender<Option<LiveWaveform>>>,
    device_id: String,
    generation: u64,
    fetch_timeout: Duration,
}

impl<A> Clone for Poller<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            state: self.state.clone(),
            buffer: self.buffer.clone(),
            device_id: self.device_id.clone(),
            generation: self.generation,
            fetch_timeout: self.fetch_timeout,
        }
    }
}

async fn poll_loop<A: FleetApi>(poller: Poller<A>, period: Duration, cancel: CancellationToken) {
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log_debug!("ecg poll loop for {} shutting down", poller.device_id);
                break;
            }
            _ = ticker.tick() => {
                let ticket = {
                    let mut state = poller.state.lock().await;
                    if !state.is_polling() || state.generation != poller.generation {
                        break;
                    }
                    state.issue()
                };
                tokio::spawn(poller.clone().fetch_once(ticket, cancel.child_token()));
            }
        }
    }
}

impl<A: FleetApi> Poller<A> {
    async fn fetch_once(self, ticket: FetchTicket, cancel: CancellationToken) {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            outcome = time::timeout(self.fetch_timeout, self.api.ecg(&self.device_id)) => outcome,
        };

        let mut state = self.state.lock().await;
        let admission = state.admit(&ticket);
        if admission == Admission::Superseded {
            log_debug!(
                "dropping ecg response seq {} for {}: target changed",
                ticket.seq,
                self.device_id
            );
            return;
        }

        match outcome {
            Ok(Ok(frame)) if admission == Admission::Apply => {
                let received_at = Utc::now();
                state.mark_applied(&ticket, received_at);
                self.buffer.send_replace(Some(LiveWaveform {
                    device_id: self.device_id.clone(),
                    seq: ticket.seq,
                    samples: frame.samples,
                    received_at,
                }));
            }
            Ok(Ok(_)) => {
                state.mark_discarded();
                log_info!(
                    "discarding stale ecg response for {} (seq {}, showing {})",
                    self.device_id,
                    ticket.seq,
                    state.applied_seq
                );
            }
            Ok(Err(err)) => {
                log_warn!("ecg fetch failed for {} (seq {}): {err:#}", self.device_id, ticket.seq);
                state.mark_failed(format!("{err:#}"));
            }
            Err(_) => {
                log_warn!(
                    "ecg fetch for {} timed out after {:?} (seq {})",
                    self.device_id,
                    self.fetch_timeout,
                    ticket.seq
                );
                state.mark_failed(format!("timed out after {:?}", self.fetch_timeout));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{settle, Scripted, ScriptedFleet};

    const TICK: Duration = DEFAULT_REFRESH_INTERVAL;

    fn controller(fleet: &Arc<ScriptedFleet>) -> LiveRefreshController<ScriptedFleet> {
        LiveRefreshController::new(fleet.clone(), TICK, DEFAULT_FETCH_TIMEOUT)
    }

    async fn advance_to(ms: u64, origin: time::Instant) {
        time::sleep_until(origin + Duration::from_millis(ms)).await;
    }

    fn samples(current: &Option<LiveWaveform>) -> Vec<f64> {
        current.as_ref().map(|w| w.samples.clone()).unwrap_or_default()
    }

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_every_interval() {
        let fleet = Arc::new(ScriptedFleet::new().with_ecg_default("A", vec![10.0, 20.0]));
        let ctl = controller(&fleet);
        let t0 = time::Instant::now();

        assert_eq!(ctl.status().await, RefreshStatus::Idle);
        ctl.start("A").await.unwrap();
        settle().await;
        assert_eq!(fleet.count("ecg:A"), 1);
        assert_eq!(ctl.status().await, RefreshStatus::Polling);
        assert_eq!(samples(&ctl.current()), vec![10.0, 20.0]);

        advance_to(3001, t0).await;
        assert_eq!(fleet.count("ecg:A"), 2);

        advance_to(9001, t0).await;
        assert_eq!(fleet.count("ecg:A"), 4);
        assert_eq!(ctl.state().await.ticks, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn switching_target_mid_flight_never_shows_old_device() {
        let fleet = Arc::new(ScriptedFleet::new().with_ecg_default("B", vec![50.0, 50.0, 50.0]));
        fleet.push_ecg(
            "A",
            Scripted::ok(vec![10.0, 90.0, 10.0]).after(Duration::from_millis(5000)),
        );
        let ctl = controller(&fleet);
        let mut rx = ctl.subscribe();
        let t0 = time::Instant::now();

        ctl.start("A").await.unwrap();
        advance_to(1000, t0).await;
        ctl.set_target(Some("B")).await.unwrap();
        advance_to(5001, t0).await;

        let current = ctl.current().unwrap();
        assert_eq!(current.device_id, "B");
        assert_eq!(current.samples, vec![50.0, 50.0, 50.0]);
        assert_eq!(fleet.count("ecg:A"), 1);
        assert_eq!(fleet.count("ecg:B"), 2);
        assert!(rx.borrow_and_update().as_ref().is_some_and(|w| w.device_id == "B"));
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_order_response_is_discarded() {
        let fleet = Arc::new(ScriptedFleet::new().with_ecg_default("A", vec![0.0, 0.0]));
        fleet.push_ecg("A", Scripted::ok(vec![1.0, 1.0]).after(Duration::from_millis(4000)));
        fleet.push_ecg("A", Scripted::ok(vec![2.0, 2.0]));
        let ctl = controller(&fleet);
        let t0 = time::Instant::now();

        ctl.start("A").await.unwrap();
        advance_to(3001, t0).await;
        assert_eq!(samples(&ctl.current()), vec![2.0, 2.0]);

        advance_to(4500, t0).await;
        let current = ctl.current().unwrap();
        assert_eq!(current.samples, vec![2.0, 2.0]);
        assert_eq!(current.seq, 2);
        assert_eq!(ctl.state().await.discarded, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_tick_keeps_previous_buffer_and_retries() {
        let fleet = Arc::new(ScriptedFleet::new().with_ecg_default("A", vec![7.0, 8.0]));
        fleet.push_ecg("A", Scripted::ok(vec![1.0, 2.0, 3.0]));
        fleet.push_ecg("A", Scripted::fail("connection reset"));
        let ctl = controller(&fleet);
        let t0 = time::Instant::now();

        ctl.start("A").await.unwrap();
        advance_to(3001, t0).await;

        let state = ctl.state().await;
        assert_eq!(state.status, RefreshStatus::Polling);
        assert_eq!(state.failures, 1);
        assert!(state.last_error.unwrap().contains("connection reset"));
        assert_eq!(samples(&ctl.current()), vec![1.0, 2.0, 3.0]);

        advance_to(6001, t0).await;
        assert_eq!(samples(&ctl.current()), vec![7.0, 8.0]);
        assert!(ctl.state().await.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_fetch_times_out_as_failure() {
        let fleet = Arc::new(ScriptedFleet::new());
        fleet.push_ecg("A", Scripted::ok(vec![1.0, 2.0]).after(Duration::from_millis(2000)));
        let ctl = LiveRefreshController::new(fleet.clone(), TICK, Duration::from_millis(1000));
        let t0 = time::Instant::now();

        ctl.start("A").await.unwrap();
        advance_to(1500, t0).await;

        let state = ctl.state().await;
        assert_eq!(state.failures, 1);
        assert!(state.last_error.unwrap().contains("timed out"));
        assert!(ctl.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_timer_and_in_flight_fetch() {
        let fleet = Arc::new(ScriptedFleet::new());
        fleet.push_ecg("A", Scripted::ok(vec![1.0, 2.0]).after(Duration::from_millis(2000)));
        let ctl = controller(&fleet);
        let t0 = time::Instant::now();

        ctl.start("A").await.unwrap();
        advance_to(500, t0).await;
        ctl.stop().await;

        advance_to(9000, t0).await;
        assert!(ctl.current().is_none());
        assert_eq!(fleet.count("ecg:A"), 1);
        let state = ctl.state().await;
        assert_eq!(state.status, RefreshStatus::Stopped);
        assert_eq!(state.device_id.as_deref(), Some("A"));
    }

    #[tokio::test(start_paused = true)]
    async fn restart_after_stop_polls_again() {
        let fleet = Arc::new(ScriptedFleet::new().with_ecg_default("A", vec![3.0, 4.0]));
        let ctl = controller(&fleet);

        ctl.start("A").await.unwrap();
        settle().await;
        ctl.set_target(None).await.unwrap();
        let stopped = ctl.state().await;

        ctl.start("A").await.unwrap();
        settle().await;
        let state = ctl.state().await;
        assert_eq!(state.status, RefreshStatus::Polling);
        assert_eq!(state.generation, stopped.generation + 1);
        assert_eq!(fleet.count("ecg:A"), 2);
        assert_eq!(samples(&ctl.current()), vec![3.0, 4.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn starting_same_device_twice_is_a_no_op() {
        let fleet = Arc::new(ScriptedFleet::new());
        let ctl = controller(&fleet);

        ctl.start("A").await.unwrap();
        settle().await;
        let generation = ctl.state().await.generation;
        ctl.start(" A ").await.unwrap();
        settle().await;

        assert_eq!(ctl.state().await.generation, generation);
        assert_eq!(fleet.count("ecg:A"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_device_id_is_rejected() {
        let fleet = Arc::new(ScriptedFleet::new());
        let ctl = controller(&fleet);
        assert!(ctl.start("  ").await.is_err());
        assert_eq!(ctl.status().await, RefreshStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_cancels_polling() {
        let fleet = Arc::new(ScriptedFleet::new());
        let ctl = controller(&fleet);
        let t0 = time::Instant::now();

        ctl.start("A").await.unwrap();
        settle().await;
        drop(ctl);

        advance_to(9000, t0).await;
        assert_eq!(fleet.count("ecg:A"), 1);
    }
}
