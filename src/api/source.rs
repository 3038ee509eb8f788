use std::future::Future;

use anyhow::Result;
use chrono::NaiveDate;

use crate::models::{
    DeviceDetail, DeviceSummary, EcgFrame, EventRecord, FleetSummary, MapPoint, ReadinessRecord,
    SleepSession,
};

/// The console's view of the backend: one call per logical endpoint, each
/// returning a fully delivered collection.
pub trait FleetApi: Send + Sync + 'static {
    fn summary(&self) -> impl Future<Output = Result<FleetSummary>> + Send;

    fn readiness(&self) -> impl Future<Output = Result<Vec<ReadinessRecord>>> + Send;

    fn events(&self) -> impl Future<Output = Result<Vec<EventRecord>>> + Send;

    fn map_points(&self) -> impl Future<Output = Result<Vec<MapPoint>>> + Send;

    fn devices(&self) -> impl Future<Output = Result<Vec<DeviceSummary>>> + Send;

    fn device_detail(&self, device_id: &str) -> impl Future<Output = Result<DeviceDetail>> + Send;

    fn ecg(&self, device_id: &str) -> impl Future<Output = Result<EcgFrame>> + Send;

    fn sleep_sessions(
        &self,
        device_id: &str,
        date: Option<NaiveDate>,
    ) -> impl Future<Output = Result<Vec<SleepSession>>> + Send;

    /// Asks the backend to populate demo data. Best effort.
    fn seed(&self) -> impl Future<Output = Result<()>> + Send;
}
