use std::fmt;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;

use crate::models::{
    DeviceDetail, DeviceSummary, EcgFrame, EventRecord, FleetSummary, Items, MapPoint,
    ReadinessRecord, SleepSession,
};
use crate::settings::ConsoleSettings;

use super::source::FleetApi;

const ENABLE_LOGS: bool = true;

use crate::log_debug;

/// Credentials handed to the client at construction. Views never read session
/// state on their own.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            token: (!token.trim().is_empty()).then_some(token),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// HTTP/JSON implementation of [`FleetApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    auth: AuthContext,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: AuthContext, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url.trim())
            .with_context(|| format!("invalid backend URL '{base_url}'"))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            bail!("backend URL must be http(s), got '{base_url}'");
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fleetvitals/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, base, auth })
    }

    pub fn from_settings(settings: &ConsoleSettings) -> Result<Self> {
        let auth = settings
            .auth_token
            .as_deref()
            .map(AuthContext::bearer)
            .unwrap_or_default();
        Self::new(
            &settings.backend_url,
            auth,
            Duration::from_millis(settings.fetch_timeout_ms),
        )
    }

    pub fn auth(&self) -> &AuthContext {
        &self.auth
    }

    /// Base URL with `segments` appended, each percent-encoded as one path
    /// segment.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("backend URL '{}' cannot carry a path", self.base))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn sleep_endpoint(&self, device_id: &str, date: Option<NaiveDate>) -> Result<Url> {
        let mut url = self.endpoint(&["devices", device_id, "sleep"])?;
        if let Some(date) = date {
            url.query_pairs_mut()
                .append_pair("date", &date.format("%Y-%m-%d").to_string());
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        log_debug!("GET {}", url);
        let response = self
            .auth
            .apply(self.http.get(url.clone()))
            .send()
            .await
            .with_context(|| format!("GET {url} failed"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned an error status"))?;

        response
            .json::<T>()
            .await
            .with_context(|| format!("GET {url} returned an unexpected body"))
    }

    async fn get_items<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Vec<T>> {
        let url = self.endpoint(segments)?;
        Ok(self.get_json::<Items<T>>(url).await?.into_inner())
    }
}

impl FleetApi for ApiClient {
    async fn summary(&self) -> Result<FleetSummary> {
        self.get_json(self.endpoint(&["dashboard", "summary"])?).await
    }

    async fn readiness(&self) -> Result<Vec<ReadinessRecord>> {
        self.get_items(&["dashboard", "readiness"]).await
    }

    async fn events(&self) -> Result<Vec<EventRecord>> {
        self.get_items(&["dashboard", "events"]).await
    }

    async fn map_points(&self) -> Result<Vec<MapPoint>> {
        self.get_items(&["dashboard", "map"]).await
    }

    async fn devices(&self) -> Result<Vec<DeviceSummary>> {
        self.get_items(&["devices"]).await
    }

    async fn device_detail(&self, device_id: &str) -> Result<DeviceDetail> {
        self.get_json(self.endpoint(&["devices", device_id])?).await
    }

    async fn ecg(&self, device_id: &str) -> Result<EcgFrame> {
        self.get_json(self.endpoint(&["devices", device_id, "ecg"])?)
            .await
    }

    async fn sleep_sessions(
        &self,
        device_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<SleepSession>> {
        let url = self.sleep_endpoint(device_id, date)?;
        Ok(self.get_json::<Items<SleepSession>>(url).await?.into_inner())
    }

    async fn seed(&self) -> Result<()> {
        let url = self.endpoint(&["seed"])?;
        log_debug!("POST {}", url);
        self.auth
            .apply(self.http.post(url.clone()))
            .send()
            .await
            .with_context(|| format!("POST {url} failed"))?
            .error_for_status()
            .with_context(|| format!("POST {url} returned an error status"))?;
        Ok(())
    }
}
