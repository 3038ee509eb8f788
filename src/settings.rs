use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

use crate::waveform::WaveformConfig;

const ENABLE_LOGS: bool = true;

use crate::log_warn;

pub const ENV_BACKEND_URL: &str = "FLEETVITALS_BACKEND_URL";
pub const ENV_TOKEN: &str = "FLEETVITALS_TOKEN";
pub const ENV_ECG_REFRESH_MS: &str = "FLEETVITALS_ECG_REFRESH_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConsoleSettings {
    pub backend_url: String,
    pub auth_token: Option<String>,
    /// Live ECG refresh period.
    pub ecg_refresh_ms: u64,
    /// Per-request timeout, applied to every fetch.
    pub fetch_timeout_ms: u64,
    /// POST `seed` before the dashboard's first fan-out.
    pub seed_on_activate: bool,
    pub waveform: WaveformConfig,
}

impl Default for ConsoleSettings {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".into(),
            auth_token: None,
            ecg_refresh_ms: 3000,
            fetch_timeout_ms: 10_000,
            seed_on_activate: false,
            waveform: WaveformConfig::default(),
        }
    }
}

impl ConsoleSettings {
    pub fn validate(&self) -> Result<()> {
        if self.backend_url.trim().is_empty() {
            bail!("backend_url must not be empty");
        }
        if self.ecg_refresh_ms == 0 {
            bail!("ecg_refresh_ms must be greater than zero");
        }
        if self.fetch_timeout_ms == 0 {
            bail!("fetch_timeout_ms must be greater than zero");
        }
        self.waveform.validate().context("invalid waveform settings")
    }

    pub fn ecg_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.ecg_refresh_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Applies overrides from a variable lookup; `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.auth_token = (!token.trim().is_empty()).then_some(token);
        }
        if let Some(raw) = lookup(ENV_ECG_REFRESH_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) if ms > 0 => self.ecg_refresh_ms = ms,
                _ => log_warn!("ignoring {}={:?}: expected a positive integer", ENV_ECG_REFRESH_MS, raw),
            }
        }
    }
}

/// Console settings backed by a JSON file.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<ConsoleSettings>,
}

impl SettingsStore {
    /// Loads `path` if present, falling back to defaults for a missing or
    /// unparseable file, then applies environment overrides.
    pub fn new(path: PathBuf) -> Result<Self> {
        Self::with_env(path, |key| std::env::var(key).ok())
    }

    pub fn with_env<F>(path: PathBuf, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut data = read_settings(&path)?;
        data.apply_env(lookup);
        data.validate()?;

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn get(&self) -> ConsoleSettings {
        self.read().clone()
    }

    pub fn update(&self, settings: ConsoleSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write();
        self.persist(&settings)?;
        *guard = settings;
        Ok(())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read settings from {}", self.path.display()))?;
        let data: ConsoleSettings = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse settings in {}", self.path.display()))?;
        data.validate()?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &ConsoleSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read(&self) -> RwLockReadGuard<'_, ConsoleSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ConsoleSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn read_settings(path: &Path) -> Result<ConsoleSettings> {
    if !path.exists() {
        return Ok(ConsoleSettings::default());
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings from {}", path.display()))?;
    Ok(serde_json::from_str(&contents).unwrap_or_else(|err| {
        log_warn!("settings file {} is invalid ({err}); using defaults", path.display());
        ConsoleSettings::default()
    }))
}
