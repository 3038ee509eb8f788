use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepStage {
    Light,
    Deep,
    Awake,
    Rem,
    /// Anything the console has no style for.
    #[serde(other)]
    Unknown,
}

impl SleepStage {
    /// Stages that always appear in the legend, in display order.
    pub const LEGEND: [SleepStage; 4] = [
        SleepStage::Light,
        SleepStage::Deep,
        SleepStage::Awake,
        SleepStage::Rem,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStage::Light => "light",
            SleepStage::Deep => "deep",
            SleepStage::Awake => "awake",
            SleepStage::Rem => "rem",
            SleepStage::Unknown => "unknown",
        }
    }
}

/// One labeled sleep interval. `end > start` is expected but not enforced
/// here; the timeline clamps inverted intervals to zero width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSegment {
    #[serde(deserialize_with = "timestamp::strict")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::strict")]
    pub end: DateTime<Utc>,
    #[serde(rename = "type")]
    pub stage: SleepStage,
}

impl SleepSegment {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, stage: SleepStage) -> Self {
        Self { start, end, stage }
    }

    /// Signed length in milliseconds; negative when the interval is inverted.
    pub fn raw_duration_ms(&self) -> i64 {
        (self.end - self.start).num_milliseconds()
    }
}

/// All segments recorded for one calendar night.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepSession {
    pub date: Option<String>,
    pub score: Option<f64>,
    pub duration_minutes: Option<f64>,
    pub segments: Vec<SleepSegment>,
}

impl SleepSession {
    pub fn day(&self) -> Option<NaiveDate> {
        self.date
            .as_deref()
            .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
    }

    /// Minutes spent in each legend stage, in legend order. Inverted segments
    /// count as zero.
    pub fn stage_minutes(&self) -> Vec<(SleepStage, f64)> {
        SleepStage::LEGEND
            .into_iter()
            .map(|stage| {
                let total_ms: i64 = self
                    .segments
                    .iter()
                    .filter(|segment| segment.stage == stage)
                    .map(|segment| segment.raw_duration_ms().max(0))
                    .sum();
                (stage, total_ms as f64 / 60_000.0)
            })
            .collect()
    }
}
