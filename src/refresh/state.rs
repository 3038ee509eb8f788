use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RefreshStatus {
    #[default]
    Idle,
    Polling,
    Stopped,
}

/// Identity of one issued fetch. `generation` changes whenever the target
/// device does; `seq` increases with every fetch ever issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FetchTicket {
    pub generation: u64,
    pub seq: u64,
}

/// What to do with a response that just arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Apply,
    /// A newer response for the same target is already showing.
    Stale,
    /// The target changed or polling stopped after the request went out.
    Superseded,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshState {
    pub status: RefreshStatus,
    pub device_id: Option<String>,
    pub generation: u64,
    pub issued_seq: u64,
    pub applied_seq: u64,
    /// Fetches issued for the current target.
    pub ticks: u64,
    pub failures: u64,
    /// Out-of-order responses dropped for the current target.
    pub discarded: u64,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_polling(&self) -> bool {
        self.status == RefreshStatus::Polling
    }

    pub fn is_polling_device(&self, device_id: &str) -> bool {
        self.is_polling() && self.device_id.as_deref() == Some(device_id)
    }

    /// Enters `Polling` for `device_id` under a fresh generation. Anything
    /// issued before this call can no longer apply.
    pub fn begin_polling(&mut self, device_id: String) -> u64 {
        *self = Self {
            status: RefreshStatus::Polling,
            device_id: Some(device_id),
            generation: self.generation + 1,
            issued_seq: self.issued_seq,
            applied_seq: self.issued_seq,
            ..Self::default()
        };
        self.generation
    }

    pub fn issue(&mut self) -> FetchTicket {
        self.issued_seq += 1;
        self.ticks += 1;
        FetchTicket {
            generation: self.generation,
            seq: self.issued_seq,
        }
    }

    pub fn admit(&self, ticket: &FetchTicket) -> Admission {
        if !self.is_polling() || ticket.generation != self.generation {
            Admission::Superseded
        } else if ticket.seq <= self.applied_seq {
            Admission::Stale
        } else {
            Admission::Apply
        }
    }

    pub fn mark_applied(&mut self, ticket: &FetchTicket, at: DateTime<Utc>) {
        self.applied_seq = ticket.seq;
        self.last_updated_at = Some(at);
        self.last_error = None;
    }

    pub fn mark_failed(&mut self, error: String) {
        self.failures += 1;
        self.last_error = Some(error);
    }

    pub fn mark_discarded(&mut self) {
        self.discarded += 1;
    }

    /// Leaves `Polling`. The last target is kept for display.
    pub fn stop(&mut self) {
        if self.is_polling() {
            self.status = RefreshStatus::Stopped;
        }
    }
}
