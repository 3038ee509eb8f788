mod controller;
mod state;

pub use controller::{
    LiveRefreshController, LiveWaveform, DEFAULT_FETCH_TIMEOUT, DEFAULT_REFRESH_INTERVAL,
};
pub use state::{Admission, FetchTicket, RefreshState, RefreshStatus};
