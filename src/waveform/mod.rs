//! Deterministic line plots of bounded sample buffers (the live ECG trace).

pub mod path;
pub mod renderer;
pub mod surface;

pub use path::{trace_path, PathPoint, WaveformPath};
pub use renderer::{WaveformConfig, WaveformRenderer};
pub use surface::{encode_png, Surface};
