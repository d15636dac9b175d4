//! Audio capture for tempo analysis
//!
//! Provides the sample source that feeds windows to the tempo detector:
//! - Lifecycle: explicit stream states, every transition returns a result
//! - Source: device-independent capture contract and channel extraction
//! - Cpal: capture from a system input device
//! - Config: persisted device and stream parameters

mod config;
mod cpal_source;
mod error;
mod lifecycle;
mod source;

pub use config::{CaptureConfig, DEFAULT_DEVICE};
pub use cpal_source::CpalSource;
pub use error::CaptureError;
pub use lifecycle::{Lifecycle, Operation, StreamState};
pub use source::{channel, SampleSource, StreamParams, StreamRequest};
