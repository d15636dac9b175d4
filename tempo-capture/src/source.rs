//! Sample source contract

use crate::error::CaptureError;
use crate::lifecycle::StreamState;

/// Stream parameters asked of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    pub bits: u16,
    pub channels: u16,
    pub rate_hint: u32,
    pub frames_per_period: u32,
}

/// Stream parameters the device actually granted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    pub bits: u16,
    pub channels: u16,
    pub rate: u32,
    pub frames_per_period: u32,
}

/// A source of raw interleaved audio samples
///
/// Every operation returns a result; failures are left to the caller to
/// retry, fall back or abort.
pub trait SampleSource {
    /// Current lifecycle state
    fn state(&self) -> StreamState;

    /// Open the named input device
    fn open(&mut self, device: &str) -> Result<(), CaptureError>;

    /// Agree on stream parameters as close to `request` as the device allows
    fn negotiate(&mut self, request: &StreamRequest) -> Result<StreamParams, CaptureError>;

    /// Make the stream ready to deliver samples
    fn prepare(&mut self) -> Result<(), CaptureError>;

    /// Block until `frames` frames are available and return them interleaved
    fn read_window(&mut self, frames: usize) -> Result<Vec<f32>, CaptureError>;

    /// Release the device; valid in any state
    fn close(&mut self);
}

/// Extract channel `index` from an interleaved buffer as analysis samples
///
/// Returns an empty vector when `index` is not below `channels`.
pub fn channel(interleaved: &[f32], channels: usize, index: usize) -> Vec<f64> {
    if index >= channels {
        return Vec::new();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| f64::from(frame[index]))
        .collect()
}
