//! Tempo analysis for live and recorded audio
//!
//! Estimates beats-per-minute with a four level Daubechies wavelet
//! decomposition. Each sub-band is turned into an envelope, the envelopes
//! are summed and autocorrelated, and the strongest lag inside a plausible
//! tempo window becomes the window's BPM. Successive windows are reduced to
//! a single stable tempo by taking the median.

mod autocorrelation;
mod bpm;
mod envelope;
mod error;
mod peak;
mod wavelet;

pub use autocorrelation::correlate;
pub use bpm::{median, BpmDetector};
pub use envelope::{
    approximation_envelope, detail_envelope, downsample, normalize, rectify, sum_envelopes,
};
pub use error::AnalysisError;
pub use peak::{detect_peak, LagRange, MAX_BPM, MIN_BPM};
pub use wavelet::{decompose, Decomposition, Level, DAUBECHIES8, LEVELS};
