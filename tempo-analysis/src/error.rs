//! Errors reported by the tempo analysis pipeline

use thiserror::Error;

/// Errors that can occur while estimating a tempo
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// The window is too short for the decomposition depth or the lag window
    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// An envelope does not cover the composite span (internal invariant)
    #[error("Envelope of level {level} is misaligned: expected {expected} samples, got {actual}")]
    MisalignedEnvelope {
        level: usize,
        expected: usize,
        actual: usize,
    },

    /// The sample rate produces an unusable lag search window
    #[error("Degenerate lag range [{min_lag}, {max_lag}) for sample rate {sample_rate} Hz")]
    DegenerateRange {
        sample_rate: f64,
        min_lag: usize,
        max_lag: usize,
    },

    /// The window contains a NaN or infinite sample
    #[error("Non-finite sample at index {index}")]
    NonFiniteSample { index: usize },

    /// A tempo was requested before any window was processed
    #[error("No tempo estimates available")]
    NoData,
}
