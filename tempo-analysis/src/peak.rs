//! Peak picking inside the plausible tempo window

use crate::error::AnalysisError;

/// Slowest tempo considered plausible
pub const MIN_BPM: f64 = 40.0;

/// Fastest tempo considered plausible
pub const MAX_BPM: f64 = 220.0;

/// Lags of the composite envelope that map to plausible tempi
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LagRange {
    /// First lag searched (fastest tempo)
    pub min: usize,
    /// One past the last lag searched (slowest tempo)
    pub max: usize,
    /// Envelope rate used for lag/BPM conversion (sample rate / max decimation)
    envelope_rate: f64,
}

impl LagRange {
    /// Lag window for `sample_rate` with envelopes decimated by `max_decimation`
    ///
    /// Fails with [`AnalysisError::DegenerateRange`] when the rate is not a
    /// positive finite number or the fastest tempo maps to a lag below 1.
    pub fn new(sample_rate: f64, max_decimation: usize) -> Result<Self, AnalysisError> {
        let envelope_rate = sample_rate / max_decimation as f64;
        let (min, max) = if envelope_rate.is_finite() && envelope_rate > 0.0 {
            (
                (60.0 / MAX_BPM * envelope_rate) as usize,
                (60.0 / MIN_BPM * envelope_rate) as usize,
            )
        } else {
            (0, 0)
        };

        if min < 1 || min >= max {
            return Err(AnalysisError::DegenerateRange {
                sample_rate,
                min_lag: min,
                max_lag: max,
            });
        }

        Ok(Self {
            min,
            max,
            envelope_rate,
        })
    }

    /// Number of lags searched
    pub fn len(&self) -> usize {
        self.max - self.min
    }

    /// Whether the window contains no lag
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tempo in BPM for an absolute lag
    pub fn bpm_for_lag(&self, lag: usize) -> f64 {
        60.0 / lag as f64 * self.envelope_rate
    }
}

/// Index of the value with the largest magnitude
///
/// On ties the first exact positive match wins; only when no positive value
/// reaches the maximum is the first negative match returned. Returns `None`
/// for an empty slice.
pub fn detect_peak(data: &[f64]) -> Option<usize> {
    let max = data.iter().fold(0.0f64, |max, x| max.max(x.abs()));

    data.iter()
        .position(|&x| x == max)
        .or_else(|| data.iter().position(|&x| x == -max))
}
