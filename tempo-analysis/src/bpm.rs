//! BPM detection using wavelet envelopes and autocorrelation

use tracing::{debug, trace};

use crate::autocorrelation::correlate;
use crate::envelope::{approximation_envelope, detail_envelope, pace_for_level, sum_envelopes};
use crate::error::AnalysisError;
use crate::peak::{detect_peak, LagRange};
use crate::wavelet::{decompose, LEVELS};

/// Decimation of the finest detail band, which sets the envelope rate
const MAX_DECIMATION: usize = 1 << (LEVELS - 1);

/// Windowed tempo detector
///
/// Every window is analyzed independently; the detector only remembers the
/// per-window estimates so it can report their median. Call [`reset`] when
/// a new track starts.
///
/// [`reset`]: BpmDetector::reset
#[derive(Debug, Clone)]
pub struct BpmDetector {
    sample_rate: f64,
    lag_range: LagRange,
    history: Vec<f64>,
}

impl BpmDetector {
    /// Create a detector for audio sampled at `sample_rate` Hz
    pub fn new(sample_rate: f64) -> Result<Self, AnalysisError> {
        let lag_range = LagRange::new(sample_rate, MAX_DECIMATION)?;

        // The window covering the slowest lag must be addressable
        if lag_range.max.checked_mul(1 << LEVELS).is_none() {
            return Err(AnalysisError::DegenerateRange {
                sample_rate,
                min_lag: lag_range.min,
                max_lag: lag_range.max,
            });
        }

        Ok(Self {
            sample_rate,
            lag_range,
            history: Vec::new(),
        })
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Lags searched for a peak
    pub fn lag_range(&self) -> LagRange {
        self.lag_range
    }

    /// Shortest window that covers the whole lag range
    pub fn min_window_len(&self) -> usize {
        let depth = 1 << LEVELS;
        self.lag_range.max.saturating_mul(depth).max(depth)
    }

    /// Per-window estimates in arrival order
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Estimate the tempo of one window and record it
    ///
    /// Windows containing NaN or infinite samples are rejected with
    /// [`AnalysisError::NonFiniteSample`].
    pub fn process_window(&mut self, samples: &[f64]) -> Result<f64, AnalysisError> {
        let bpm = self.window_bpm(samples)?;
        self.history.push(bpm);
        Ok(bpm)
    }

    /// Split `samples` into consecutive windows and return the median tempo
    ///
    /// A trailing partial window is ignored.
    pub fn process_signal(
        &mut self,
        samples: &[f64],
        window_len: usize,
    ) -> Result<f64, AnalysisError> {
        if window_len == 0 || samples.len() < window_len {
            return Err(AnalysisError::InsufficientData {
                required: window_len.max(self.min_window_len()),
                actual: samples.len(),
            });
        }

        for window in samples.chunks_exact(window_len) {
            self.process_window(window)?;
        }

        self.current_estimate()
    }

    /// Median of all estimates since the last reset
    pub fn current_estimate(&self) -> Result<f64, AnalysisError> {
        median(&self.history).ok_or(AnalysisError::NoData)
    }

    /// Forget all estimates
    pub fn reset(&mut self) {
        self.history.clear();
    }

    fn window_bpm(&self, samples: &[f64]) -> Result<f64, AnalysisError> {
        if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
            return Err(AnalysisError::NonFiniteSample { index });
        }

        let decomposition = decompose(samples, LEVELS)?;

        let mut envelopes = Vec::with_capacity(LEVELS + 1);
        for (index, level) in decomposition.iter().enumerate() {
            envelopes.push(detail_envelope(&level.detail, pace_for_level(index, LEVELS)));
        }
        if let Some(approximation) = decomposition.approximation() {
            envelopes.push(approximation_envelope(approximation));
        }

        // The finest band, fully decimated, defines the composite span
        let composite_len = decomposition
            .level(0)
            .map_or(0, |level| level.detail.len() / MAX_DECIMATION);
        trace!(
            lengths = ?envelopes.iter().map(Vec::len).collect::<Vec<_>>(),
            composite_len,
            "Extracted envelopes"
        );

        if composite_len < self.lag_range.max {
            return Err(AnalysisError::InsufficientData {
                required: self.min_window_len(),
                actual: samples.len(),
            });
        }

        let composite = sum_envelopes(&envelopes, composite_len)?;
        let correlation = correlate(&composite);

        let window = &correlation[self.lag_range.min..self.lag_range.max];
        let offset = detect_peak(window).ok_or(AnalysisError::DegenerateRange {
            sample_rate: self.sample_rate,
            min_lag: self.lag_range.min,
            max_lag: self.lag_range.max,
        })?;

        let lag = self.lag_range.min + offset;
        let bpm = self.lag_range.bpm_for_lag(lag);
        debug!(lag, bpm, "Window tempo");

        Ok(bpm)
    }
}

/// Median of `values`; the mean of the two central values for even counts
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Short 5ms clicks every `60 / bpm` seconds
    fn click_track(sample_rate: f64, bpm: f64, len: usize) -> Vec<f64> {
        let period = (sample_rate * 60.0 / bpm) as usize;
        let click = (sample_rate * 0.005) as usize;
        (0..len)
            .map(|i| if i % period < click { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn test_detector_creation() {
        let detector = BpmDetector::new(44100.0).unwrap();
        assert_eq!(detector.sample_rate(), 44100.0);
        assert_eq!(detector.lag_range().min, 1503);
        assert_eq!(detector.min_window_len(), 8268 * 16);
        assert!(detector.history().is_empty());
    }

    #[test]
    fn test_rejects_unusable_sample_rate() {
        assert!(matches!(
            BpmDetector::new(0.0),
            Err(AnalysisError::DegenerateRange { .. })
        ));
        assert!(matches!(
            BpmDetector::new(16.0),
            Err(AnalysisError::DegenerateRange { .. })
        ));
    }

    #[test]
    fn test_rejects_rate_with_unaddressable_window() {
        assert!(matches!(
            BpmDetector::new(1e20),
            Err(AnalysisError::DegenerateRange { .. })
        ));

        let detector = BpmDetector::new(1e15).unwrap();
        assert_eq!(detector.min_window_len(), detector.lag_range().max * 16);
    }

    #[test]
    fn test_non_finite_samples_rejected() {
        let mut detector = BpmDetector::new(8000.0).unwrap();

        assert_eq!(
            detector.process_window(&vec![f64::NAN; 32768]),
            Err(AnalysisError::NonFiniteSample { index: 0 })
        );

        let mut samples = click_track(8000.0, 120.0, 32768);
        samples[1234] = f64::INFINITY;
        assert_eq!(
            detector.process_window(&samples),
            Err(AnalysisError::NonFiniteSample { index: 1234 })
        );
        assert!(detector.history().is_empty());
    }

    #[test]
    fn test_detects_120_bpm() {
        let mut detector = BpmDetector::new(8000.0).unwrap();
        let samples = click_track(8000.0, 120.0, 32768);

        let bpm = detector.process_window(&samples).unwrap();
        assert!((bpm - 120.0).abs() < 2.0, "Expected ~120 BPM, got {bpm}");
        assert_eq!(detector.history(), &[bpm]);
    }

    #[test]
    fn test_short_window_fails() {
        let mut detector = BpmDetector::new(8000.0).unwrap();

        // Too short for the decomposition itself
        assert!(matches!(
            detector.process_window(&[0.5; 8]),
            Err(AnalysisError::InsufficientData { .. })
        ));

        // Long enough to decompose but not to cover the lag range
        let samples = click_track(8000.0, 120.0, 16000);
        assert_eq!(
            detector.process_window(&samples),
            Err(AnalysisError::InsufficientData {
                required: 24000,
                actual: 16000
            })
        );

        assert!(detector.history().is_empty());
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[80.0, 90.0, 100.0]), Some(90.0));
        assert_eq!(median(&[80.0, 90.0, 100.0, 110.0]), Some(95.0));
        assert_eq!(median(&[100.0, 80.0, 90.0]), Some(90.0));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_current_estimate_uses_history() {
        let mut detector = BpmDetector::new(8000.0).unwrap();
        detector.history.extend([80.0, 110.0, 90.0, 100.0]);
        assert_eq!(detector.current_estimate(), Ok(95.0));
    }

    #[test]
    fn test_reset_clears_history() {
        let mut detector = BpmDetector::new(8000.0).unwrap();
        detector.history.push(120.0);

        detector.reset();
        assert_eq!(detector.current_estimate(), Err(AnalysisError::NoData));

        // Idempotent
        detector.reset();
        assert_eq!(detector.current_estimate(), Err(AnalysisError::NoData));
    }

    #[test]
    fn test_process_signal() {
        let mut detector = BpmDetector::new(8000.0).unwrap();
        let samples = click_track(8000.0, 120.0, 32768 * 2 + 1000);

        let bpm = detector.process_signal(&samples, 32768).unwrap();
        assert_eq!(detector.history().len(), 2);
        assert!((bpm - 120.0).abs() < 2.0, "Expected ~120 BPM, got {bpm}");
    }

    #[test]
    fn test_process_signal_without_full_window() {
        let mut detector = BpmDetector::new(8000.0).unwrap();
        assert!(matches!(
            detector.process_signal(&[0.0; 100], 32768),
            Err(AnalysisError::InsufficientData { .. })
        ));
        assert!(matches!(
            detector.process_signal(&[0.0; 100], 0),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }
}
