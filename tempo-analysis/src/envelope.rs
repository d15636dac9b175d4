//! Sub-band envelope extraction and summation
//!
//! A detail band becomes an envelope by decimation, full-wave rectification
//! and mean removal. Decimation brings every band down to the rate of the
//! coarsest level so the envelopes can be summed sample by sample.

use crate::error::AnalysisError;

/// Decimation factor applied to the detail band of `level`
///
/// Starts at `2^(levels - 1)` for the finest band and halves per level.
/// `level` must be below `levels`.
pub(crate) fn pace_for_level(level: usize, levels: usize) -> usize {
    1 << (levels - 1 - level)
}

/// Keep every `pace`-th sample: `result[i] = data[i * pace]`
pub fn downsample(data: &[f64], pace: usize) -> Vec<f64> {
    let pace = pace.max(1);
    data.iter().step_by(pace).take(data.len() / pace).copied().collect()
}

/// Full-wave rectification
pub fn rectify(data: &mut [f64]) {
    for value in data.iter_mut() {
        *value = value.abs();
    }
}

/// Remove the arithmetic mean so the sequence is centred on zero
pub fn normalize(data: &mut [f64]) {
    if data.is_empty() {
        return;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    for value in data.iter_mut() {
        *value -= mean;
    }
}

/// Envelope of one level's detail coefficients
pub fn detail_envelope(detail: &[f64], pace: usize) -> Vec<f64> {
    let mut envelope = downsample(detail, pace);
    rectify(&mut envelope);
    normalize(&mut envelope);
    envelope
}

/// Envelope of the coarsest approximation (no decimation)
pub fn approximation_envelope(approximation: &[f64]) -> Vec<f64> {
    let mut envelope = approximation.to_vec();
    rectify(&mut envelope);
    normalize(&mut envelope);
    envelope
}

/// Sum envelopes element by element over the first `len` samples
///
/// Longer envelopes are truncated. An envelope shorter than `len` means the
/// bands were not aligned and is reported as
/// [`AnalysisError::MisalignedEnvelope`] with its position in `envelopes`.
pub fn sum_envelopes(envelopes: &[Vec<f64>], len: usize) -> Result<Vec<f64>, AnalysisError> {
    let mut composite = vec![0.0; len];

    for (level, envelope) in envelopes.iter().enumerate() {
        if envelope.len() < len {
            return Err(AnalysisError::MisalignedEnvelope {
                level,
                expected: len,
                actual: envelope.len(),
            });
        }
        for (sum, value) in composite.iter_mut().zip(envelope) {
            *sum += value;
        }
    }

    Ok(composite)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pace_halves_per_level() {
        let paces: Vec<usize> = (0..4).map(|level| pace_for_level(level, 4)).collect();
        assert_eq!(paces, vec![8, 4, 2, 1]);
    }

    #[test]
    fn test_downsample_is_strided() {
        assert_eq!(
            downsample(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 2),
            vec![1.0, 3.0, 5.0]
        );
        assert_eq!(downsample(&[1.0, 2.0, 3.0, 4.0, 5.0], 2), vec![1.0, 3.0]);
        assert_eq!(downsample(&[1.0, 2.0, 3.0], 4), Vec::<f64>::new());
        assert_eq!(downsample(&[1.0, 2.0, 3.0], 1), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_rectify() {
        let mut data = vec![-1.5, 0.0, 2.0, -0.25];
        rectify(&mut data);
        assert_eq!(data, vec![1.5, 0.0, 2.0, 0.25]);
    }

    #[test]
    fn test_normalize_zero_mean() {
        let mut data = vec![0.1, 0.7, 2.5, 3.3, 0.05, 9.75, 1.0];
        normalize(&mut data);
        let mean: f64 = data.iter().sum::<f64>() / data.len() as f64;
        assert!(mean.abs() < 1e-12);
    }

    #[test]
    fn test_normalize_keeps_fractions() {
        // Fractional parts must survive accumulation
        let mut data = vec![0.5, 0.5, 0.5, 0.5];
        normalize(&mut data);
        assert!(data.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_normalize_empty() {
        let mut data: Vec<f64> = Vec::new();
        normalize(&mut data);
        assert!(data.is_empty());
    }

    #[test]
    fn test_detail_envelope() {
        let detail = [-4.0, 9.0, 2.0, 9.0, -6.0, 9.0, 0.0];
        let envelope = detail_envelope(&detail, 2);
        // Decimated [-4, 2, -6], rectified [4, 2, 6], mean 4
        assert_eq!(envelope, vec![0.0, -2.0, 2.0]);
    }

    #[test]
    fn test_sum_envelopes_truncates() {
        let envelopes = vec![vec![1.0, 2.0], vec![10.0, 20.0, 30.0]];
        assert_eq!(sum_envelopes(&envelopes, 2).unwrap(), vec![11.0, 22.0]);
    }

    #[test]
    fn test_sum_envelopes_rejects_short_band() {
        let envelopes = vec![vec![1.0, 2.0, 3.0], vec![1.0]];
        assert_eq!(
            sum_envelopes(&envelopes, 3),
            Err(AnalysisError::MisalignedEnvelope {
                level: 1,
                expected: 3,
                actual: 1
            })
        );
    }
}
