//! Unnormalized autocorrelation of the composite envelope

/// `y[k] = sum of x[i] * x[i + k]` for every lag `k` in `0..x.len()`
///
/// Quadratic in the input length, which is the envelope length rather than
/// the raw sample count.
pub fn correlate(data: &[f64]) -> Vec<f64> {
    let n = data.len();
    (0..n)
        .map(|lag| {
            data[..n - lag]
                .iter()
                .zip(&data[lag..])
                .map(|(a, b)| a * b)
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_input() {
        for len in [0, 1, 5, 64] {
            let correlation = correlate(&vec![0.0; len]);
            assert_eq!(correlation.len(), len);
            assert!(correlation.iter().all(|&c| c == 0.0));
        }
    }

    #[test]
    fn test_impulse() {
        assert_eq!(correlate(&[1.0, 0.0, 0.0, 0.0]), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_known_values() {
        // [1, 2, 3]: lag 0 = 1+4+9, lag 1 = 2+6, lag 2 = 3
        assert_eq!(correlate(&[1.0, 2.0, 3.0]), vec![14.0, 8.0, 3.0]);
    }

    #[test]
    fn test_periodic_signal_peaks_at_period() {
        let data: Vec<f64> = (0..40).map(|i| if i % 10 == 0 { 1.0 } else { 0.0 }).collect();
        let correlation = correlate(&data);

        assert_eq!(correlation[10], 3.0);
        assert_eq!(correlation[20], 2.0);
        assert_eq!(correlation[5], 0.0);
    }
}
