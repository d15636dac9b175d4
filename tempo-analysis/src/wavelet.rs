//! Discrete wavelet transform with the 8-tap Daubechies filter bank
//!
//! Each level convolves the current approximation with matched low-pass and
//! high-pass analysis filters and keeps every second output. Edges use
//! periodic extension: coefficient `i` reads input samples `(2i + k) mod n`,
//! so every level is exactly `floor(n / 2)` long and the transform stays
//! orthogonal for even lengths.

use crate::error::AnalysisError;

/// Decomposition depth used by the tempo detector
pub const LEVELS: usize = 4;

/// Daubechies scaling (low-pass) filter with 8 taps
pub const DAUBECHIES8: [f64; 8] = [
    0.230_377_813_308_896_5,
    0.714_846_570_552_915_7,
    0.630_880_767_929_858_9,
    -0.027_983_769_416_859_854,
    -0.187_034_811_719_093_1,
    0.030_841_381_835_560_764,
    0.032_883_011_666_885_2,
    -0.010_597_401_785_069_032,
];

/// Wavelet (high-pass) filter, the quadrature mirror of [`DAUBECHIES8`]
fn high_pass() -> [f64; 8] {
    let taps = DAUBECHIES8.len();
    let mut filter = [0.0; 8];
    for (k, tap) in filter.iter_mut().enumerate() {
        let mirrored = DAUBECHIES8[taps - 1 - k];
        *tap = if k % 2 == 0 { mirrored } else { -mirrored };
    }
    filter
}

/// One level of the filter bank
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    /// Low-pass output, input to the next level
    pub approximation: Vec<f64>,
    /// High-pass output
    pub detail: Vec<f64>,
}

/// Result of a multi-level wavelet decomposition
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    levels: Vec<Level>,
}

impl Decomposition {
    /// Number of levels
    pub fn levels(&self) -> usize {
        self.levels.len()
    }

    /// Coefficients of level `index` (0 is the finest)
    pub fn level(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// Iterate over levels, finest first
    pub fn iter(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter()
    }

    /// Approximation coefficients of the coarsest level
    pub fn approximation(&self) -> Option<&[f64]> {
        self.levels.last().map(|level| level.approximation.as_slice())
    }
}

/// Decompose `samples` into `levels` approximation/detail pairs
///
/// Fails with [`AnalysisError::InsufficientData`] when one of the halvings
/// would produce an empty sequence.
pub fn decompose(samples: &[f64], levels: usize) -> Result<Decomposition, AnalysisError> {
    let required = u32::try_from(levels)
        .ok()
        .and_then(|shift| 1usize.checked_shl(shift))
        .unwrap_or(usize::MAX);
    if samples.len() < required {
        return Err(AnalysisError::InsufficientData {
            required,
            actual: samples.len(),
        });
    }

    let high = high_pass();
    let mut result = Vec::with_capacity(levels);
    let mut current = samples.to_vec();

    for _ in 0..levels {
        let approximation = analyze(&current, &DAUBECHIES8);
        let detail = analyze(&current, &high);
        current = approximation.clone();
        result.push(Level {
            approximation,
            detail,
        });
    }

    Ok(Decomposition { levels: result })
}

/// Convolve with `filter` and keep every second output, wrapping at the edges
fn analyze(signal: &[f64], filter: &[f64; 8]) -> Vec<f64> {
    let n = signal.len();
    (0..n / 2)
        .map(|i| {
            filter
                .iter()
                .enumerate()
                .map(|(k, &tap)| tap * signal[(2 * i + k) % n])
                .sum()
        })
        .collect()
}
