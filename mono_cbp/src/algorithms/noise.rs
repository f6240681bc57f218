//! Point-to-point noise estimates for the threshold detector.

use serde::{Deserialize, Serialize};

use super::stats::{mad_in_place, mad_sigma, MAD_TO_SIGMA};
use crate::error::{PipelineError, PipelineResult};

/// How the detector should estimate the local noise level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NoiseModel {
    #[default]
    Variable,
    Constant,
}

/// Noise level used to scale detection thresholds.
#[derive(Debug, Clone, PartialEq)]
pub enum NoiseEstimate {
    Constant(f64),
    /// One value per light-curve point
    Variable(Vec<f64>),
}

impl NoiseEstimate {
    /// Noise at point `index`. Out-of-range indices yield NaN.
    pub fn at(&self, index: usize) -> f64 {
        match self {
            Self::Constant(sigma) => *sigma,
            Self::Variable(values) => values.get(index).copied().unwrap_or(f64::NAN),
        }
    }

    pub fn len_matches(&self, n: usize) -> bool {
        match self {
            Self::Constant(_) => true,
            Self::Variable(values) => values.len() == n,
        }
    }
}

/// Scaled MAD of every finite value: the constant noise estimate.
pub fn global_mad_sigma(flux: &[f64]) -> PipelineResult<f64> {
    mad_sigma(flux).ok_or_else(|| {
        PipelineError::insufficient_data("no finite flux values for a noise estimate")
            .with_operation("global_mad_sigma")
    })
}

/// Scaled MAD in a centred window of `window` points around each point.
///
/// Points within `window / 2` of either end, windows holding fewer than
/// `window / 2` finite values, and windows with zero spread all take the
/// global estimate instead. A series shorter than `window` is entirely global.
pub fn rolling_mad(flux: &[f64], window: usize) -> PipelineResult<Vec<f64>> {
    let global = global_mad_sigma(flux)?;
    let n = flux.len();
    if window < 2 || n < window {
        return Ok(vec![global; n]);
    }

    let half = window / 2;
    let min_finite = window.div_ceil(2);
    let mut buffer = Vec::with_capacity(window);
    let noise = (0..n)
        .map(|i| {
            if i < half || i - half + window > n {
                return global;
            }
            let start = i - half;
            buffer.clear();
            buffer.extend(flux[start..start + window].iter().copied().filter(|f| f.is_finite()));
            if buffer.len() < min_finite {
                return global;
            }
            match mad_in_place(&mut buffer) {
                Some(mad) if mad > 0.0 => mad * MAD_TO_SIGMA,
                _ => global,
            }
        })
        .collect();
    Ok(noise)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::gaussian_noise;

    #[test]
    fn test_rolling_tracks_local_noise() {
        let mut flux: Vec<f64> = gaussian_noise(1000, 0.001, 1).iter().map(|e| 1.0 + e).collect();
        let loud = gaussian_noise(500, 0.01, 2);
        for (f, e) in flux[500..].iter_mut().zip(&loud) {
            *f = 1.0 + e;
        }

        let noise = rolling_mad(&flux, 100).unwrap();
        assert_eq!(noise.len(), 1000);
        assert!(noise[250] < 0.002, "quiet {}", noise[250]);
        assert!(noise[750] > 0.005, "loud {}", noise[750]);
    }

    #[test]
    fn test_edges_use_global() {
        let flux: Vec<f64> = gaussian_noise(400, 0.001, 4).iter().map(|e| 1.0 + e).collect();
        let global = global_mad_sigma(&flux).unwrap();
        let noise = rolling_mad(&flux, 100).unwrap();
        assert_eq!(noise[0], global);
        assert_eq!(noise[49], global);
        assert_eq!(noise[399], global);
        assert_ne!(noise[200], global);
    }

    #[test]
    fn test_short_series_is_global() {
        let flux = [1.0, 1.1, 0.9, 1.05];
        let global = global_mad_sigma(&flux).unwrap();
        assert_eq!(rolling_mad(&flux, 100).unwrap(), vec![global; 4]);
    }

    #[test]
    fn test_sparse_window_falls_back() {
        let mut flux: Vec<f64> = gaussian_noise(300, 0.001, 9).iter().map(|e| 1.0 + e).collect();
        for f in flux[100..200].iter_mut() {
            *f = f64::NAN;
        }
        let global = global_mad_sigma(&flux).unwrap();
        let noise = rolling_mad(&flux, 100).unwrap();
        assert_eq!(noise[150], global);
    }

    #[test]
    fn test_no_finite_values() {
        let err = rolling_mad(&[f64::NAN; 10], 4).unwrap_err();
        assert!(matches!(err, PipelineError::InsufficientData { .. }));
    }

    #[test]
    fn test_noise_estimate_access() {
        assert_eq!(NoiseEstimate::Constant(0.5).at(1000), 0.5);
        let v = NoiseEstimate::Variable(vec![0.1, 0.2]);
        assert_eq!(v.at(1), 0.2);
        assert!(v.at(2).is_nan());
        assert!(v.len_matches(2));
        assert!(!v.len_matches(3));
    }
}
