//! Sliding Tukey-biweight detrending over a grid of window lengths.

use log::debug;
use rayon::prelude::*;

use super::stats::{median_in_place, segment_on_gaps, window_grid};

/// Parameters of the robust local detrender.
#[derive(Debug, Clone, PartialEq)]
pub struct DetrendParams {
    pub window_min: f64,
    pub window_max: f64,
    pub window_step: f64,
    /// Time from each segment edge within which no trend is reported
    pub edge_cutoff: f64,
    /// Tukey tuning constant, in units of the window MAD
    pub biweight_constant: f64,
    pub max_iterations: usize,
    /// Fewest usable neighbours for a location estimate
    pub min_window_points: usize,
    /// Fraction of finite flat points for a variant to succeed
    pub min_valid_fraction: f64,
    pub break_tolerance: f64,
    /// Run the window grid on the rayon pool
    pub parallel: bool,
}

impl Default for DetrendParams {
    fn default() -> Self {
        Self {
            window_min: 0.5,
            window_max: 2.5,
            window_step: 0.1,
            edge_cutoff: 0.0,
            biweight_constant: 5.0,
            max_iterations: 10,
            min_window_points: 5,
            min_valid_fraction: 0.5,
            break_tolerance: 0.5,
            parallel: true,
        }
    }
}

impl DetrendParams {
    pub fn windows(&self) -> Vec<f64> {
        window_grid(self.window_min, self.window_max, self.window_step)
    }
}

/// One detrended rendition of a light curve.
#[derive(Debug, Clone, PartialEq)]
pub struct DetrendedVariant {
    pub window_length: f64,
    /// `flux / trend`; NaN where no trend could be estimated
    pub flat_flux: Vec<f64>,
    pub trend: Vec<f64>,
    pub succeeded: bool,
}

impl DetrendedVariant {
    pub fn n_valid(&self) -> usize {
        self.flat_flux.iter().filter(|f| f.is_finite()).count()
    }
}

const CONVERGENCE_TOLERANCE: f64 = 1e-10;

/// Tukey biweight location of `values`, starting from their median.
///
/// `values` must be finite; it is reordered. Returns `None` when empty.
pub fn biweight_location(values: &mut [f64], c: f64, max_iterations: usize) -> Option<f64> {
    let mut location = median_in_place(values)?;
    let mut deviations = vec![0.0; values.len()];

    for _ in 0..max_iterations {
        for (d, v) in deviations.iter_mut().zip(values.iter()) {
            *d = (v - location).abs();
        }
        let mad = match median_in_place(&mut deviations) {
            Some(mad) if mad > 0.0 => mad,
            _ => break,
        };

        let scale = c * mad;
        let (mut num, mut den) = (0.0, 0.0);
        for &v in values.iter() {
            let u = (v - location) / scale;
            if u.abs() < 1.0 {
                let w = (1.0 - u * u).powi(2);
                num += w * v;
                den += w;
            }
        }
        if den <= 0.0 {
            break;
        }

        let next = num / den;
        let converged = (next - location).abs() <= CONVERGENCE_TOLERANCE * location.abs().max(1.0);
        location = next;
        if converged {
            break;
        }
    }
    Some(location)
}

/// Detrend with a single window length.
///
/// Masked points never contribute to a location estimate but still receive
/// a trend from their neighbours.
pub fn biweight_detrend(
    time: &[f64],
    flux: &[f64],
    mask: Option<&[bool]>,
    window_length: f64,
    params: &DetrendParams,
) -> DetrendedVariant {
    let n = time.len();
    let half = window_length / 2.0;
    let usable: Vec<bool> = (0..n)
        .map(|i| flux[i].is_finite() && !mask.is_some_and(|m| m[i]))
        .collect();

    let mut trend = vec![f64::NAN; n];
    let mut buffer = Vec::new();
    for (start, end) in segment_on_gaps(time, params.break_tolerance) {
        let (seg_start, seg_end) = (time[start], time[end - 1]);
        let mut lo = start;
        let mut hi = start;
        for i in start..end {
            while time[lo] < time[i] - half {
                lo += 1;
            }
            while hi < end && time[hi] <= time[i] + half {
                hi += 1;
            }

            if time[i] - seg_start < params.edge_cutoff || seg_end - time[i] < params.edge_cutoff {
                continue;
            }

            buffer.clear();
            buffer.extend((lo..hi).filter(|&j| usable[j]).map(|j| flux[j]));
            if buffer.len() < params.min_window_points.max(1) {
                continue;
            }
            if let Some(loc) =
                biweight_location(&mut buffer, params.biweight_constant, params.max_iterations)
            {
                trend[i] = loc;
            }
        }
    }

    let flat_flux: Vec<f64> = flux
        .iter()
        .zip(&trend)
        .map(|(&f, &t)| if t.is_finite() && t != 0.0 { f / t } else { f64::NAN })
        .collect();
    for (t, f) in trend.iter_mut().zip(&flat_flux) {
        if !f.is_finite() {
            *t = f64::NAN;
        }
    }

    let n_valid = flat_flux.iter().filter(|f| f.is_finite()).count();
    let succeeded = n_valid >= 3 && n_valid as f64 >= params.min_valid_fraction * n as f64;

    DetrendedVariant {
        window_length,
        flat_flux,
        trend,
        succeeded,
    }
}

/// Detrend once per grid window. Output order follows the grid.
pub fn detrend_grid(
    time: &[f64],
    flux: &[f64],
    mask: Option<&[bool]>,
    params: &DetrendParams,
) -> Vec<DetrendedVariant> {
    let windows = params.windows();
    let run = |&w: &f64| {
        let variant = biweight_detrend(time, flux, mask, w, params);
        if !variant.succeeded {
            debug!(
                "detrending window {:.3} failed: {} of {} points valid",
                w,
                variant.n_valid(),
                time.len()
            );
        }
        variant
    };

    if params.parallel {
        windows.par_iter().map(run).collect()
    } else {
        windows.iter().map(run).collect()
    }
}

#[cfg(test)]
#[path = "detrend_tests.rs"]
mod tests;
