//! Removal of the binary's periodic brightness pattern.
//!
//! The trend is a weighted least-squares fit of a low-order polynomial plus a
//! cosine series whose highest harmonic is set by the window length. The
//! window is shrunk until the Lomb-Scargle periodogram of the residual no
//! longer shows a significant peak.

use log::debug;
use nalgebra::{DMatrix, DVector};

use super::periodogram::{lomb_scargle, FrequencyGrid};
use super::stats::{mad_sigma, median, segment_on_gaps, window_grid};
use crate::error::{PipelineError, PipelineResult};

/// Parameters of the periodic-trend filter.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicFilterParams {
    pub window_min: f64,
    pub window_max: f64,
    pub window_step: f64,
    /// A residual peak with FAP below this is considered still periodic
    pub fap_threshold: f64,
    pub poly_order: usize,
    /// Number of clip-and-refit passes after the initial solve
    pub robust_iterations: usize,
    pub clip_sigma: f64,
    /// Time gap that splits the series into independently fitted segments
    pub break_tolerance: f64,
    pub frequency_grid: FrequencyGrid,
}

impl Default for PeriodicFilterParams {
    fn default() -> Self {
        Self {
            window_min: 0.5,
            window_max: 5.0,
            window_step: 0.5,
            fap_threshold: 0.01,
            poly_order: 2,
            robust_iterations: 3,
            clip_sigma: 3.0,
            break_tolerance: 0.5,
            frequency_grid: FrequencyGrid::default(),
        }
    }
}

/// Output of [`periodic_filter`].
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodicFilterResult {
    /// `flux / trend`; NaN where either is undefined
    pub residual: Vec<f64>,
    pub trend: Vec<f64>,
    /// Accepted window length
    pub window_length: f64,
    /// False alarm probability of the residual's highest periodogram peak
    pub fap: f64,
}

/// Design-matrix layout for one segment.
struct Basis {
    t0: f64,
    span: f64,
    n_poly: usize,
    n_cos: usize,
}

impl Basis {
    fn n_terms(&self) -> usize {
        self.n_poly + self.n_cos
    }

    fn fill_row(&self, t: f64, row: &mut [f64]) {
        let u = (t - self.t0) / self.span;
        let x = 2.0 * u - 1.0;
        let mut power = 1.0;
        for slot in row.iter_mut().take(self.n_poly) {
            *slot = power;
            power *= x;
        }
        for j in 1..=self.n_cos {
            row[self.n_poly + j - 1] = (std::f64::consts::PI * j as f64 * u).cos();
        }
    }

    fn evaluate(&self, t: f64, coeffs: &DVector<f64>, row: &mut [f64]) -> f64 {
        self.fill_row(t, row);
        row.iter().zip(coeffs.iter()).map(|(b, c)| b * c).sum()
    }
}

/// Weighted least squares over the included points.
///
/// Solves the normal equations by Cholesky, falling back to an SVD of the
/// weighted design matrix when they are not positive definite.
fn solve(
    basis: &Basis,
    time: &[f64],
    flux: &[f64],
    weights: &[f64],
    include: &[bool],
) -> Option<DVector<f64>> {
    let rows: Vec<usize> = (0..time.len()).filter(|&i| include[i]).collect();
    let m = basis.n_terms();
    if rows.len() <= m {
        return None;
    }

    let mut a = DMatrix::<f64>::zeros(rows.len(), m);
    let mut b = DVector::<f64>::zeros(rows.len());
    let mut row = vec![0.0; m];
    for (r, &i) in rows.iter().enumerate() {
        let sw = weights[i].sqrt();
        basis.fill_row(time[i], &mut row);
        for (c, value) in row.iter().enumerate() {
            a[(r, c)] = value * sw;
        }
        b[r] = flux[i] * sw;
    }

    let ata = a.tr_mul(&a);
    let atb = a.tr_mul(&b);
    let coeffs = match ata.cholesky() {
        Some(chol) => chol.solve(&atb),
        None => a.svd(true, true).solve(&b, 1e-12).ok()?,
    };
    coeffs.iter().all(|c| c.is_finite()).then_some(coeffs)
}

/// Robust trend of one gap-free segment.
fn fit_segment(
    time: &[f64],
    flux: &[f64],
    weights: &[f64],
    usable: &[bool],
    window: f64,
    params: &PeriodicFilterParams,
) -> Vec<f64> {
    let n = time.len();
    let n_usable = usable.iter().filter(|&&u| u).count();
    let n_poly = params.poly_order + 1;
    let span = time[n - 1] - time[0];

    let flat_level = || {
        let values: Vec<f64> = (0..n).filter(|&i| usable[i]).map(|i| flux[i]).collect();
        vec![median(&values).unwrap_or(f64::NAN); n]
    };

    if !(span > 0.0) || n_usable <= n_poly {
        return flat_level();
    }

    // Keep at least one spare degree of freedom
    let max_cos = n_usable - n_poly - 1;
    let basis = Basis {
        t0: time[0],
        span,
        n_poly,
        n_cos: ((2.0 * span / window).floor() as usize).min(max_cos),
    };

    let mut include = usable.to_vec();
    let mut coeffs = None;
    let mut row = vec![0.0; basis.n_terms()];
    for pass in 0..=params.robust_iterations {
        let Some(c) = solve(&basis, time, flux, weights, &include) else {
            break;
        };

        let residuals: Vec<f64> = (0..n)
            .map(|i| flux[i] - basis.evaluate(time[i], &c, &mut row))
            .collect();
        coeffs = Some(c);
        if pass == params.robust_iterations {
            break;
        }

        let kept: Vec<f64> = (0..n).filter(|&i| include[i]).map(|i| residuals[i]).collect();
        let Some(sigma) = mad_sigma(&kept).filter(|s| *s > 0.0) else {
            break;
        };
        let limit = params.clip_sigma * sigma;
        let next: Vec<bool> = (0..n)
            .map(|i| usable[i] && residuals[i].abs() <= limit)
            .collect();
        if next == include || next.iter().filter(|&&k| k).count() <= basis.n_terms() {
            break;
        }
        include = next;
    }

    match coeffs {
        Some(c) => time
            .iter()
            .map(|&t| basis.evaluate(t, &c, &mut row))
            .collect(),
        None => flat_level(),
    }
}

/// Fit the periodic trend for a single window length.
///
/// Masked points and non-finite fluxes are excluded from the fit but still
/// receive a trend value.
pub fn fit_periodic_trend(
    time: &[f64],
    flux: &[f64],
    flux_err: &[f64],
    mask: Option<&[bool]>,
    window: f64,
    params: &PeriodicFilterParams,
) -> Vec<f64> {
    let weights: Vec<f64> = flux_err
        .iter()
        .map(|&e| {
            if e.is_finite() && e > 0.0 {
                1.0 / (e * e)
            } else {
                1.0
            }
        })
        .collect();
    let usable: Vec<bool> = (0..time.len())
        .map(|i| flux[i].is_finite() && !mask.is_some_and(|m| m[i]))
        .collect();

    let mut trend = Vec::with_capacity(time.len());
    for (start, end) in segment_on_gaps(time, params.break_tolerance) {
        trend.extend(fit_segment(
            &time[start..end],
            &flux[start..end],
            &weights[start..end],
            &usable[start..end],
            window,
            params,
        ));
    }
    trend
}

/// Remove the periodic pattern with the largest window that leaves no
/// significant periodicity.
///
/// # Errors
/// `InvalidInput` for mismatched slice lengths, `Configuration` for an empty
/// window grid, and `FilterNonConvergence` when every window leaves a
/// significant residual peak.
pub fn periodic_filter(
    time: &[f64],
    flux: &[f64],
    flux_err: &[f64],
    mask: Option<&[bool]>,
    params: &PeriodicFilterParams,
) -> PipelineResult<PeriodicFilterResult> {
    let n = time.len();
    if flux.len() != n || flux_err.len() != n || mask.is_some_and(|m| m.len() != n) {
        return Err(PipelineError::invalid_input("periodic filter inputs differ in length")
            .with_operation("periodic_filter"));
    }

    let windows = window_grid(params.window_min, params.window_max, params.window_step);
    if windows.is_empty() {
        return Err(PipelineError::configuration(format!(
            "empty periodic filter window grid [{}, {}] step {}",
            params.window_min, params.window_max, params.window_step
        )));
    }

    let fit_indices: Vec<usize> = (0..n).filter(|&i| !mask.is_some_and(|m| m[i])).collect();
    let fit_times: Vec<f64> = fit_indices.iter().map(|&i| time[i]).collect();

    let mut best_fap = 0.0;
    for &window in windows.iter().rev() {
        let trend = fit_periodic_trend(time, flux, flux_err, mask, window, params);
        let residual: Vec<f64> = flux
            .iter()
            .zip(&trend)
            .map(|(&f, &t)| if t.is_finite() && t > 0.0 { f / t } else { f64::NAN })
            .collect();

        let fit_residual: Vec<f64> = fit_indices.iter().map(|&i| residual[i]).collect();
        // A residual too degenerate for a periodogram carries no periodicity
        let periodogram = lomb_scargle(&fit_times, &fit_residual, &params.frequency_grid);
        let fap = periodogram.as_ref().map_or(1.0, |pg| pg.false_alarm_probability);
        match &periodogram {
            Some(pg) => debug!(
                "periodic filter window {:.3}: residual peak at {:.4} d, FAP {:.3e}",
                window,
                pg.peak_period(),
                fap
            ),
            None => debug!("periodic filter window {:.3}: residual too degenerate for a periodogram", window),
        }

        if fap >= params.fap_threshold {
            return Ok(PeriodicFilterResult {
                residual,
                trend,
                window_length: window,
                fap,
            });
        }
        best_fap = f64::max(best_fap, fap);
    }

    Err(PipelineError::non_convergence(format!(
        "no window in [{}, {}] removed the periodic signal (best FAP {:.3e}, threshold {})",
        params.window_min, params.window_max, best_fap, params.fap_threshold
    )))
}
