//! Lomb-Scargle periodogram for irregularly sampled light curves.
//!
//! Used by the periodic-trend filter to decide whether a residual still
//! carries a significant periodic signal. Non-finite samples are skipped.

use std::f64::consts::PI;

/// Frequency-grid settings for [`lomb_scargle`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyGrid {
    /// Oversampling factor relative to the natural resolution `1 / span`
    pub oversampling: f64,
    /// Upper bound on the number of evaluated frequencies
    pub max_frequencies: usize,
    /// Shortest period searched; defaults to the pseudo-Nyquist limit
    pub min_period: Option<f64>,
}

impl Default for FrequencyGrid {
    fn default() -> Self {
        Self {
            oversampling: 5.0,
            max_frequencies: 2000,
            min_period: None,
        }
    }
}

/// Periodogram peak and its significance.
#[derive(Debug, Clone, PartialEq)]
pub struct Periodogram {
    pub frequencies: Vec<f64>,
    pub power: Vec<f64>,
    pub peak_frequency: f64,
    pub peak_power: f64,
    /// False alarm probability of the highest peak
    pub false_alarm_probability: f64,
}

impl Periodogram {
    pub fn peak_period(&self) -> f64 {
        if self.peak_frequency > 0.0 {
            1.0 / self.peak_frequency
        } else {
            f64::INFINITY
        }
    }
}

/// Compute the Lomb-Scargle periodogram (Scargle 1982 normalisation).
///
/// Returns `None` when fewer than three finite samples remain, the samples
/// span no time, or the values have zero variance.
pub fn lomb_scargle(times: &[f64], values: &[f64], grid: &FrequencyGrid) -> Option<Periodogram> {
    let (t, y): (Vec<f64>, Vec<f64>) = times
        .iter()
        .zip(values)
        .filter(|(t, y)| t.is_finite() && y.is_finite())
        .map(|(&t, &y)| (t, y))
        .unzip();

    let n = t.len();
    if n < 3 {
        return None;
    }

    let mean = y.iter().sum::<f64>() / n as f64;
    let var = y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    if var <= 0.0 {
        return None;
    }

    let frequencies = frequency_grid(&t, grid)?;
    let centred: Vec<f64> = y.iter().map(|v| v - mean).collect();
    let power: Vec<f64> = frequencies
        .iter()
        .map(|&f| single_frequency_power(&t, &centred, var, 2.0 * PI * f))
        .collect();

    // Ties keep the lowest frequency
    let (peak_idx, peak_power) = power
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, p)| {
            if p > best.1 {
                (i, p)
            } else {
                best
            }
        });

    let n_independent = n.min(frequencies.len());
    let false_alarm_probability = false_alarm_probability(peak_power, n_independent);

    Some(Periodogram {
        peak_frequency: frequencies[peak_idx],
        peak_power,
        false_alarm_probability,
        frequencies,
        power,
    })
}

/// Power at one angular frequency.
fn single_frequency_power(times: &[f64], centred: &[f64], var: f64, omega: f64) -> f64 {
    // tau makes the sine and cosine terms orthogonal
    let (mut sum_sin2, mut sum_cos2) = (0.0, 0.0);
    for &t in times {
        let arg = 2.0 * omega * t;
        sum_sin2 += arg.sin();
        sum_cos2 += arg.cos();
    }
    let tau = sum_sin2.atan2(sum_cos2) / (2.0 * omega);

    let (mut yc, mut ys, mut cc, mut ss) = (0.0, 0.0, 0.0, 0.0);
    for (&t, &y) in times.iter().zip(centred) {
        let arg = omega * (t - tau);
        let (s, c) = arg.sin_cos();
        yc += y * c;
        ys += y * s;
        cc += c * c;
        ss += s * s;
    }

    let cc = cc.max(1e-15);
    let ss = ss.max(1e-15);
    0.5 * (yc * yc / cc + ys * ys / ss) / var
}

/// Frequencies from one cycle per span up to the pseudo-Nyquist limit (or
/// `1 / min_period` when that is lower).
fn frequency_grid(times: &[f64], grid: &FrequencyGrid) -> Option<Vec<f64>> {
    let n = times.len();
    let span = times[n - 1] - times[0];
    if !(span > 0.0) {
        return None;
    }

    let f_min = 1.0 / span;
    let mut f_max = 0.5 * (n - 1) as f64 / span;
    if let Some(min_period) = grid.min_period.filter(|p| *p > 0.0) {
        f_max = f_max.min(1.0 / min_period);
    }
    if f_max <= f_min {
        return Some(vec![f_min]);
    }

    let oversampling = grid.oversampling.max(1.0);
    let mut df = f_min / oversampling;
    let natural = ((f_max - f_min) / df).ceil() as usize + 1;
    let cap = grid.max_frequencies.max(2);
    if natural > cap {
        df = (f_max - f_min) / (cap - 1) as f64;
    }
    let n_freq = natural.min(cap);
    Some((0..n_freq).map(|i| f_min + i as f64 * df).collect())
}

/// `FAP = 1 - (1 - e^{-z})^M` for peak power `z` over `M` independent
/// frequencies.
pub fn false_alarm_probability(power: f64, n_independent: usize) -> f64 {
    if !(power > 0.0) || n_independent == 0 {
        return 1.0;
    }
    let prob_single = 1.0 - (-power).exp();
    if prob_single <= 0.0 {
        return 1.0;
    }
    if prob_single >= 1.0 {
        return 0.0;
    }
    let log_cdf = n_independent as f64 * prob_single.ln();
    // -expm1 keeps precision for FAPs near zero and near one
    (-log_cdf.exp_m1()).clamp(0.0, 1.0)
}
