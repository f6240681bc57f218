//! Robust summary statistics shared by the detection stages.
//!
//! All functions ignore non-finite values, so NaN can be used throughout the
//! pipeline to mark excluded points.

/// Scale factor converting a MAD into a Gaussian standard deviation.
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Median of the finite values in `data`.
pub fn median(data: &[f64]) -> Option<f64> {
    let mut v: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
    median_in_place(&mut v)
}

/// Median of an already-filtered buffer, reordering it.
///
/// The buffer must only contain finite values.
pub fn median_in_place(v: &mut [f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.total_cmp(b));
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) * 0.5)
    } else {
        Some(v[mid])
    }
}

/// Median absolute deviation of the finite values in `data` about their median.
pub fn median_absolute_deviation(data: &[f64]) -> Option<f64> {
    let mut v: Vec<f64> = data.iter().copied().filter(|x| x.is_finite()).collect();
    mad_in_place(&mut v)
}

/// MAD of a buffer of finite values, reusing the buffer as scratch.
pub fn mad_in_place(v: &mut [f64]) -> Option<f64> {
    let med = median_in_place(v)?;
    for x in v.iter_mut() {
        *x = (*x - med).abs();
    }
    median_in_place(v)
}

/// MAD scaled to approximate a standard deviation under normality.
pub fn mad_sigma(data: &[f64]) -> Option<f64> {
    median_absolute_deviation(data).map(|mad| mad * MAD_TO_SIGMA)
}

/// Median of the positive time steps, i.e. the nominal cadence.
pub fn median_cadence(times: &[f64]) -> Option<f64> {
    if times.len() < 2 {
        return None;
    }
    let dts: Vec<f64> = times
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|dt| dt.is_finite() && *dt > 0.0)
        .collect();
    median(&dts)
}

/// Split a time series into `(start, end)` index ranges (end exclusive)
/// wherever consecutive samples are further apart than `break_tolerance`.
pub fn segment_on_gaps(times: &[f64], break_tolerance: f64) -> Vec<(usize, usize)> {
    let mut segments = Vec::new();
    if times.is_empty() {
        return segments;
    }

    let mut start = 0;
    for i in 1..times.len() {
        if times[i] - times[i - 1] > break_tolerance {
            segments.push((start, i));
            start = i;
        }
    }
    segments.push((start, times.len()));
    segments
}

/// Inclusive, evenly stepped grid of window lengths from `min` to `max`.
///
/// Values are computed as `min + i * step` so the grid does not accumulate
/// floating-point drift. Returns an empty grid for invalid bounds.
pub fn window_grid(min: f64, max: f64, step: f64) -> Vec<f64> {
    if !(min.is_finite() && max.is_finite() && step.is_finite()) || step <= 0.0 || min > max {
        return Vec::new();
    }
    let n = ((max - min) / step + 1e-9).floor() as usize + 1;
    (0..n).map(|i| min + i as f64 * step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn test_median_ignores_nan() {
        assert_eq!(median(&[f64::NAN, 5.0, 1.0, f64::NAN, 3.0]), Some(3.0));
        assert_eq!(median(&[f64::NAN, f64::NAN]), None);
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_mad() {
        // deviations from 3: 2, 1, 0, 1, 2 -> median 1
        let mad = median_absolute_deviation(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!(mad, 1.0);
        let sigma = mad_sigma(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!((sigma - MAD_TO_SIGMA).abs() < 1e-12);
    }

    #[test]
    fn test_median_cadence() {
        let t = [0.0, 0.1, 0.2, 0.3, 1.3, 1.4];
        assert!((median_cadence(&t).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(median_cadence(&[1.0]), None);
    }

    #[test]
    fn test_segment_on_gaps() {
        let t = [0.0, 0.1, 0.2, 2.0, 2.1, 5.0];
        assert_eq!(segment_on_gaps(&t, 0.5), vec![(0, 3), (3, 5), (5, 6)]);
        assert!(segment_on_gaps(&[], 0.5).is_empty());
    }

    #[test]
    fn test_window_grid_inclusive() {
        let grid = window_grid(0.5, 2.5, 0.1);
        assert_eq!(grid.len(), 21);
        assert!((grid[0] - 0.5).abs() < 1e-12);
        assert!((grid[20] - 2.5).abs() < 1e-9);
        assert!(window_grid(1.0, 0.5, 0.1).is_empty());
        assert_eq!(window_grid(1.0, 1.0, 0.1), vec![1.0]);
    }
}
