//! Orbital phase folding and in-eclipse masks.

/// Orbital phase of `time` for the given ephemeris.
///
/// The reference epoch is always phase 0. `centre` only picks the fold
/// window `[centre - 0.5, centre + 0.5)` the result is reported in; the
/// default of 0.5 gives `[0, 1)`.
///
/// # Example
/// ```
/// use mono_cbp::algorithms::phase::phase;
/// let p = phase(105.5, 2.0, 100.0, 0.5);
/// assert!((p - 0.75).abs() < 1e-12);
/// let p = phase(105.5, 2.0, 100.0, 0.0);
/// assert!((p + 0.25).abs() < 1e-12);
/// ```
pub fn phase(time: f64, period: f64, reference_epoch: f64, centre: f64) -> f64 {
    let start = centre - 0.5;
    let cycles = (time - reference_epoch) / period - start;
    let mut p = cycles - cycles.floor();
    // floor() guarantees p >= 0; rounding can still produce exactly 1.0
    if p >= 1.0 {
        p -= 1.0;
    }
    if p < 0.0 {
        p += 1.0;
    }
    p + start
}

/// Phase of every time stamp in `times`.
pub fn phase_series(times: &[f64], period: f64, reference_epoch: f64, centre: f64) -> Vec<f64> {
    times
        .iter()
        .map(|&t| phase(t, period, reference_epoch, centre))
        .collect()
}

/// Circular distance between two phases, in `[0, 0.5]`.
pub fn phase_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(1.0);
    d.min(1.0 - d)
}

/// Mask of the phases lying within `width / 2` of `position`, wrapping
/// across the 0/1 boundary.
///
/// A NaN position or width, or a non-positive width, yields an all-false
/// mask (the eclipse is treated as absent).
pub fn eclipse_mask(phases: &[f64], position: f64, width: f64) -> Vec<bool> {
    if position.is_nan() || width.is_nan() || width <= 0.0 {
        return vec![false; phases.len()];
    }
    let half_width = width / 2.0;
    phases
        .iter()
        .map(|&p| p.is_finite() && phase_distance(p, position) < half_width)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reference_epoch_is_phase_zero() {
        assert_eq!(phase(100.0, 3.0, 100.0, 0.5), 0.0);
        assert!((phase(101.5, 3.0, 100.0, 0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_negative_times_wrap() {
        let p = phase(99.5, 2.0, 100.0, 0.5);
        assert!((p - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_centre_moves_fold_window() {
        // The reference epoch stays at phase 0 for any centre
        assert_eq!(phase(100.0, 2.0, 100.0, 0.25), 0.0);
        assert_eq!(phase(100.0, 2.0, 100.0, 0.0), 0.0);
        // Quarter orbit before the reference epoch
        assert!((phase(99.5, 2.0, 100.0, 0.25) + 0.25).abs() < 1e-12);
        assert!((phase(99.5, 2.0, 100.0, 0.5) - 0.75).abs() < 1e-12);
        assert!((phase(100.5, 2.0, 100.0, 0.25) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_mask_matches_across_fold_windows() {
        let times: Vec<f64> = (0..200).map(|i| 100.0 + i as f64 * 0.013).collect();
        let unit = phase_series(&times, 0.7, 100.2, 0.5);
        let shifted = phase_series(&times, 0.7, 100.2, 0.0);
        assert_eq!(eclipse_mask(&unit, 0.0, 0.1), eclipse_mask(&shifted, 0.0, 0.1));
        assert_eq!(eclipse_mask(&unit, 0.5, 0.08), eclipse_mask(&shifted, 0.5, 0.08));
    }

    #[test]
    fn test_mask_wraps_boundary() {
        let mask = eclipse_mask(&[0.97, 0.03, 0.5, 0.94, 0.06], 0.0, 0.1);
        assert_eq!(mask, vec![true, true, false, false, false]);
    }

    #[test]
    fn test_mask_near_one() {
        let mask = eclipse_mask(&[0.99, 0.01, 0.9], 0.98, 0.08);
        assert_eq!(mask, vec![true, true, false]);
    }

    #[test]
    fn test_mask_absent_eclipse() {
        assert_eq!(eclipse_mask(&[0.0, 0.5], f64::NAN, 0.1), vec![false, false]);
        assert_eq!(eclipse_mask(&[0.0, 0.5], 0.0, 0.0), vec![false, false]);
    }

    proptest! {
        #[test]
        fn prop_phase_in_unit_interval(
            time in -1.0e4f64..1.0e4,
            period in 1.0e-2f64..1.0e3,
            epoch in -1.0e4f64..1.0e4,
        ) {
            let p = phase(time, period, epoch, 0.5);
            prop_assert!((0.0..1.0).contains(&p));
        }

        #[test]
        fn prop_phase_is_periodic(
            time in -1.0e3f64..1.0e3,
            period in 0.1f64..100.0,
            epoch in -1.0e3f64..1.0e3,
        ) {
            let a = phase(time, period, epoch, 0.5);
            let b = phase(time + period, period, epoch, 0.5);
            prop_assert!(phase_distance(a, b) < 1e-6);
        }

        #[test]
        fn prop_mask_matches_distance(
            p in 0.0f64..1.0,
            position in 0.0f64..1.0,
            width in 0.01f64..0.5,
        ) {
            let mask = eclipse_mask(&[p], position, width);
            prop_assert_eq!(mask[0], phase_distance(p, position) < width / 2.0);
        }
    }
}
