//! Signal-to-noise and snippet extraction for detected events.

use crate::algorithms::monofind::RawEvent;
use crate::algorithms::stats::median;
use crate::models::EventSnippet;

/// SNR of a detected event and the error level it was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EventSignificance {
    pub snr: f64,
    /// Median finite flux error inside the event
    pub flux_err: f64,
}

/// `(depth / err) * sqrt(max(duration, cadence) / cadence)`.
///
/// Returns `None` when the event holds no finite positive error or the
/// cadence is not positive, so the caller can drop the detection.
pub fn event_significance(event: &RawEvent, flux_err: &[f64], cadence: f64) -> Option<EventSignificance> {
    if !(cadence.is_finite() && cadence > 0.0) {
        return None;
    }
    let errors = flux_err.get(event.start_index..=event.end_index)?;
    let sigma = median(errors).filter(|s| *s > 0.0)?;

    // A single-point event spans one cadence
    let span = event.duration.max(cadence);
    let snr = event.depth / sigma * (span / cadence).sqrt();
    snr.is_finite().then_some(EventSignificance {
        snr,
        flux_err: sigma,
    })
}

/// Finite points within `half_width` of `event_time`.
#[allow(clippy::too_many_arguments)]
pub fn extract_snippet(
    object_id: &str,
    epoch_id: &str,
    event_time: f64,
    duration: f64,
    time: &[f64],
    flux: &[f64],
    flux_err: &[f64],
    half_width: f64,
) -> EventSnippet {
    let mut snippet = EventSnippet {
        object_id: object_id.to_string(),
        epoch_id: epoch_id.to_string(),
        event_time,
        duration,
        time: Vec::new(),
        flux: Vec::new(),
        flux_err: Vec::new(),
    };

    let lo = time.partition_point(|&t| t < event_time - half_width);
    let hi = time.partition_point(|&t| t <= event_time + half_width);
    for i in lo..hi {
        if flux[i].is_finite() && flux_err[i].is_finite() {
            snippet.time.push(time[i]);
            snippet.flux.push(flux[i]);
            snippet.flux_err.push(flux_err[i]);
        }
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(start: usize, end: usize, duration: f64, depth: f64) -> RawEvent {
        RawEvent {
            start_index: start,
            end_index: end,
            min_index: start,
            centre_index: (start + end) / 2,
            n_points: end - start + 1,
            event_time: duration / 2.0,
            start_time: 0.0,
            end_time: duration,
            duration,
            depth,
            peak_depth: depth,
        }
    }

    #[test]
    fn test_snr_scales_with_duration() {
        let errors = vec![0.001; 20];
        let short = event_significance(&raw(5, 5, 0.0, 0.005), &errors, 0.02).unwrap();
        assert!((short.snr - 5.0).abs() < 1e-9);

        let long = event_significance(&raw(5, 9, 0.08, 0.005), &errors, 0.02).unwrap();
        assert!((long.snr - 10.0).abs() < 1e-9);
        assert_eq!(long.flux_err, 0.001);
    }

    #[test]
    fn test_invalid_error_excludes_detection() {
        let errors = vec![f64::NAN; 10];
        assert!(event_significance(&raw(2, 4, 0.04, 0.01), &errors, 0.02).is_none());
        let zero = vec![0.0; 10];
        assert!(event_significance(&raw(2, 4, 0.04, 0.01), &zero, 0.02).is_none());
        let ok = vec![0.001; 10];
        assert!(event_significance(&raw(2, 4, 0.04, 0.01), &ok, 0.0).is_none());
        assert!(event_significance(&raw(8, 12, 0.04, 0.01), &ok, 0.02).is_none());
    }

    #[test]
    fn test_median_error_ignores_nan() {
        let errors = vec![0.001, f64::NAN, 0.003, 0.002];
        let sig = event_significance(&raw(0, 3, 0.06, 0.01), &errors, 0.02).unwrap();
        assert_eq!(sig.flux_err, 0.002);
    }

    #[test]
    fn test_snippet_window() {
        let time: Vec<f64> = (0..100).map(|i| i as f64 * 0.1).collect();
        let mut flux = vec![1.0; 100];
        flux[50] = f64::NAN;
        let err = vec![0.001; 100];
        let snippet = extract_snippet("7", "s2", 5.0, 0.1, &time, &flux, &err, 0.95);

        assert_eq!(snippet.object_id, "7");
        assert!(snippet.time.iter().all(|t| (t - 5.0).abs() <= 0.95));
        assert!(snippet.flux.iter().all(|f| f.is_finite()));
        // 4.1 ..= 5.9 is 19 samples, one of them NaN
        assert_eq!(snippet.len(), 18);
    }
}
