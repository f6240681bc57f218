//! Threshold-crossing search for single dimming events.
//!
//! A point is flagged when it falls more than `mad_multiplier` noise units
//! below the baseline. Event extents are the runs of points below the looser
//! `extent_multiplier` threshold, so the extent of an event does not depend on
//! the detection threshold and raising it can only remove events.
//!
//! Depth and timing come from the flagged core of the extent: the mean depth
//! of the flagged points and the midpoint between the first and last of them.
//! Both stay close to the true box depth and centre of a shallow dip, where
//! the deepest single point is dominated by noise.

use serde::{Deserialize, Serialize};

use super::noise::NoiseEstimate;
use super::stats::median;
use crate::error::{PipelineError, PipelineResult};

/// Detector thresholds.
#[derive(Debug, Clone, PartialEq)]
pub struct MonofindParams {
    /// Detection threshold `k`, in noise units below the baseline
    pub mad_multiplier: f64,
    /// Threshold bounding the event extent; must not exceed `mad_multiplier`
    pub extent_multiplier: f64,
    /// Largest time step allowed inside one event
    pub break_tolerance: f64,
    /// Flagged points an extent must contain to become an event
    pub min_event_points: usize,
}

impl Default for MonofindParams {
    fn default() -> Self {
        Self {
            mad_multiplier: 3.0,
            extent_multiplier: 1.0,
            break_tolerance: 0.5,
            min_event_points: 3,
        }
    }
}

impl MonofindParams {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.mad_multiplier.is_finite() && self.mad_multiplier > 0.0) {
            return Err(PipelineError::configuration(format!(
                "mad_multiplier must be positive, got {}",
                self.mad_multiplier
            )));
        }
        if !(self.extent_multiplier >= 0.0 && self.extent_multiplier <= self.mad_multiplier) {
            return Err(PipelineError::configuration(format!(
                "extent_multiplier must lie in [0, {}], got {}",
                self.mad_multiplier, self.extent_multiplier
            )));
        }
        if !(self.break_tolerance > 0.0) {
            return Err(PipelineError::configuration(format!(
                "break_tolerance must be positive, got {}",
                self.break_tolerance
            )));
        }
        if self.min_event_points == 0 {
            return Err(PipelineError::configuration(
                "min_event_points must be at least 1",
            ));
        }
        Ok(())
    }
}

/// An event as found by the detector, before characterisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    pub start_index: usize,
    /// Inclusive
    pub end_index: usize,
    /// Index of the lowest flux in the extent
    pub min_index: usize,
    /// Sample nearest the midpoint of the flagged core
    pub centre_index: usize,
    /// Flagged points inside the extent
    pub n_points: usize,
    /// Midpoint between the first and last flagged points
    pub event_time: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
    /// Mean depth of the flagged points below the baseline
    pub depth: f64,
    /// Depth of the single lowest point
    pub peak_depth: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonofindResult {
    pub events: Vec<RawEvent>,
    pub baseline: f64,
    /// Detection threshold at each point
    pub thresholds: Vec<f64>,
    pub n_flagged: usize,
}

/// Search a detrended light curve for dips.
///
/// # Errors
/// `InvalidInput` when `time`, `flux` and a variable noise estimate differ in
/// length, `Configuration` for invalid thresholds, and `InsufficientData`
/// when the flux holds no finite value.
pub fn monofind(
    time: &[f64],
    flux: &[f64],
    noise: &NoiseEstimate,
    params: &MonofindParams,
) -> PipelineResult<MonofindResult> {
    params.validate()?;
    let n = time.len();
    if flux.len() != n || !noise.len_matches(n) {
        return Err(PipelineError::invalid_input(format!(
            "monofind inputs differ in length (time={}, flux={})",
            n,
            flux.len()
        ))
        .with_operation("monofind"));
    }

    let baseline = median(flux).ok_or_else(|| {
        PipelineError::insufficient_data("no finite flux values").with_operation("monofind")
    })?;

    let thresholds: Vec<f64> = (0..n)
        .map(|i| baseline - params.mad_multiplier * noise.at(i))
        .collect();
    // NaN flux or noise compares false and never qualifies
    let flagged: Vec<bool> = (0..n).map(|i| flux[i] < thresholds[i]).collect();
    let in_extent = |i: usize| flux[i] < baseline - params.extent_multiplier * noise.at(i);

    let mut events = Vec::new();
    let mut i = 0;
    while i < n {
        if !in_extent(i) {
            i += 1;
            continue;
        }
        let start = i;
        while i + 1 < n && in_extent(i + 1) && time[i + 1] - time[i] <= params.break_tolerance {
            i += 1;
        }
        let end = i;
        i += 1;

        let core: Vec<usize> = (start..=end).filter(|&j| flagged[j]).collect();
        if core.len() < params.min_event_points {
            continue;
        }
        let (first, last) = match (core.first(), core.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => continue,
        };

        let min_index = (start..=end).fold(start, |best, j| if flux[j] < flux[best] { j } else { best });
        let event_time = 0.5 * (time[first] + time[last]);
        let centre_index = (first..=last)
            .min_by(|&a, &b| (time[a] - event_time).abs().total_cmp(&(time[b] - event_time).abs()))
            .unwrap_or(first);
        let depth = core.iter().map(|&j| baseline - flux[j]).sum::<f64>() / core.len() as f64;
        events.push(RawEvent {
            start_index: start,
            end_index: end,
            min_index,
            centre_index,
            n_points: core.len(),
            event_time,
            start_time: time[start],
            end_time: time[end],
            duration: time[end] - time[start],
            depth,
            peak_depth: baseline - flux[min_index],
        });
    }

    Ok(MonofindResult {
        events,
        baseline,
        thresholds,
        n_flagged: flagged.iter().filter(|&&f| f).count(),
    })
}
