//! Population-level systematics flagging.
//!
//! Instrumental glitches hit every star observed in the same epoch at the
//! same moment, so an excess of events in one time bin across the whole
//! batch marks those events as likely systematics. This is a reduction over
//! a finished batch: histograms are built once from every event and then
//! consumed to resolve each event's `systematics_flag`.

use std::collections::BTreeMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::SystematicsConfig;
use crate::models::{CandidateEvent, EpochWindow};

/// Event-time histogram of one epoch across the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchTimingHistogram {
    pub epoch_id: String,
    pub start: f64,
    pub end: f64,
    pub bin_width: f64,
    pub counts: Vec<usize>,
    /// Events that fell inside the epoch window
    pub total_events: usize,
    pub expected_per_bin: f64,
    /// Counts above this are anomalous (subject to `min_bin_count`)
    pub threshold: f64,
    pub min_bin_count: usize,
}

impl BatchTimingHistogram {
    fn empty(window: &EpochWindow, config: &SystematicsConfig) -> Self {
        let n_bins = ((window.duration() / config.bin_width).ceil() as usize).max(1);
        Self {
            epoch_id: window.epoch_id.clone(),
            start: window.start,
            end: window.end,
            bin_width: config.bin_width,
            counts: vec![0; n_bins],
            total_events: 0,
            expected_per_bin: 0.0,
            threshold: 0.0,
            min_bin_count: config.min_bin_count,
        }
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    /// Bin holding `time`, or `None` outside `[start, end]`.
    pub fn bin_of(&self, time: f64) -> Option<usize> {
        if !(time >= self.start && time <= self.end) {
            return None;
        }
        let bin = ((time - self.start) / self.bin_width).floor() as usize;
        Some(bin.min(self.n_bins() - 1))
    }

    pub fn is_anomalous(&self, bin: usize) -> bool {
        self.counts.get(bin).is_some_and(|&count| {
            count >= self.min_bin_count && count as f64 > self.threshold
        })
    }

    pub fn anomalous_bins(&self) -> Vec<usize> {
        (0..self.n_bins()).filter(|&b| self.is_anomalous(b)).collect()
    }
}

/// Per-epoch outcome kept after the histograms are consumed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochSystematics {
    pub epoch_id: String,
    pub total_events: usize,
    pub expected_per_bin: f64,
    pub threshold: f64,
    pub anomalous_bins: Vec<usize>,
}

/// Counts of resolved flags after [`apply_histograms`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystematicsSummary {
    pub flagged: usize,
    pub clean: usize,
    pub unresolved: usize,
    pub epochs: Vec<EpochSystematics>,
}

/// Build one histogram per epoch from every event of the batch.
///
/// Events of unknown epochs or outside their epoch window are not counted.
/// When an epoch id appears twice the first window is used.
pub fn build_histograms(
    events: &[CandidateEvent],
    epochs: &[EpochWindow],
    config: &SystematicsConfig,
) -> BTreeMap<String, BatchTimingHistogram> {
    let mut histograms = BTreeMap::new();
    for window in epochs {
        if histograms.contains_key(&window.epoch_id) {
            warn!("duplicate epoch window '{}' ignored", window.epoch_id);
            continue;
        }
        histograms.insert(window.epoch_id.clone(), BatchTimingHistogram::empty(window, config));
    }

    for event in events {
        if let Some(hist) = histograms.get_mut(&event.epoch_id) {
            if let Some(bin) = hist.bin_of(event.event_time) {
                hist.counts[bin] += 1;
                hist.total_events += 1;
            }
        }
    }

    for hist in histograms.values_mut() {
        hist.expected_per_bin = hist.total_events as f64 / hist.n_bins() as f64;
        hist.threshold = config.excess_factor * hist.expected_per_bin;
    }
    histograms
}

/// Resolve `systematics_flag` on every event, consuming the histograms.
pub fn apply_histograms(
    events: &mut [CandidateEvent],
    histograms: BTreeMap<String, BatchTimingHistogram>,
) -> SystematicsSummary {
    let mut summary = SystematicsSummary::default();
    let mut unknown_epochs: BTreeMap<String, usize> = BTreeMap::new();

    for event in events.iter_mut() {
        let Some(hist) = histograms.get(&event.epoch_id) else {
            *unknown_epochs.entry(event.epoch_id.clone()).or_default() += 1;
            event.systematics_flag = None;
            summary.unresolved += 1;
            continue;
        };
        match hist.bin_of(event.event_time) {
            Some(bin) => {
                let flagged = hist.is_anomalous(bin);
                event.systematics_flag = Some(flagged);
                if flagged {
                    summary.flagged += 1;
                } else {
                    summary.clean += 1;
                }
            }
            None => {
                warn!(
                    "event at {:.4} of object {} lies outside epoch '{}'; systematics flag unresolved",
                    event.event_time, event.object_id, event.epoch_id
                );
                event.systematics_flag = None;
                summary.unresolved += 1;
            }
        }
    }

    for (epoch_id, count) in unknown_epochs {
        warn!(
            "no boundaries for epoch '{}': {} events left without a systematics flag",
            epoch_id, count
        );
    }

    summary.epochs = histograms
        .into_values()
        .map(|hist| EpochSystematics {
            anomalous_bins: hist.anomalous_bins(),
            epoch_id: hist.epoch_id,
            total_events: hist.total_events,
            expected_per_bin: hist.expected_per_bin,
            threshold: hist.threshold,
        })
        .collect();
    summary
}
