//! Merging of detections made under different detrending windows.
//!
//! The same physical dip is usually detected by many window lengths at a
//! slightly different minimum index. Detections are merged by interval
//! chaining on the minimum index; events found by few windows are marked as
//! dependent on the detrending choice.

use std::cmp::Ordering;

use super::monofind::RawEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsensusParams {
    /// Largest minimum-index separation, in cadences, within one cluster
    pub index_tolerance: usize,
    /// Events seen by fewer windows than this are detrending-dependent
    pub dependence_threshold: usize,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            index_tolerance: 10,
            dependence_threshold: 18,
        }
    }
}

/// One event detected under one detrending window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDetection {
    pub window_length: f64,
    pub event: RawEvent,
    pub snr: f64,
    /// Median normalised flux error inside the event
    pub flux_err: f64,
}

/// Merged view of every detection of one event.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusEvent {
    /// Highest-SNR detection (smallest window on ties)
    pub representative: WindowDetection,
    /// Distinct window lengths that detected the event
    pub n_windows: usize,
    pub detrending_dependent: bool,
}

fn by_position(a: &WindowDetection, b: &WindowDetection) -> Ordering {
    a.event
        .min_index
        .cmp(&b.event.min_index)
        .then(a.window_length.total_cmp(&b.window_length))
}

/// Whether `candidate` should replace `current` as representative.
fn outranks(candidate: &WindowDetection, current: &WindowDetection) -> bool {
    match candidate.snr.total_cmp(&current.snr) {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => candidate.window_length < current.window_length,
    }
}

fn summarize(cluster: Vec<WindowDetection>, params: &ConsensusParams) -> Option<ConsensusEvent> {
    let mut windows: Vec<f64> = cluster.iter().map(|d| d.window_length).collect();
    windows.sort_by(|a, b| a.total_cmp(b));
    windows.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    let n_windows = windows.len();

    let representative = cluster.into_iter().reduce(|best, d| if outranks(&d, &best) { d } else { best })?;
    Some(ConsensusEvent {
        representative,
        n_windows,
        detrending_dependent: n_windows < params.dependence_threshold,
    })
}

/// Cluster detections across windows and pick one representative per event.
///
/// Detections sorted by minimum index join the current cluster while they
/// lie within `index_tolerance` of the previous detection, so chains of
/// nearby detections merge transitively. Output is ordered by position.
pub fn build_consensus(
    mut detections: Vec<WindowDetection>,
    params: &ConsensusParams,
) -> Vec<ConsensusEvent> {
    detections.sort_by(by_position);

    let mut clusters: Vec<Vec<WindowDetection>> = Vec::new();
    let mut last_index: Option<usize> = None;
    for detection in detections {
        let min_index = detection.event.min_index;
        match (last_index, clusters.last_mut()) {
            (Some(prev), Some(cluster)) if min_index - prev <= params.index_tolerance => {
                cluster.push(detection);
            }
            _ => clusters.push(vec![detection]),
        }
        last_index = Some(min_index);
    }

    clusters
        .into_iter()
        .filter_map(|cluster| summarize(cluster, params))
        .collect()
}
