use serde::{Deserialize, Serialize};

/// A single-transit candidate found in one light curve.
///
/// Fields are filled in stages: depth and timing by the threshold detector,
/// `snr` by the characterizer, `window_length`/`n_windows`/`detrending_dependent`
/// by the cross-window consensus, and `systematics_flag` last, by the
/// population-level flagger once the whole batch is in. `None` there means
/// "not yet computed" (or not computable for this epoch), never "clean".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateEvent {
    pub object_id: String,
    pub epoch_id: String,
    pub event_time: f64,
    /// Orbital phase at `event_time`, when an ephemeris or phase column exists
    pub phase: Option<f64>,
    /// Fractional flux drop below the detrended baseline
    pub depth: f64,
    pub duration: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub snr: f64,
    /// Detrending window length that produced the highest SNR
    pub window_length: f64,
    /// Number of detrending windows in which the event was detected
    pub n_windows: usize,
    pub detrending_dependent: bool,
    pub systematics_flag: Option<bool>,
}

impl CandidateEvent {
    /// Whether every pipeline stage has written to this event.
    pub fn is_finalized(&self) -> bool {
        self.systematics_flag.is_some()
    }
}

/// Time-windowed cut of a detrended light curve around one event, handed to
/// the classification collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnippet {
    pub object_id: String,
    pub epoch_id: String,
    pub event_time: f64,
    pub duration: f64,
    pub time: Vec<f64>,
    pub flux: Vec<f64>,
    pub flux_err: Vec<f64>,
}

impl EventSnippet {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}
