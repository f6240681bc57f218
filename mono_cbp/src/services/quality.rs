//! Post-hoc quality predicate over finished candidate events.

use serde::{Deserialize, Serialize};

use crate::models::CandidateEvent;

/// Acceptance criteria for candidate events. Every criterion is off by
/// default, so the default filter accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityFilter {
    pub min_snr: Option<f64>,
    /// Longest accepted event duration, in days
    pub max_duration: Option<f64>,
    /// Reject events seen by too few detrending windows
    pub exclude_dependent: bool,
    /// Reject events in anomalous timing bins
    pub exclude_systematic: bool,
}

impl QualityFilter {
    pub fn accepts(&self, event: &CandidateEvent) -> bool {
        if self.min_snr.is_some_and(|min| !(event.snr >= min)) {
            return false;
        }
        if self.max_duration.is_some_and(|max| !(event.duration <= max)) {
            return false;
        }
        if self.exclude_dependent && event.detrending_dependent {
            return false;
        }
        // Unresolved flags pass
        if self.exclude_systematic && event.systematics_flag == Some(true) {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, events: &'a [CandidateEvent]) -> Vec<&'a CandidateEvent> {
        events.iter().filter(|e| self.accepts(e)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(snr: f64, duration: f64, dependent: bool, flag: Option<bool>) -> CandidateEvent {
        CandidateEvent {
            object_id: "1".into(),
            epoch_id: "s1".into(),
            event_time: 10.0,
            phase: None,
            depth: 0.01,
            duration,
            start_time: 10.0 - duration / 2.0,
            end_time: 10.0 + duration / 2.0,
            snr,
            window_length: 1.0,
            n_windows: 20,
            detrending_dependent: dependent,
            systematics_flag: flag,
        }
    }

    #[test]
    fn test_default_accepts_everything() {
        let filter = QualityFilter::default();
        assert!(filter.accepts(&event(0.1, 5.0, true, Some(true))));
    }

    #[test]
    fn test_criteria() {
        let filter = QualityFilter {
            min_snr: Some(7.0),
            max_duration: Some(1.0),
            exclude_dependent: true,
            exclude_systematic: true,
        };
        assert!(filter.accepts(&event(8.0, 0.2, false, Some(false))));
        assert!(filter.accepts(&event(8.0, 0.2, false, None)));
        assert!(!filter.accepts(&event(6.9, 0.2, false, Some(false))));
        assert!(!filter.accepts(&event(8.0, 1.5, false, Some(false))));
        assert!(!filter.accepts(&event(8.0, 0.2, true, Some(false))));
        assert!(!filter.accepts(&event(8.0, 0.2, false, Some(true))));
    }

    #[test]
    fn test_apply_does_not_mutate() {
        let events = vec![event(8.0, 0.2, false, None), event(2.0, 0.2, false, None)];
        let filter = QualityFilter {
            min_snr: Some(5.0),
            ..QualityFilter::default()
        };
        let kept = filter.apply(&events);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].snr, 8.0);
        assert_eq!(events.len(), 2);
    }
}
