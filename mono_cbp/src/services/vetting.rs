//! Drives an external classifier over event snippets.

use std::fmt;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::error::PipelineResult;
use crate::models::EventSnippet;

/// Label assigned to a snippet by a classifier.
///
/// Labels are open-ended strings; `"T"` (transit) and `"AT"` (asymmetric
/// transit) count as transit-like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassificationLabel(pub String);

impl ClassificationLabel {
    pub const TRANSIT: &'static str = "T";
    pub const ASYMMETRIC_TRANSIT: &'static str = "AT";

    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_transit_like(&self) -> bool {
        matches!(self.0.as_str(), Self::TRANSIT | Self::ASYMMETRIC_TRANSIT)
    }
}

impl fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification collaborator.
pub trait EventClassifier {
    fn classify(&self, snippet: &EventSnippet) -> PipelineResult<ClassificationLabel>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VettingResult {
    pub object_id: String,
    pub epoch_id: String,
    pub event_time: f64,
    pub label: ClassificationLabel,
}

/// Classify every snippet. Failed classifications are logged and skipped.
pub fn vet_snippets<C: EventClassifier + ?Sized>(
    classifier: &C,
    snippets: &[EventSnippet],
) -> Vec<VettingResult> {
    let results: Vec<VettingResult> = snippets
        .iter()
        .filter_map(|snippet| match classifier.classify(snippet) {
            Ok(label) => Some(VettingResult {
                object_id: snippet.object_id.clone(),
                epoch_id: snippet.epoch_id.clone(),
                event_time: snippet.event_time,
                label,
            }),
            Err(e) => {
                warn!(
                    "classification failed for {} / {} at {:.4}: {}",
                    snippet.object_id, snippet.epoch_id, snippet.event_time, e
                );
                None
            }
        })
        .collect();

    let transit_like = results.iter().filter(|r| r.label.is_transit_like()).count();
    info!(
        "vetted {} of {} snippets, {} transit-like",
        results.len(),
        snippets.len(),
        transit_like
    );
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    /// Calls anything deeper than 1% a transit; fails on empty snippets.
    struct DepthClassifier;

    impl EventClassifier for DepthClassifier {
        fn classify(&self, snippet: &EventSnippet) -> PipelineResult<ClassificationLabel> {
            let min = snippet.flux.iter().copied().fold(f64::INFINITY, f64::min);
            if !min.is_finite() {
                return Err(PipelineError::classification("empty snippet"));
            }
            Ok(ClassificationLabel::new(if min < 0.99 { "T" } else { "N" }))
        }
    }

    fn snippet(event_time: f64, flux: Vec<f64>) -> EventSnippet {
        let n = flux.len();
        EventSnippet {
            object_id: "5".into(),
            epoch_id: "s9".into(),
            event_time,
            duration: 0.1,
            time: (0..n).map(|i| event_time + i as f64 * 0.01).collect(),
            flux,
            flux_err: vec![0.001; n],
        }
    }

    #[test]
    fn test_labels() {
        assert!(ClassificationLabel::new("T").is_transit_like());
        assert!(ClassificationLabel::new("AT").is_transit_like());
        assert!(!ClassificationLabel::new("EB").is_transit_like());
        assert_eq!(ClassificationLabel::new("AT").to_string(), "AT");
    }

    #[test]
    fn test_failures_skipped() {
        let snippets = vec![
            snippet(1.0, vec![1.0, 0.98, 1.0]),
            snippet(2.0, vec![]),
            snippet(3.0, vec![1.0, 0.999]),
        ];
        let results = vet_snippets(&DepthClassifier, &snippets);
        assert_eq!(results.len(), 2);
        assert!(results[0].label.is_transit_like());
        assert_eq!(results[1].event_time, 3.0);
        assert_eq!(results[1].label.as_str(), "N");
    }

    #[test]
    fn test_label_serializes_as_string() {
        let json = serde_json::to_string(&ClassificationLabel::new("AT")).unwrap();
        assert_eq!(json, "\"AT\"");
    }
}
