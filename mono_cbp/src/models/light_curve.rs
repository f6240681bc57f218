use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ErrorContext, PipelineError, PipelineResult};

/// Fewest samples a light curve may hold and still be searched.
pub const MIN_SERIES_POINTS: usize = 3;

/// Time-ordered brightness measurements of one object during one epoch.
///
/// `time` must be finite and strictly increasing; `flux` and `flux_err` may
/// contain NaN for missing measurements. Optional `phase` and `eclipse_mask`
/// bypass the phase/eclipse calculator when supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightCurveSeries {
    pub object_id: String,
    pub epoch_id: String,
    pub time: Vec<f64>,
    #[serde(deserialize_with = "nullable_f64s")]
    pub flux: Vec<f64>,
    #[serde(deserialize_with = "nullable_f64s")]
    pub flux_err: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eclipse_mask: Option<Vec<bool>>,
}

/// JSON has no NaN, so missing measurements arrive as `null`.
fn nullable_f64s<'de, D>(deserializer: D) -> Result<Vec<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
    Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
}

impl LightCurveSeries {
    /// Create a series without precomputed phase or eclipse mask.
    pub fn new(
        object_id: impl Into<String>,
        epoch_id: impl Into<String>,
        time: Vec<f64>,
        flux: Vec<f64>,
        flux_err: Vec<f64>,
    ) -> Self {
        Self {
            object_id: object_id.into(),
            epoch_id: epoch_id.into(),
            time,
            flux,
            flux_err,
            phase: None,
            eclipse_mask: None,
        }
    }

    /// Attach a precomputed phase sequence.
    pub fn with_phase(mut self, phase: Vec<f64>) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attach a precomputed in-eclipse mask.
    pub fn with_eclipse_mask(mut self, mask: Vec<bool>) -> Self {
        self.eclipse_mask = Some(mask);
        self
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Check the structural invariants of the series.
    ///
    /// # Errors
    /// Returns `PipelineError::InvalidInput` when identifiers are empty,
    /// sequence lengths differ, the series is too short, or `time` is not
    /// finite and strictly increasing.
    pub fn validate(&self) -> PipelineResult<()> {
        let fail = |message: String| {
            Err(PipelineError::InvalidInput {
                message,
                context: ErrorContext::new("validate_light_curve")
                    .with_object(&self.object_id)
                    .with_epoch(&self.epoch_id),
            })
        };

        if self.object_id.trim().is_empty() {
            return fail("object_id is empty".to_string());
        }
        if self.epoch_id.trim().is_empty() {
            return fail("epoch_id is empty".to_string());
        }

        let n = self.time.len();
        if self.flux.len() != n || self.flux_err.len() != n {
            return fail(format!(
                "length mismatch: time={}, flux={}, flux_err={}",
                n,
                self.flux.len(),
                self.flux_err.len()
            ));
        }
        if let Some(ref phase) = self.phase {
            if phase.len() != n {
                return fail(format!("phase length {} != time length {}", phase.len(), n));
            }
        }
        if let Some(ref mask) = self.eclipse_mask {
            if mask.len() != n {
                return fail(format!(
                    "eclipse_mask length {} != time length {}",
                    mask.len(),
                    n
                ));
            }
        }
        if n < MIN_SERIES_POINTS {
            return fail(format!(
                "series has {} points, need at least {}",
                n, MIN_SERIES_POINTS
            ));
        }
        if let Some(i) = self.time.iter().position(|t| !t.is_finite()) {
            return fail(format!("non-finite time at index {}", i));
        }
        if let Some(i) = self.time.windows(2).position(|w| w[1] <= w[0]) {
            return fail(format!("time not strictly increasing at index {}", i + 1));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> LightCurveSeries {
        let time: Vec<f64> = (0..n).map(|i| i as f64 * 0.01).collect();
        LightCurveSeries::new("1", "s01", time, vec![1.0; n], vec![0.001; n])
    }

    #[test]
    fn test_validate_ok() {
        assert!(series(10).validate().is_ok());
    }

    #[test]
    fn test_validate_length_mismatch() {
        let mut lc = series(10);
        lc.flux.pop();
        let err = lc.validate().unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput { .. }));
        assert_eq!(err.context().object_id.as_deref(), Some("1"));
    }

    #[test]
    fn test_validate_unsorted_time() {
        let mut lc = series(10);
        lc.time.swap(3, 4);
        assert!(lc.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_time() {
        let mut lc = series(10);
        lc.time[5] = lc.time[4];
        assert!(lc.validate().is_err());
    }

    #[test]
    fn test_validate_mask_length() {
        let lc = series(10).with_eclipse_mask(vec![false; 9]);
        assert!(lc.validate().is_err());
    }

    #[test]
    fn test_validate_too_short_and_empty_id() {
        assert!(series(2).validate().is_err());
        let mut lc = series(10);
        lc.object_id = " ".into();
        assert!(lc.validate().is_err());
    }

    #[test]
    fn test_deserialize_null_flux_as_nan() {
        let json = r#"{
            "object_id": "7", "epoch_id": "3",
            "time": [0.0, 0.1, 0.2],
            "flux": [1.0, null, 0.99],
            "flux_err": [0.01, 0.01, null]
        }"#;
        let lc: LightCurveSeries = serde_json::from_str(json).unwrap();
        assert!(lc.flux[1].is_nan());
        assert!(lc.flux_err[2].is_nan());
        assert!(lc.phase.is_none());
        assert!(lc.validate().is_ok());
    }

    #[test]
    fn test_deserialize_missing_column_fails() {
        let json = r#"{"object_id": "7", "epoch_id": "3", "time": [0.0], "flux": [1.0]}"#;
        assert!(serde_json::from_str::<LightCurveSeries>(json).is_err());
    }
}
