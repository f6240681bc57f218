use serde::{Deserialize, Deserializer, Serialize};

use crate::algorithms::phase::{eclipse_mask, phase_series};
use crate::error::{ErrorContext, PipelineError, PipelineResult};

/// Orbital ephemeris and eclipse geometry of an eclipsing binary.
///
/// Positions and widths are in phase units. A missing secondary eclipse is
/// encoded as NaN position/width, which produces an empty mask.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EclipseParameters {
    pub period: f64,
    pub reference_epoch: f64,
    pub primary_position: f64,
    pub primary_width: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub secondary_position: f64,
    #[serde(default = "nan", deserialize_with = "nan_if_null")]
    pub secondary_width: f64,
}

fn nan() -> f64 {
    f64::NAN
}

/// NaN serializes to JSON `null`; read it back as NaN.
fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

fn in_unit_interval(value: f64) -> bool {
    (0.0..1.0).contains(&value)
}

fn valid_width(width: f64) -> bool {
    width > 0.0 && width < 1.0
}

impl EclipseParameters {
    /// Check the ephemeris ranges.
    ///
    /// The period must be positive and finite. Each eclipse is either absent
    /// (NaN position or width) or has `position ∈ [0, 1)` and `width ∈ (0, 1)`.
    /// The primary eclipse must be present.
    pub fn validate(&self) -> PipelineResult<()> {
        let fail = |message: String| {
            Err(PipelineError::InvalidInput {
                message,
                context: ErrorContext::new("validate_eclipse_parameters"),
            })
        };

        if !(self.period.is_finite() && self.period > 0.0) {
            return fail(format!("period must be positive, got {}", self.period));
        }
        if !self.reference_epoch.is_finite() {
            return fail("reference_epoch is not finite".to_string());
        }
        if !in_unit_interval(self.primary_position) || !valid_width(self.primary_width) {
            return fail(format!(
                "primary eclipse out of range: position={}, width={}",
                self.primary_position, self.primary_width
            ));
        }
        if self.has_secondary()
            && (!in_unit_interval(self.secondary_position) || !valid_width(self.secondary_width))
        {
            return fail(format!(
                "secondary eclipse out of range: position={}, width={}",
                self.secondary_position, self.secondary_width
            ));
        }
        Ok(())
    }

    /// Whether a secondary eclipse is defined.
    pub fn has_secondary(&self) -> bool {
        !(self.secondary_position.is_nan() || self.secondary_width.is_nan())
    }

    /// Orbital phase of each time stamp, folded with the default centre.
    pub fn phases(&self, times: &[f64]) -> Vec<f64> {
        phase_series(times, self.period, self.reference_epoch, 0.5)
    }

    /// Combined primary/secondary in-eclipse mask for the given phases.
    pub fn mask(&self, phases: &[f64]) -> Vec<bool> {
        let primary = eclipse_mask(phases, self.primary_position, self.primary_width);
        let secondary = eclipse_mask(phases, self.secondary_position, self.secondary_width);
        primary
            .into_iter()
            .zip(secondary)
            .map(|(p, s)| p || s)
            .collect()
    }
}
