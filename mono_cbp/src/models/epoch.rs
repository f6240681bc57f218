use serde::{Deserialize, Serialize};

use crate::error::{ErrorContext, PipelineError, PipelineResult};

/// Observation window (sector) shared by every object monitored during it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochWindow {
    pub epoch_id: String,
    pub start: f64,
    pub end: f64,
}

impl EpochWindow {
    pub fn new(epoch_id: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            epoch_id: epoch_id.into(),
            start,
            end,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.start.is_finite() && self.end.is_finite()) || self.start >= self.end {
            return Err(PipelineError::InvalidInput {
                message: format!(
                    "epoch window must satisfy start < end, got [{}, {}]",
                    self.start, self.end
                ),
                context: ErrorContext::new("validate_epoch_window").with_epoch(&self.epoch_id),
            });
        }
        Ok(())
    }
}
