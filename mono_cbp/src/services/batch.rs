//! Batch orchestration: parallel per-file search, then the population-level
//! systematics reduction.

use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::models::{CandidateEvent, EpochWindow, EventSnippet, LightCurveSeries};
use crate::services::catalogue::EclipseCatalogue;
use crate::services::systematics::{apply_histograms, build_histograms, SystematicsSummary};
use crate::services::transit_finder::{FileResult, TransitFinder};

/// A light curve that could not be processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileFailure {
    pub object_id: String,
    pub epoch_id: String,
    pub error: String,
}

/// Per-file bookkeeping kept in a batch result (events are pooled).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub object_id: String,
    pub epoch_id: String,
    pub checksum: String,
    pub periodic_window: Option<f64>,
    pub windows_succeeded: usize,
    pub windows_failed: usize,
    pub n_events: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    /// Sorted by epoch, object and event time
    pub events: Vec<CandidateEvent>,
    pub snippets: Vec<EventSnippet>,
    /// In input order
    pub files: Vec<FileSummary>,
    pub failures: Vec<FileFailure>,
    pub systematics: SystematicsSummary,
}

pub struct BatchRunner {
    finder: TransitFinder,
}

impl BatchRunner {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            finder: TransitFinder::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        self.finder.config()
    }

    /// Search every light curve, then resolve systematics flags across the
    /// whole batch.
    ///
    /// A failing file is recorded in `failures` and contributes nothing else.
    pub fn run(
        &self,
        series: &[LightCurveSeries],
        catalogue: &dyn EclipseCatalogue,
        epochs: &[EpochWindow],
    ) -> BatchResult {
        let outcomes: Vec<Result<FileResult, FileFailure>> = series
            .par_iter()
            .map(|lc| {
                let eclipse = catalogue.lookup(&lc.object_id);
                if eclipse.is_none() && lc.eclipse_mask.is_none() {
                    info!("{}: not in eclipse catalogue, searching without ephemeris", lc.object_id);
                }
                self.finder.process(lc, eclipse.as_ref()).map_err(|e| {
                    warn!("{} / {} failed: {}", lc.object_id, lc.epoch_id, e);
                    FileFailure {
                        object_id: lc.object_id.clone(),
                        epoch_id: lc.epoch_id.clone(),
                        error: e.to_string(),
                    }
                })
            })
            .collect();

        let mut events = Vec::new();
        let mut snippets = Vec::new();
        let mut files = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(result) => {
                    files.push(FileSummary {
                        object_id: result.object_id,
                        epoch_id: result.epoch_id,
                        checksum: result.checksum,
                        periodic_window: result.periodic_window,
                        windows_succeeded: result.windows_succeeded,
                        windows_failed: result.windows_failed,
                        n_events: result.events.len(),
                    });
                    events.extend(result.events);
                    snippets.extend(result.snippets);
                }
                Err(failure) => failures.push(failure),
            }
        }

        let histograms = build_histograms(&events, epochs, &self.config().systematics);
        let systematics = apply_histograms(&mut events, histograms);

        events.sort_by(|a, b| {
            a.epoch_id
                .cmp(&b.epoch_id)
                .then_with(|| a.object_id.cmp(&b.object_id))
                .then_with(|| a.event_time.total_cmp(&b.event_time))
        });

        info!(
            "batch complete: {} files, {} failed, {} events ({} flagged as systematics)",
            series.len(),
            failures.len(),
            events.len(),
            systematics.flagged
        );

        BatchResult {
            events,
            snippets,
            files,
            failures,
            systematics,
        }
    }
}
