//! Single-light-curve pipeline.
//!
//! Runs eclipse masking, the periodic-trend filter, the detrending grid, the
//! threshold search under every detrending window, and the cross-window
//! consensus. The batch-level systematics flag is left unresolved.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::algorithms::consensus::{build_consensus, ConsensusEvent, WindowDetection};
use crate::algorithms::detrend::{detrend_grid, DetrendedVariant};
use crate::algorithms::monofind::monofind;
use crate::algorithms::noise::{global_mad_sigma, rolling_mad, NoiseEstimate, NoiseModel};
use crate::algorithms::periodic_filter::periodic_filter;
use crate::algorithms::stats::median_cadence;
use crate::checksum::light_curve_checksum;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::models::{CandidateEvent, EclipseParameters, EventSnippet, LightCurveSeries};
use crate::services::characterize::{event_significance, extract_snippet};

/// Everything found in one light curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileResult {
    pub object_id: String,
    pub epoch_id: String,
    pub checksum: String,
    /// Accepted periodic-filter window; `None` when the filter was skipped
    /// or fell back to the unfiltered flux
    pub periodic_window: Option<f64>,
    pub windows_succeeded: usize,
    pub windows_failed: usize,
    pub events: Vec<CandidateEvent>,
    pub snippets: Vec<EventSnippet>,
}

/// Flux after eclipse masking and the periodic filter.
struct PreparedFlux {
    flux: Vec<f64>,
    /// Multiplicative trend already divided out of `flux`
    trend: Vec<f64>,
    periodic_window: Option<f64>,
}

/// Per-window inputs to the threshold search.
struct SearchVariant {
    window_length: f64,
    flat_flux: Vec<f64>,
    flux_err: Vec<f64>,
}

pub struct TransitFinder {
    config: PipelineConfig,
}

impl TransitFinder {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Search one light curve.
    ///
    /// # Errors
    /// `InvalidInput` when the series or the supplied ephemeris is malformed.
    /// A light curve without events is a successful, empty result.
    pub fn process(
        &self,
        series: &LightCurveSeries,
        eclipse: Option<&EclipseParameters>,
    ) -> PipelineResult<FileResult> {
        let tag = |e: PipelineError| e.with_series(&series.object_id, &series.epoch_id);
        series.validate()?;
        if let Some(params) = eclipse {
            params.validate().map_err(tag)?;
        }

        let phases = series
            .phase
            .clone()
            .or_else(|| eclipse.map(|p| p.phases(&series.time)));
        let mask = self.eclipse_mask(series, phases.as_deref(), eclipse);

        let prepared = self.apply_periodic_filter(series, mask.as_deref())?;
        let variants = detrend_grid(
            &series.time,
            &prepared.flux,
            mask.as_deref(),
            &self.config.detrend_params(),
        );
        let windows_succeeded = variants.iter().filter(|v| v.succeeded).count();
        let windows_failed = variants.len() - windows_succeeded;

        let cadence = match self.config.transit_finding.cadence {
            Some(c) => c,
            None => median_cadence(&series.time).ok_or_else(|| {
                tag(PipelineError::insufficient_data("cannot determine cadence"))
            })?,
        };

        let search: Vec<SearchVariant> = variants
            .into_iter()
            .filter(|v| v.succeeded)
            .map(|v| self.search_variant(series, &prepared, mask.as_deref(), v))
            .collect();

        let mut detections = Vec::new();
        for variant in &search {
            detections.extend(self.detect(series, variant, cadence));
        }
        let consensus = build_consensus(detections, &self.config.consensus_params());

        let events: Vec<CandidateEvent> = consensus
            .iter()
            .map(|c| candidate(series, phases.as_deref(), c))
            .collect();

        let snippets = if self.config.transit_finding.generate_event_snippets {
            consensus
                .iter()
                .filter_map(|c| self.snippet(series, &search, c))
                .collect()
        } else {
            Vec::new()
        };

        info!(
            "{} / {}: {} events from {} windows ({} failed)",
            series.object_id,
            series.epoch_id,
            events.len(),
            windows_succeeded,
            windows_failed
        );

        Ok(FileResult {
            object_id: series.object_id.clone(),
            epoch_id: series.epoch_id.clone(),
            checksum: light_curve_checksum(series),
            periodic_window: prepared.periodic_window,
            windows_succeeded,
            windows_failed,
            events,
            snippets,
        })
    }

    fn eclipse_mask(
        &self,
        series: &LightCurveSeries,
        phases: Option<&[f64]>,
        eclipse: Option<&EclipseParameters>,
    ) -> Option<Vec<bool>> {
        if let Some(mask) = &series.eclipse_mask {
            return Some(mask.clone());
        }
        match (phases, eclipse) {
            (Some(phases), Some(params)) => Some(params.mask(phases)),
            _ => {
                debug!(
                    "{} / {}: no eclipse geometry, searching without a mask",
                    series.object_id, series.epoch_id
                );
                None
            }
        }
    }

    fn apply_periodic_filter(
        &self,
        series: &LightCurveSeries,
        mask: Option<&[bool]>,
    ) -> PipelineResult<PreparedFlux> {
        let unfiltered = || PreparedFlux {
            flux: series.flux.clone(),
            trend: vec![1.0; series.len()],
            periodic_window: None,
        };
        if !self.config.periodic_filter.enabled {
            return Ok(unfiltered());
        }

        match periodic_filter(
            &series.time,
            &series.flux,
            &series.flux_err,
            mask,
            &self.config.periodic_filter_params(),
        ) {
            Ok(result) => {
                debug!(
                    "{} / {}: periodic filter accepted window {:.3} (FAP {:.3e})",
                    series.object_id, series.epoch_id, result.window_length, result.fap
                );
                Ok(PreparedFlux {
                    flux: result.residual,
                    trend: result.trend,
                    periodic_window: Some(result.window_length),
                })
            }
            Err(e) if e.is_recoverable() => {
                warn!(
                    "{} / {}: {}; continuing with unfiltered flux",
                    series.object_id, series.epoch_id, e
                );
                Ok(unfiltered())
            }
            Err(e) => Err(e.with_series(&series.object_id, &series.epoch_id)),
        }
    }

    /// Apply eclipse exclusion and normalise errors by the combined trend.
    fn search_variant(
        &self,
        series: &LightCurveSeries,
        prepared: &PreparedFlux,
        mask: Option<&[bool]>,
        variant: DetrendedVariant,
    ) -> SearchVariant {
        let mut flat_flux = variant.flat_flux;
        if self.config.transit_finding.exclude_eclipses {
            if let Some(mask) = mask {
                for (f, &masked) in flat_flux.iter_mut().zip(mask) {
                    if masked {
                        *f = f64::NAN;
                    }
                }
            }
        }

        let flux_err = series
            .flux_err
            .iter()
            .zip(&prepared.trend)
            .zip(&variant.trend)
            .map(|((&e, &p), &d)| e / (p * d))
            .collect();

        SearchVariant {
            window_length: variant.window_length,
            flat_flux,
            flux_err,
        }
    }

    fn detect(
        &self,
        series: &LightCurveSeries,
        variant: &SearchVariant,
        cadence: f64,
    ) -> Vec<WindowDetection> {
        let tf = &self.config.transit_finding;
        let noise = match tf.noise {
            NoiseModel::Variable => rolling_mad(&variant.flat_flux, tf.noise_window).map(NoiseEstimate::Variable),
            NoiseModel::Constant => global_mad_sigma(&variant.flat_flux).map(NoiseEstimate::Constant),
        };
        let found = noise.and_then(|noise| {
            monofind(&series.time, &variant.flat_flux, &noise, &self.config.monofind_params())
        });
        let found = match found {
            Ok(found) => found,
            Err(e) => {
                debug!(
                    "{} / {}: window {:.3} skipped: {}",
                    series.object_id, series.epoch_id, variant.window_length, e
                );
                return Vec::new();
            }
        };

        found
            .events
            .into_iter()
            .filter_map(|event| match event_significance(&event, &variant.flux_err, cadence) {
                Some(sig) => Some(WindowDetection {
                    window_length: variant.window_length,
                    event,
                    snr: sig.snr,
                    flux_err: sig.flux_err,
                }),
                None => {
                    debug!(
                        "{} / {}: dropped detection at {:.4} (window {:.3}) without a valid error",
                        series.object_id, series.epoch_id, event.event_time, variant.window_length
                    );
                    None
                }
            })
            .collect()
    }

    fn snippet(
        &self,
        series: &LightCurveSeries,
        search: &[SearchVariant],
        consensus: &ConsensusEvent,
    ) -> Option<EventSnippet> {
        let detection = &consensus.representative;
        let variant = search
            .iter()
            .find(|v| v.window_length == detection.window_length)?;
        Some(extract_snippet(
            &series.object_id,
            &series.epoch_id,
            detection.event.event_time,
            detection.event.duration,
            &series.time,
            &variant.flat_flux,
            &variant.flux_err,
            self.config.transit_finding.snippet_half_width,
        ))
    }
}

fn candidate(
    series: &LightCurveSeries,
    phases: Option<&[f64]>,
    consensus: &ConsensusEvent,
) -> CandidateEvent {
    let event = &consensus.representative.event;
    CandidateEvent {
        object_id: series.object_id.clone(),
        epoch_id: series.epoch_id.clone(),
        event_time: event.event_time,
        phase: phases.and_then(|p| p.get(event.centre_index).copied()),
        depth: event.depth,
        duration: event.duration,
        start_time: event.start_time,
        end_time: event.end_time,
        snr: consensus.representative.snr,
        window_length: consensus.representative.window_length,
        n_windows: consensus.n_windows,
        detrending_dependent: consensus.detrending_dependent,
        systematics_flag: None,
    }
}

#[cfg(test)]
#[path = "transit_finder_tests.rs"]
mod tests;
