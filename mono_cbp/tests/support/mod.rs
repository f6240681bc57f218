//! Synthetic light-curve builders shared by the integration tests.
#![allow(dead_code)]

use mono_cbp::{CandidateEvent, LightCurveSeries, PipelineConfig};

#[path = "../../src/testing.rs"]
mod testing;

pub use testing::gaussian_noise;

/// A V-shaped dip of full width `width` and fractional `depth`.
#[derive(Debug, Clone, Copy)]
pub struct Dip {
    pub centre: f64,
    pub depth: f64,
    pub width: f64,
}

impl Dip {
    pub fn new(centre: f64, depth: f64, width: f64) -> Self {
        Self { centre, depth, width }
    }

    fn at(&self, t: f64) -> f64 {
        let x = (t - self.centre).abs() / (self.width / 2.0);
        if x < 1.0 {
            self.depth * (1.0 - x)
        } else {
            0.0
        }
    }
}

/// Builder for normalised synthetic light curves.
pub struct LightCurveBuilder {
    object_id: String,
    epoch_id: String,
    start: f64,
    n_points: usize,
    cadence: f64,
    sigma: f64,
    seed: u64,
    dips: Vec<Dip>,
}

impl LightCurveBuilder {
    pub fn new(object_id: &str, epoch_id: &str) -> Self {
        Self {
            object_id: object_id.to_string(),
            epoch_id: epoch_id.to_string(),
            start: 0.0,
            n_points: 2000,
            cadence: 0.01,
            sigma: 0.001,
            seed: 1,
            dips: Vec::new(),
        }
    }

    pub fn start(mut self, start: f64) -> Self {
        self.start = start;
        self
    }

    pub fn points(mut self, n_points: usize, cadence: f64) -> Self {
        self.n_points = n_points;
        self.cadence = cadence;
        self
    }

    pub fn noise(mut self, sigma: f64, seed: u64) -> Self {
        self.sigma = sigma;
        self.seed = seed;
        self
    }

    pub fn dip(mut self, dip: Dip) -> Self {
        self.dips.push(dip);
        self
    }

    pub fn build(self) -> LightCurveSeries {
        let time: Vec<f64> = (0..self.n_points)
            .map(|i| self.start + i as f64 * self.cadence)
            .collect();
        let noise = gaussian_noise(self.n_points, self.sigma, self.seed);
        let flux = time
            .iter()
            .zip(&noise)
            .map(|(&t, &e)| 1.0 - self.dips.iter().map(|d| d.at(t)).sum::<f64>() + e)
            .collect();
        LightCurveSeries::new(
            self.object_id,
            self.epoch_id,
            time,
            flux,
            vec![self.sigma; self.n_points],
        )
    }
}

/// Small detrending grid without the periodic filter, for multi-file runs.
pub fn fast_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.periodic_filter.enabled = false;
    config.detrending.window_min = 0.5;
    config.detrending.window_max = 1.0;
    config.detrending.window_step = 0.25;
    config.consensus.dependence_threshold = 3;
    config
}

/// A finished event at `time`, for exercising the batch reductions directly.
pub fn candidate(object_id: &str, epoch_id: &str, time: f64) -> CandidateEvent {
    CandidateEvent {
        object_id: object_id.to_string(),
        epoch_id: epoch_id.to_string(),
        event_time: time,
        phase: None,
        depth: 0.01,
        duration: 0.1,
        start_time: time - 0.05,
        end_time: time + 0.05,
        snr: 12.0,
        window_length: 1.0,
        n_windows: 21,
        detrending_dependent: false,
        systematics_flag: None,
    }
}
