//! Pipeline configuration file support.
//!
//! Every section and field is optional in TOML; missing values take the
//! defaults below.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::algorithms::consensus::ConsensusParams;
use crate::algorithms::detrend::DetrendParams;
use crate::algorithms::monofind::MonofindParams;
use crate::algorithms::noise::NoiseModel;
use crate::algorithms::periodic_filter::PeriodicFilterParams;
use crate::algorithms::periodogram::FrequencyGrid;
use crate::algorithms::stats::window_grid;
use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::services::quality::QualityFilter;

/// Full pipeline configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub transit_finding: TransitFindingConfig,
    pub periodic_filter: PeriodicFilterConfig,
    pub detrending: DetrendingConfig,
    pub consensus: ConsensusConfig,
    pub systematics: SystematicsConfig,
    pub quality: QualityFilter,
}

/// Threshold search and event output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitFindingConfig {
    #[serde(default = "default_mad_threshold")]
    pub mad_threshold: f64,
    #[serde(default = "default_extent_threshold")]
    pub extent_threshold: f64,
    #[serde(default = "default_break_tolerance")]
    pub break_tolerance: f64,
    #[serde(default = "default_min_event_points")]
    pub min_event_points: usize,
    /// Observing cadence in days; the median time step when unset
    #[serde(default)]
    pub cadence: Option<f64>,
    #[serde(default = "default_true")]
    pub exclude_eclipses: bool,
    #[serde(default)]
    pub noise: NoiseModel,
    #[serde(default = "default_noise_window")]
    pub noise_window: usize,
    #[serde(default = "default_true")]
    pub generate_event_snippets: bool,
    #[serde(default = "default_snippet_half_width")]
    pub snippet_half_width: f64,
}

fn default_mad_threshold() -> f64 {
    3.0
}

fn default_extent_threshold() -> f64 {
    1.0
}

fn default_break_tolerance() -> f64 {
    0.5
}

fn default_min_event_points() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_noise_window() -> usize {
    100
}

fn default_snippet_half_width() -> f64 {
    1.0
}

impl Default for TransitFindingConfig {
    fn default() -> Self {
        Self {
            mad_threshold: default_mad_threshold(),
            extent_threshold: default_extent_threshold(),
            break_tolerance: default_break_tolerance(),
            min_event_points: default_min_event_points(),
            cadence: None,
            exclude_eclipses: true,
            noise: NoiseModel::default(),
            noise_window: default_noise_window(),
            generate_event_snippets: true,
            snippet_half_width: default_snippet_half_width(),
        }
    }
}

/// Periodic-trend filter settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodicFilterConfig {
    pub enabled: bool,
    pub window_min: f64,
    pub window_max: f64,
    pub window_step: f64,
    pub fap_threshold: f64,
    pub poly_order: usize,
    pub robust_iterations: usize,
    pub clip_sigma: f64,
    pub oversampling: f64,
    pub max_frequencies: usize,
    pub min_period: Option<f64>,
}

impl Default for PeriodicFilterConfig {
    fn default() -> Self {
        let params = PeriodicFilterParams::default();
        Self {
            enabled: true,
            window_min: params.window_min,
            window_max: params.window_max,
            window_step: params.window_step,
            fap_threshold: params.fap_threshold,
            poly_order: params.poly_order,
            robust_iterations: params.robust_iterations,
            clip_sigma: params.clip_sigma,
            oversampling: params.frequency_grid.oversampling,
            max_frequencies: params.frequency_grid.max_frequencies,
            min_period: params.frequency_grid.min_period,
        }
    }
}

/// Robust local detrender settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetrendingConfig {
    pub window_min: f64,
    pub window_max: f64,
    pub window_step: f64,
    pub edge_cutoff: f64,
    pub biweight_constant: f64,
    pub max_iterations: usize,
    pub min_window_points: usize,
    pub min_valid_fraction: f64,
    pub parallel: bool,
}

impl Default for DetrendingConfig {
    fn default() -> Self {
        let params = DetrendParams::default();
        Self {
            window_min: params.window_min,
            window_max: params.window_max,
            window_step: params.window_step,
            edge_cutoff: params.edge_cutoff,
            biweight_constant: params.biweight_constant,
            max_iterations: params.max_iterations,
            min_window_points: params.min_window_points,
            min_valid_fraction: params.min_valid_fraction,
            parallel: params.parallel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusConfig {
    pub index_tolerance: usize,
    pub dependence_threshold: usize,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        let params = ConsensusParams::default();
        Self {
            index_tolerance: params.index_tolerance,
            dependence_threshold: params.dependence_threshold,
        }
    }
}

/// Population-level timing histogram settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystematicsConfig {
    /// Histogram bin width in days
    pub bin_width: f64,
    /// A bin is anomalous above this multiple of the expected count
    pub excess_factor: f64,
    pub min_bin_count: usize,
}

impl Default for SystematicsConfig {
    fn default() -> Self {
        Self {
            bin_width: 0.5,
            excess_factor: 5.0,
            min_bin_count: 3,
        }
    }
}

fn invalid(field: &str, message: String) -> PipelineError {
    PipelineError::Configuration {
        message,
        context: ErrorContext::new("validate_config").with_details(field),
    }
}

fn check_grid(section: &str, min: f64, max: f64, step: f64) -> PipelineResult<()> {
    if !(min > 0.0) || window_grid(min, max, step).is_empty() {
        return Err(invalid(
            section,
            format!("invalid window grid [{}, {}] step {}", min, max, step),
        ));
    }
    Ok(())
}

impl PipelineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::io(format!("Failed to read config file {}", path.display()), e)
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        let config: PipelineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges across all sections.
    pub fn validate(&self) -> PipelineResult<()> {
        self.monofind_params().validate()?;

        let tf = &self.transit_finding;
        if let Some(cadence) = tf.cadence {
            if !(cadence > 0.0) {
                return Err(invalid("transit_finding.cadence", format!(
                    "cadence must be positive, got {}",
                    cadence
                )));
            }
        }
        if tf.noise_window < 2 {
            return Err(invalid(
                "transit_finding.noise_window",
                format!("noise_window must be at least 2, got {}", tf.noise_window),
            ));
        }
        if !(tf.snippet_half_width > 0.0) {
            return Err(invalid(
                "transit_finding.snippet_half_width",
                format!("snippet_half_width must be positive, got {}", tf.snippet_half_width),
            ));
        }

        let pf = &self.periodic_filter;
        check_grid("periodic_filter", pf.window_min, pf.window_max, pf.window_step)?;
        if !(pf.fap_threshold > 0.0 && pf.fap_threshold < 1.0) {
            return Err(invalid(
                "periodic_filter.fap_threshold",
                format!("fap_threshold must lie in (0, 1), got {}", pf.fap_threshold),
            ));
        }
        if !(pf.clip_sigma > 0.0) || !(pf.oversampling >= 1.0) || pf.max_frequencies < 2 {
            return Err(invalid(
                "periodic_filter",
                "clip_sigma must be positive, oversampling >= 1 and max_frequencies >= 2"
                    .to_string(),
            ));
        }

        let dt = &self.detrending;
        check_grid("detrending", dt.window_min, dt.window_max, dt.window_step)?;
        if !(dt.edge_cutoff >= 0.0) || !(dt.biweight_constant > 0.0) {
            return Err(invalid(
                "detrending",
                "edge_cutoff must be non-negative and biweight_constant positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&dt.min_valid_fraction) {
            return Err(invalid(
                "detrending.min_valid_fraction",
                format!("min_valid_fraction must lie in [0, 1], got {}", dt.min_valid_fraction),
            ));
        }

        if self.consensus.dependence_threshold == 0 {
            return Err(invalid(
                "consensus.dependence_threshold",
                "dependence_threshold must be at least 1".to_string(),
            ));
        }

        let sy = &self.systematics;
        if !(sy.bin_width > 0.0) || !(sy.excess_factor > 0.0) {
            return Err(invalid(
                "systematics",
                format!(
                    "bin_width and excess_factor must be positive, got {} and {}",
                    sy.bin_width, sy.excess_factor
                ),
            ));
        }
        Ok(())
    }

    pub fn monofind_params(&self) -> MonofindParams {
        let tf = &self.transit_finding;
        MonofindParams {
            mad_multiplier: tf.mad_threshold,
            extent_multiplier: tf.extent_threshold,
            break_tolerance: tf.break_tolerance,
            min_event_points: tf.min_event_points,
        }
    }

    pub fn periodic_filter_params(&self) -> PeriodicFilterParams {
        let pf = &self.periodic_filter;
        PeriodicFilterParams {
            window_min: pf.window_min,
            window_max: pf.window_max,
            window_step: pf.window_step,
            fap_threshold: pf.fap_threshold,
            poly_order: pf.poly_order,
            robust_iterations: pf.robust_iterations,
            clip_sigma: pf.clip_sigma,
            break_tolerance: self.transit_finding.break_tolerance,
            frequency_grid: FrequencyGrid {
                oversampling: pf.oversampling,
                max_frequencies: pf.max_frequencies,
                min_period: pf.min_period,
            },
        }
    }

    pub fn detrend_params(&self) -> DetrendParams {
        let dt = &self.detrending;
        DetrendParams {
            window_min: dt.window_min,
            window_max: dt.window_max,
            window_step: dt.window_step,
            edge_cutoff: dt.edge_cutoff,
            biweight_constant: dt.biweight_constant,
            max_iterations: dt.max_iterations,
            min_window_points: dt.min_window_points,
            min_valid_fraction: dt.min_valid_fraction,
            break_tolerance: self.transit_finding.break_tolerance,
            parallel: dt.parallel,
        }
    }

    pub fn consensus_params(&self) -> ConsensusParams {
        ConsensusParams {
            index_tolerance: self.consensus.index_tolerance,
            dependence_threshold: self.consensus.dependence_threshold,
        }
    }
}

/// Input and output locations for the batch binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Directory scanned for `*.json` light curves
    pub data_dir: PathBuf,
    /// JSON eclipse catalogue
    pub catalogue: Option<PathBuf>,
    /// JSON epoch boundaries
    pub epochs: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("results")
}

/// Configuration file of the `mono-cbp` binary: pipeline settings plus paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub paths: PathsConfig,
    #[serde(flatten)]
    pub pipeline: PipelineConfig,
}

impl RunConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::io(format!("Failed to read config file {}", path.display()), e)
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> PipelineResult<Self> {
        let config: RunConfig = toml::from_str(content)?;
        config.pipeline.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.transit_finding.mad_threshold, 3.0);
        assert_eq!(config.transit_finding.noise, NoiseModel::Variable);
        assert_eq!(config.monofind_params(), MonofindParams::default());
        assert_eq!(config.monofind_params().min_event_points, 3);
        assert_eq!(config.detrend_params().windows().len(), 21);
        assert_eq!(config.consensus.dependence_threshold, 18);
        assert!(config.periodic_filter.enabled);
    }

    #[test]
    fn test_partial_sections() {
        let toml = r#"
[transit_finding]
mad_threshold = 4.5
noise = "constant"
cadence = 0.0208

[detrending]
window_max = 1.5
parallel = false

[consensus]
dependence_threshold = 5
"#;
        let config = PipelineConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.transit_finding.mad_threshold, 4.5);
        assert_eq!(config.transit_finding.extent_threshold, 1.0);
        assert_eq!(config.transit_finding.noise, NoiseModel::Constant);
        assert_eq!(config.transit_finding.cadence, Some(0.0208));
        assert_eq!(config.detrend_params().windows().len(), 11);
        assert!(!config.detrending.parallel);
        assert_eq!(config.consensus_params().dependence_threshold, 5);
        assert_eq!(config.consensus_params().index_tolerance, 10);
    }

    #[test]
    fn test_break_tolerance_is_shared() {
        let config = PipelineConfig::from_toml_str("[transit_finding]\nbreak_tolerance = 0.25").unwrap();
        assert_eq!(config.monofind_params().break_tolerance, 0.25);
        assert_eq!(config.detrend_params().break_tolerance, 0.25);
        assert_eq!(config.periodic_filter_params().break_tolerance, 0.25);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        for toml in [
            "[transit_finding]\nextent_threshold = 5.0",
            "[transit_finding]\ncadence = -1.0",
            "[periodic_filter]\nwindow_min = 3.0\nwindow_max = 1.0",
            "[periodic_filter]\nfap_threshold = 1.5",
            "[detrending]\nwindow_step = 0.0",
            "[systematics]\nbin_width = 0.0",
        ] {
            let err = PipelineConfig::from_toml_str(toml).unwrap_err();
            assert!(
                matches!(err, PipelineError::Configuration { .. }),
                "{} -> {:?}",
                toml,
                err
            );
        }
    }

    #[test]
    fn test_malformed_toml() {
        let err = PipelineConfig::from_toml_str("[transit_finding\nmad = ").unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
    }

    #[test]
    fn test_run_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[paths]
data_dir = "data/lc"
catalogue = "data/catalogue.json"

[transit_finding]
mad_threshold = 3.5
"#
        )
        .unwrap();

        let config = RunConfig::from_file(file.path()).unwrap();
        assert_eq!(config.paths.data_dir, PathBuf::from("data/lc"));
        assert_eq!(config.paths.output_dir, PathBuf::from("results"));
        assert!(config.paths.epochs.is_none());
        assert_eq!(config.pipeline.transit_finding.mad_threshold, 3.5);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PipelineConfig::from_file("/nonexistent/mono_cbp.toml").unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }
}
