//! mono-cbp batch driver
//!
//! Searches every JSON light curve of a data directory for single transits
//! and writes the candidate events and a run summary to the output directory.
//!
//! # Usage
//!
//! ```bash
//! cargo run --release --bin mono-cbp -- mono_cbp.toml
//! ```
//!
//! The configuration file holds a `[paths]` section (`data_dir`, `catalogue`,
//! `epochs`, `output_dir`) next to the pipeline sections.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use mono_cbp::checksum::calculate_checksum;
use mono_cbp::io::{load_catalogue, load_epochs, load_light_curve_dir, write_json};
use mono_cbp::services::systematics::SystematicsSummary;
use mono_cbp::{
    BatchRunner, CandidateEvent, EclipseCatalogue, FileFailure, InMemoryCatalogue, RunConfig,
};

const DEFAULT_CONFIG: &str = "mono_cbp.toml";

#[derive(Debug, Serialize)]
struct RunSummary {
    generated_at: DateTime<Utc>,
    config_path: PathBuf,
    config_checksum: String,
    files_loaded: usize,
    files_processed: usize,
    failures: Vec<FileFailure>,
    events: usize,
    filtered_events: usize,
    snippets: usize,
    systematics: SystematicsSummary,
}

fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .init();

    let config_path = env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config_text = std::fs::read_to_string(&config_path)
        .with_context(|| format!("reading {}", config_path.display()))?;
    let config = RunConfig::from_toml_str(&config_text)
        .with_context(|| format!("parsing {}", config_path.display()))?;
    let paths = &config.paths;
    info!("Starting mono-cbp with {}", config_path.display());

    let catalogue = match &paths.catalogue {
        Some(path) => load_catalogue(path).with_context(|| format!("loading catalogue {}", path.display()))?,
        None => {
            warn!("No eclipse catalogue configured; eclipses will not be masked");
            InMemoryCatalogue::new()
        }
    };
    let epochs = match &paths.epochs {
        Some(path) => load_epochs(path).with_context(|| format!("loading epochs {}", path.display()))?,
        None => {
            warn!("No epoch boundaries configured; systematics flags stay unresolved");
            Vec::new()
        }
    };

    let loaded = load_light_curve_dir(&paths.data_dir)
        .with_context(|| format!("loading light curves from {}", paths.data_dir.display()))?;
    info!(
        "Loaded {} light curves ({} unreadable), {} catalogue entries, {} epochs",
        loaded.series.len(),
        loaded.failures.len(),
        catalogue.len(),
        epochs.len()
    );

    let mut failures: Vec<FileFailure> = loaded
        .failures
        .iter()
        .map(|(path, e)| {
            warn!("Skipping {}: {}", path.display(), e);
            FileFailure {
                object_id: path.display().to_string(),
                epoch_id: String::new(),
                error: e.to_string(),
            }
        })
        .collect();

    let runner = BatchRunner::new(config.pipeline.clone());
    let result = runner.run(&loaded.series, &catalogue, &epochs);
    failures.extend(result.failures.iter().cloned());

    let filtered: Vec<&CandidateEvent> = config.pipeline.quality.apply(&result.events);

    let out = &paths.output_dir;
    write_json(out.join("transit_events.json"), &result.events)?;
    write_json(out.join("filtered_events.json"), &filtered)?;
    write_json(out.join("event_snippets.json"), &result.snippets)?;

    let summary = RunSummary {
        generated_at: Utc::now(),
        config_path: config_path.clone(),
        config_checksum: calculate_checksum(&config_text),
        files_loaded: loaded.series.len(),
        files_processed: result.files.len(),
        failures,
        events: result.events.len(),
        filtered_events: filtered.len(),
        snippets: result.snippets.len(),
        systematics: result.systematics,
    };
    write_json(out.join("run_summary.json"), &summary)?;

    info!(
        "Wrote {} events ({} after quality filter) to {}",
        summary.events,
        summary.filtered_events,
        out.display()
    );
    Ok(())
}
