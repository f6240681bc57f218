//! JSON loaders and writers for pipeline inputs and results.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ErrorContext, PipelineError, PipelineResult};
use crate::models::{EpochWindow, LightCurveSeries};
use crate::services::catalogue::{CatalogueEntry, InMemoryCatalogue};

fn read_json<T: DeserializeOwned>(path: &Path, operation: &str) -> PipelineResult<T> {
    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::io(format!("Failed to read {}", path.display()), e).with_operation(operation)
    })?;
    serde_json::from_str(&content).map_err(|e| PipelineError::Parse {
        message: format!("{}: {}", path.display(), e),
        context: ErrorContext::new(operation),
    })
}

/// Load and validate one light curve.
pub fn load_light_curve<P: AsRef<Path>>(path: P) -> PipelineResult<LightCurveSeries> {
    let series: LightCurveSeries = read_json(path.as_ref(), "load_light_curve")?;
    series.validate()?;
    Ok(series)
}

/// Light curves found in a directory.
#[derive(Debug, Default)]
pub struct LoadedDirectory {
    pub series: Vec<LightCurveSeries>,
    /// Files that could not be read, parsed or validated
    pub failures: Vec<(PathBuf, PipelineError)>,
}

/// Load every `*.json` file in `dir`, in file-name order.
///
/// Unreadable or invalid files are collected in `failures`; only a failure
/// to list the directory is an error.
pub fn load_light_curve_dir<P: AsRef<Path>>(dir: P) -> PipelineResult<LoadedDirectory> {
    let dir = dir.as_ref();
    let listing = fs::read_dir(dir).map_err(|e| {
        PipelineError::io(format!("Failed to list {}", dir.display()), e)
            .with_operation("load_light_curve_dir")
    })?;

    let mut paths: Vec<PathBuf> = listing
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut loaded = LoadedDirectory::default();
    for path in paths {
        match load_light_curve(&path) {
            Ok(series) => {
                debug!("loaded {} ({} points)", path.display(), series.len());
                loaded.series.push(series);
            }
            Err(e) => loaded.failures.push((path, e)),
        }
    }
    Ok(loaded)
}

/// Load an eclipse catalogue: a JSON array of rows with `object_id` plus
/// the ephemeris fields.
pub fn load_catalogue<P: AsRef<Path>>(path: P) -> PipelineResult<InMemoryCatalogue> {
    let entries: Vec<CatalogueEntry> = read_json(path.as_ref(), "load_catalogue")?;
    Ok(InMemoryCatalogue::from_entries(entries))
}

/// Load and validate epoch boundaries.
pub fn load_epochs<P: AsRef<Path>>(path: P) -> PipelineResult<Vec<EpochWindow>> {
    let epochs: Vec<EpochWindow> = read_json(path.as_ref(), "load_epochs")?;
    for window in &epochs {
        window.validate()?;
    }
    Ok(epochs)
}

/// Write `value` as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized, P: AsRef<Path>>(path: P, value: &T) -> PipelineResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            PipelineError::io(format!("Failed to create {}", parent.display()), e)
                .with_operation("write_json")
        })?;
    }
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content).map_err(|e| {
        PipelineError::io(format!("Failed to write {}", path.display()), e).with_operation("write_json")
    })
}
