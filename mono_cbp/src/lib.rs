//! # mono-cbp
//!
//! Single-transit search engine for eclipsing binary light curves.
//!
//! The crate looks for brief, non-repeating dips in the brightness of
//! eclipsing binaries, the signature of a circumbinary planet crossing one of
//! the stars once during an observing epoch. Each light curve goes through:
//!
//! 1. eclipse masking from the binary ephemeris,
//! 2. removal of the periodic binary signal (cosine-basis fit checked with a
//!    Lomb-Scargle periodogram),
//! 3. sliding Tukey-biweight detrending over a grid of window lengths,
//! 4. a threshold search against a rolling MAD noise estimate, and
//! 5. a consensus across detrending windows.
//!
//! Across a whole batch, events piling up at the same time in one epoch are
//! then flagged as instrumental systematics.
//!
//! ## Architecture
//!
//! - [`algorithms`]: pure numerical stages over slices
//! - [`models`]: light curves, ephemerides, epochs and events
//! - [`services`]: per-file and batch orchestration, quality filter, vetting
//! - [`config`]: TOML configuration
//! - [`io`]: JSON loaders and writers
//! - [`error`]: error taxonomy
//!
//! ## Example
//!
//! ```no_run
//! use mono_cbp::{BatchRunner, InMemoryCatalogue, PipelineConfig};
//!
//! let config = PipelineConfig::from_file("mono_cbp.toml")?;
//! let loaded = mono_cbp::io::load_light_curve_dir("data/lc")?;
//! let epochs = mono_cbp::io::load_epochs("data/epochs.json")?;
//!
//! let runner = BatchRunner::new(config);
//! let result = runner.run(&loaded.series, &InMemoryCatalogue::new(), &epochs);
//! println!("{} candidate events", result.events.len());
//! # Ok::<(), mono_cbp::PipelineError>(())
//! ```

// PipelineError carries a structured context on every variant
#![allow(clippy::result_large_err)]

pub mod algorithms;
pub mod checksum;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{PipelineConfig, RunConfig};
pub use error::{ErrorContext, PipelineError, PipelineResult};
pub use models::{CandidateEvent, EclipseParameters, EpochWindow, EventSnippet, LightCurveSeries};
pub use services::{
    BatchResult, BatchRunner, ClassificationLabel, EclipseCatalogue, EventClassifier, FileFailure,
    FileResult, InMemoryCatalogue, QualityFilter, TransitFinder,
};
