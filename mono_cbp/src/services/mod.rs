//! Service layer: per-file orchestration, batch reduction and collaborators.
//!
//! Services compose the numerical stages in `algorithms` into the pipeline
//! and implement the batch-level logic that needs more than one light curve.

pub mod batch;
pub mod catalogue;
pub mod characterize;
pub mod quality;
pub mod systematics;
pub mod transit_finder;
pub mod vetting;

pub use batch::{BatchResult, BatchRunner, FileFailure, FileSummary};
pub use catalogue::{CatalogueEntry, EclipseCatalogue, InMemoryCatalogue};
pub use characterize::{event_significance, extract_snippet, EventSignificance};
pub use quality::QualityFilter;
pub use systematics::{apply_histograms, build_histograms, BatchTimingHistogram, SystematicsSummary};
pub use transit_finder::{FileResult, TransitFinder};
pub use vetting::{vet_snippets, ClassificationLabel, EventClassifier, VettingResult};
