//! Numerical building blocks of the single-transit search.
//!
//! Each stage is a pure function over slices so it can be reused across
//! detrending windows and run in parallel without shared state.

pub mod consensus;
pub mod detrend;
pub mod monofind;
pub mod noise;
pub mod periodic_filter;
pub mod periodogram;
pub mod phase;
pub mod stats;

pub use consensus::{build_consensus, ConsensusEvent, ConsensusParams, WindowDetection};
pub use detrend::{biweight_detrend, detrend_grid, DetrendParams, DetrendedVariant};
pub use monofind::{monofind, MonofindParams, MonofindResult, RawEvent};
pub use noise::{global_mad_sigma, rolling_mad, NoiseEstimate};
pub use periodic_filter::{periodic_filter, PeriodicFilterParams, PeriodicFilterResult};
pub use periodogram::{lomb_scargle, FrequencyGrid, Periodogram};
pub use phase::{eclipse_mask, phase, phase_series};
