//! Light-curve fingerprints for result provenance.

use sha2::{Digest, Sha256};

use crate::models::LightCurveSeries;

/// Calculate the SHA-256 checksum of a light curve's identity and samples.
///
/// Values are hashed by their little-endian bit patterns, so NaN entries
/// contribute deterministically.
pub fn light_curve_checksum(series: &LightCurveSeries) -> String {
    let mut hasher = Sha256::new();
    hasher.update(series.object_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(series.epoch_id.as_bytes());
    hasher.update([0u8]);
    for column in [&series.time, &series.flux, &series.flux_err] {
        hasher.update((column.len() as u64).to_le_bytes());
        for value in column.iter() {
            hasher.update(value.to_bits().to_le_bytes());
        }
    }
    hex::encode(hasher.finalize())
}

/// Calculate the SHA-256 checksum of raw file content.
pub fn calculate_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
