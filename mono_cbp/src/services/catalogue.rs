//! Eclipse catalogue lookup.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::models::EclipseParameters;

/// Resolves the ephemeris of an eclipsing binary by identifier.
///
/// Implementations are shared across the batch worker pool.
pub trait EclipseCatalogue: Send + Sync {
    fn lookup(&self, object_id: &str) -> Option<EclipseParameters>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One row of a catalogue file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub object_id: String,
    #[serde(flatten)]
    pub params: EclipseParameters,
}

/// Catalogue held in memory, as loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogue {
    entries: HashMap<String, EclipseParameters>,
}

impl InMemoryCatalogue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from catalogue rows, skipping rows with invalid ephemerides.
    /// A repeated identifier keeps its last row.
    pub fn from_entries(entries: impl IntoIterator<Item = CatalogueEntry>) -> Self {
        let mut catalogue = Self::new();
        for entry in entries {
            if let Err(e) = entry.params.validate() {
                warn!("skipping catalogue entry {}: {}", entry.object_id, e);
                continue;
            }
            catalogue.insert(entry.object_id, entry.params);
        }
        catalogue
    }

    pub fn insert(&mut self, object_id: impl Into<String>, params: EclipseParameters) {
        self.entries.insert(object_id.into(), params);
    }
}

impl EclipseCatalogue for InMemoryCatalogue {
    fn lookup(&self, object_id: &str) -> Option<EclipseParameters> {
        self.entries.get(object_id).copied()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
