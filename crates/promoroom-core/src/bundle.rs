//! Bundle and catalog adapter.
//!
//! Catalog download and parsing happen on the host; the engine only tracks
//! the identity of the catalog it is serving from (the no-catalog serve
//! gate) and can parse the built-in sample bundle for the diagnostic path.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ad::AdInfo;
use crate::error::AdsError;

/// Identity of the catalog currently applied on the host.
#[derive(Debug, Clone, Default)]
pub struct Bundle {
    catalog_id: String,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty until the first successful catalog download.
    pub fn catalog_id(&self) -> &str {
        &self.catalog_id
    }

    pub fn set_catalog_id(&mut self, catalog_id: &str) {
        self.catalog_id = catalog_id.to_string();
    }

    pub fn reset(&mut self) {
        self.catalog_id.clear();
    }
}

/// Parsed sample bundle: ads grouped by category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleBundle {
    #[serde(default)]
    pub catalog_id: String,
    #[serde(default)]
    pub categories: BTreeMap<String, Vec<AdInfo>>,
}

impl SampleBundle {
    pub fn from_json(json: &str) -> Result<Self, AdsError> {
        let bundle: SampleBundle = serde_json::from_str(json).map_err(AdsError::Bundle)?;
        if bundle.categories.is_empty() {
            return Err(AdsError::EmptyBundle);
        }
        Ok(bundle)
    }
}
