//! Artifact catalogs: logical name → source URL, per category.
//!
//! Catalogs come from a static JSON file (`file`) or a remote favorites API
//! (`remote`), the latter memoized by an explicit cache object (`cache`).

mod cache;
mod file;
mod remote;

pub use cache::{Clock, DynamicCatalog, SystemClock};
pub use file::{
    default_catalogs, load_static_catalog, parse_catalogs, read_catalogs, static_catalog_path,
    static_catalog_path_from, CONFIG_PATH_ENV,
};
pub use remote::{
    load_dynamic_catalog, parse_favorites, CatalogSource, FavoritesApi, FAVORITES_API_URL,
    PRIMARY_FILE_KIND,
};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::fetcher::FetchError;

/// Display name of the synthetic "no selection" entry.
pub const SENTINEL_NAME: &str = "None";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Optional expected SHA-256 (hex), only consulted when cache verification is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl CatalogEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: Some(url.into()),
            sha256: None,
        }
    }

    pub fn sentinel() -> Self {
        Self {
            name: SENTINEL_NAME.to_string(),
            url: None,
            sha256: None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.name == SENTINEL_NAME && self.url.is_none()
    }
}

/// Name is present but has no usable URL (absent, sentinel, or url-less entry).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no URL for artifact '{name}'")]
pub struct ArtifactNotFound {
    pub name: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog request failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("decode catalog response: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Ordered entries for one category. Lookup is by exact name, first match wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// Puts the sentinel first, exactly once, keeping the order of everything else.
    pub fn with_sentinel(mut self) -> Self {
        self.entries.retain(|e| !e.is_sentinel());
        self.entries.insert(0, CatalogEntry::sentinel());
        self
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Display names in catalog order, for selection lists.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.name.as_str()).collect()
    }

    pub fn lookup(&self, name: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// URL for `name`. The sentinel and entries without a URL are not found.
    pub fn resolve(&self, name: &str) -> Result<&str, ArtifactNotFound> {
        self.lookup(name)
            .and_then(|e| e.url.as_deref())
            .ok_or_else(|| ArtifactNotFound {
                name: name.to_string(),
            })
    }
}

/// Category key (e.g. `loras`, `checkpoints`) → catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalogs {
    categories: BTreeMap<String, Catalog>,
}

impl Catalogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: impl Into<String>, catalog: Catalog) {
        self.categories.insert(category.into(), catalog);
    }

    pub fn get(&self, category: &str) -> Option<&Catalog> {
        self.categories.get(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Resolves `name` in `category`; a missing category behaves like a missing name.
    pub fn resolve(&self, category: &str, name: &str) -> Result<&str, ArtifactNotFound> {
        match self.get(category) {
            Some(catalog) => catalog.resolve(name),
            None => Err(ArtifactNotFound {
                name: name.to_string(),
            }),
        }
    }
}
