//! Shared state behind the callback service.

use anyhow::Result;
use ondemand_core::adapter::{
    ArtifactKind, ArtifactLoader, LoadOptions, LoadOutcome, OnDemandLoader,
};
use ondemand_core::catalog::{CatalogSource, Catalogs, DynamicCatalog, SENTINEL_NAME};
use ondemand_core::credentials::CredentialSelector;
use ondemand_core::fetcher::{ChunkSize, Fetcher};
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

pub type BoxedSource = Box<dyn CatalogSource + Send + Sync>;
pub type Favorites = DynamicCatalog<BoxedSource>;

/// Last selection reported by the UI.
#[derive(Debug, Default)]
pub struct SelectionState {
    lora: RwLock<Option<String>>,
}

impl SelectionState {
    /// Records `name`; returns the previous selection.
    pub fn set_lora(&self, name: String) -> Option<String> {
        let mut guard = self.lora.write().unwrap_or_else(PoisonError::into_inner);
        guard.replace(name)
    }

    pub fn lora(&self) -> Option<String> {
        self.lora
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Loader that only reports what landed on disk; used to warm the cache.
struct CacheOnly;

impl ArtifactLoader<()> for CacheOnly {
    type Output = Vec<String>;

    fn load(&self, _input: &(), filenames: &[String], _dir: &Path) -> Result<Vec<String>> {
        Ok(filenames.to_vec())
    }
}

/// Downloads newly selected favorites in the background.
pub struct Prefetcher {
    loader: OnDemandLoader<Arc<Favorites>, CacheOnly>,
}

impl Prefetcher {
    pub fn new(
        favorites: Arc<Favorites>,
        fetcher: Arc<Fetcher>,
        models_root: PathBuf,
        selector: CredentialSelector,
        chunk: ChunkSize,
    ) -> Self {
        let loader =
            OnDemandLoader::new(ArtifactKind::Lora, favorites, CacheOnly, fetcher, models_root)
                .with_selector(selector)
                .with_default_chunk(chunk);
        Self { loader }
    }

    /// Fetches `name` on the blocking pool; the sentinel is ignored.
    pub fn spawn(self: &Arc<Self>, name: String) {
        if name == SENTINEL_NAME {
            return;
        }
        let this = Arc::clone(self);
        tokio::task::spawn_blocking(move || {
            match this.loader.run((), &[name.as_str()], &LoadOptions::default()) {
                LoadOutcome::Loaded(files) => {
                    tracing::info!(lora = %name, ?files, "prefetched selection")
                }
                LoadOutcome::Unchanged(()) => {
                    tracing::warn!(lora = %name, "prefetch did not complete")
                }
            }
        });
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalogs: Arc<Catalogs>,
    pub favorites: Arc<Favorites>,
    pub selection: Arc<SelectionState>,
    pub prefetcher: Option<Arc<Prefetcher>>,
}

impl AppState {
    pub fn new(catalogs: Catalogs, favorites: Arc<Favorites>) -> Self {
        Self {
            catalogs: Arc::new(catalogs),
            favorites,
            selection: Arc::new(SelectionState::default()),
            prefetcher: None,
        }
    }

    pub fn with_prefetcher(mut self, prefetcher: Prefetcher) -> Self {
        self.prefetcher = Some(Arc::new(prefetcher));
        self
    }
}
