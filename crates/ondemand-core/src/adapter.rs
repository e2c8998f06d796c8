//! Download-then-delegate: make sure catalog artifacts are on disk, then hand
//! their filenames to a host loader.
//!
//! Every failure on the way (unknown name, unavailable catalog, network, disk,
//! loader) is logged and turns into `LoadOutcome::Unchanged`, so a host
//! pipeline keeps running with its inputs untouched.

use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::catalog::{ArtifactNotFound, CatalogSource, Catalogs, Clock, DynamicCatalog};
use crate::credentials::CredentialSelector;
use crate::fetcher::{ChunkSize, DownloadRequest, Fetcher, LogProgress, ProgressSink};

/// Families of artifacts a host can load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Lora,
    DiffusionModel,
    Checkpoint,
    Vae,
    Clip,
    ClipVision,
    Gguf,
    ControlNet,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 8] = [
        ArtifactKind::Lora,
        ArtifactKind::DiffusionModel,
        ArtifactKind::Checkpoint,
        ArtifactKind::Vae,
        ArtifactKind::Clip,
        ArtifactKind::ClipVision,
        ArtifactKind::Gguf,
        ArtifactKind::ControlNet,
    ];

    /// Key of this kind's list in the static catalog file.
    pub fn category_key(self) -> &'static str {
        match self {
            ArtifactKind::Lora => "loras",
            ArtifactKind::DiffusionModel => "diffusion_models",
            ArtifactKind::Checkpoint => "checkpoints",
            ArtifactKind::Vae => "vae_models",
            ArtifactKind::Clip => "clip_models",
            ArtifactKind::ClipVision => "clip_vision",
            ArtifactKind::Gguf => "gguf_models",
            ArtifactKind::ControlNet => "controlnet_models",
        }
    }

    /// Directory under the models root where this kind is stored.
    pub fn subdir(self) -> &'static str {
        match self {
            ArtifactKind::Lora => "loras",
            ArtifactKind::DiffusionModel => "diffusion_models",
            ArtifactKind::Checkpoint => "checkpoints",
            ArtifactKind::Vae => "vae",
            ArtifactKind::Clip => "text_encoders",
            ArtifactKind::ClipVision => "clip_vision",
            ArtifactKind::Gguf => "unet",
            ArtifactKind::ControlNet => "controlnet",
        }
    }

    pub fn from_category_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.category_key() == key)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.category_key())
    }
}

impl FromStr for ArtifactKind {
    type Err = anyhow::Error;

    /// Accepts the category key (`loras`) or the subdirectory name (`vae`).
    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.category_key() == s || k.subdir() == s)
            .with_context(|| format!("unknown artifact kind '{}'", s))
    }
}

/// Host capability that actually loads artifacts once they are on disk.
pub trait ArtifactLoader<I> {
    type Output;

    fn load(&self, input: &I, filenames: &[String], dir: &Path) -> Result<Self::Output>;
}

impl<I, L: ArtifactLoader<I> + ?Sized> ArtifactLoader<I> for &L {
    type Output = L::Output;

    fn load(&self, input: &I, filenames: &[String], dir: &Path) -> Result<Self::Output> {
        (**self).load(input, filenames, dir)
    }
}

/// Stand-in for an optional loader the host does not provide (e.g. GGUF support).
#[derive(Debug, Clone)]
pub struct UnavailableLoader {
    capability: String,
}

impl UnavailableLoader {
    pub fn new(capability: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
        }
    }
}

impl<I: Clone> ArtifactLoader<I> for UnavailableLoader {
    type Output = I;

    fn load(&self, _input: &I, filenames: &[String], _dir: &Path) -> Result<I> {
        tracing::error!(
            capability = %self.capability,
            ?filenames,
            "loader not available; install the extension that provides it"
        );
        anyhow::bail!("{} support is not available", self.capability)
    }
}

/// Where an artifact's URL was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedArtifact {
    pub url: String,
    pub sha256: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    NotFound(#[from] ArtifactNotFound),
    #[error("remote catalog unavailable")]
    Unavailable,
}

/// Name → URL lookup used by `OnDemandLoader`.
pub trait CatalogProvider {
    fn resolve_artifact(
        &self,
        kind: ArtifactKind,
        name: &str,
    ) -> Result<ResolvedArtifact, ResolveError>;
}

impl CatalogProvider for Catalogs {
    fn resolve_artifact(
        &self,
        kind: ArtifactKind,
        name: &str,
    ) -> Result<ResolvedArtifact, ResolveError> {
        let url = self.resolve(kind.category_key(), name)?;
        let sha256 = self
            .get(kind.category_key())
            .and_then(|c| c.lookup(name))
            .and_then(|e| e.sha256.clone());
        Ok(ResolvedArtifact {
            url: url.to_string(),
            sha256,
        })
    }
}

/// The remote catalog serves a single list regardless of kind.
impl<S: CatalogSource, C: Clock> CatalogProvider for DynamicCatalog<S, C> {
    fn resolve_artifact(
        &self,
        _kind: ArtifactKind,
        name: &str,
    ) -> Result<ResolvedArtifact, ResolveError> {
        let catalog = self.get().ok_or(ResolveError::Unavailable)?;
        let url = catalog.resolve(name)?.to_string();
        let sha256 = catalog.lookup(name).and_then(|e| e.sha256.clone());
        Ok(ResolvedArtifact { url, sha256 })
    }
}

impl<P: CatalogProvider + ?Sized> CatalogProvider for Arc<P> {
    fn resolve_artifact(
        &self,
        kind: ArtifactKind,
        name: &str,
    ) -> Result<ResolvedArtifact, ResolveError> {
        (**self).resolve_artifact(kind, name)
    }
}

impl<P: CatalogProvider + ?Sized> CatalogProvider for &P {
    fn resolve_artifact(
        &self,
        kind: ArtifactKind,
        name: &str,
    ) -> Result<ResolvedArtifact, ResolveError> {
        (**self).resolve_artifact(kind, name)
    }
}

/// Per-invocation knobs.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit token; see `CredentialSelector` for how it combines with the environment.
    pub credential: Option<String>,
    /// Receive buffer in KiB; the configured default when `None`.
    pub chunk_kib: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome<I, O> {
    Loaded(O),
    /// Something failed; the caller's input, untouched.
    Unchanged(I),
}

impl<I, O> LoadOutcome<I, O> {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    pub fn loaded(self) -> Option<O> {
        match self {
            LoadOutcome::Loaded(o) => Some(o),
            LoadOutcome::Unchanged(_) => None,
        }
    }
}

impl<T> LoadOutcome<T, T> {
    /// Loaded output or the unchanged input, whichever there is.
    pub fn into_inner(self) -> T {
        match self {
            LoadOutcome::Loaded(t) | LoadOutcome::Unchanged(t) => t,
        }
    }
}

/// Resolves, fetches and delegates for one artifact kind.
pub struct OnDemandLoader<P, L> {
    kind: ArtifactKind,
    provider: P,
    loader: L,
    fetcher: Arc<Fetcher>,
    models_root: PathBuf,
    selector: CredentialSelector,
    default_chunk: ChunkSize,
    progress: Arc<dyn ProgressSink + Send + Sync>,
}

impl<P: CatalogProvider, L> OnDemandLoader<P, L> {
    pub fn new(
        kind: ArtifactKind,
        provider: P,
        loader: L,
        fetcher: Arc<Fetcher>,
        models_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            kind,
            provider,
            loader,
            fetcher,
            models_root: models_root.into(),
            selector: CredentialSelector::default(),
            default_chunk: ChunkSize::default(),
            progress: Arc::new(LogProgress::new()),
        }
    }

    pub fn with_selector(mut self, selector: CredentialSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_default_chunk(mut self, chunk: ChunkSize) -> Self {
        self.default_chunk = chunk;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink + Send + Sync>) -> Self {
        self.progress = progress;
        self
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Destination directory for this loader's kind.
    pub fn destination_dir(&self) -> PathBuf {
        self.models_root.join(self.kind.subdir())
    }

    /// Fetches every artifact in `names`, then loads them all at once.
    ///
    /// Never panics and never returns an error: any failure yields `Unchanged(input)`.
    pub fn run<I>(&self, input: I, names: &[&str], opts: &LoadOptions) -> LoadOutcome<I, L::Output>
    where
        L: ArtifactLoader<I>,
    {
        let dir = self.destination_dir();
        let chunk = match opts.chunk_kib.map(ChunkSize::new).transpose() {
            Ok(c) => c.unwrap_or(self.default_chunk),
            Err(e) => {
                tracing::error!(kind = %self.kind, "{}", e);
                return LoadOutcome::Unchanged(input);
            }
        };

        let mut filenames = Vec::with_capacity(names.len());
        for name in names {
            match self.fetch_one(name, &dir, chunk, opts) {
                Ok(f) => filenames.push(f),
                Err(e) => {
                    tracing::error!(
                        kind = %self.kind,
                        name = %name,
                        dir = %dir.display(),
                        "artifact not loaded: {:#}",
                        e
                    );
                    return LoadOutcome::Unchanged(input);
                }
            }
        }

        match self.loader.load(&input, &filenames, &dir) {
            Ok(out) => LoadOutcome::Loaded(out),
            Err(e) => {
                tracing::error!(
                    kind = %self.kind,
                    ?filenames,
                    dir = %dir.display(),
                    "loader failed: {:#}",
                    e
                );
                LoadOutcome::Unchanged(input)
            }
        }
    }

    fn fetch_one(
        &self,
        name: &str,
        dir: &Path,
        chunk: ChunkSize,
        opts: &LoadOptions,
    ) -> Result<String> {
        let resolved = self.provider.resolve_artifact(self.kind, name)?;
        let credential = self
            .selector
            .select(&resolved.url, opts.credential.as_deref());
        let req = DownloadRequest::new(&resolved.url, dir, name)
            .with_credential(credential)
            .with_chunk_size(chunk)
            .with_expected_sha256(resolved.sha256);
        let outcome = self
            .fetcher
            .fetch(&req, self.progress.as_ref())
            .with_context(|| format!("fetching {}", resolved.url))?;
        outcome
            .file_name()
            .with_context(|| format!("no file name in {}", outcome.path().display()))
    }
}
