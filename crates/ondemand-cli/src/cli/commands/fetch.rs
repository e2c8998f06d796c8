//! `ondemand fetch` and `ondemand fetch-url`.

use anyhow::{Context, Result};
use clap::Args;
use ondemand_core::adapter::ArtifactKind;
use ondemand_core::catalog::{load_static_catalog, static_catalog_path};
use ondemand_core::config::OnDemandConfig;
use ondemand_core::fetcher::{ChunkSize, DownloadRequest, FetchOutcome, Fetcher};
use std::path::PathBuf;

use super::progress::ConsoleProgress;

/// Options shared by both fetch commands.
#[derive(Debug, Clone, Default, Args)]
pub struct FetchArgs {
    /// Access token; hosts with a configured environment variable fall back to it.
    #[arg(long, value_name = "TOKEN")]
    pub credential: Option<String>,
    /// Receive buffer in KiB (1-12); config default_chunk_kib if omitted.
    #[arg(long, value_name = "KIB")]
    pub chunk_kib: Option<u32>,
}

fn chunk_size(cfg: &OnDemandConfig, args: &FetchArgs) -> Result<ChunkSize> {
    match args.chunk_kib {
        Some(kib) => Ok(ChunkSize::new(kib)?),
        None => Ok(cfg.default_chunk_size()),
    }
}

async fn fetch_blocking(cfg: &OnDemandConfig, req: DownloadRequest) -> Result<()> {
    let fetcher = Fetcher::new(cfg.fetch_settings());
    let url = req.source_url.clone();
    let outcome = tokio::task::spawn_blocking(move || fetcher.fetch(&req, &ConsoleProgress::new()))
        .await?
        .with_context(|| format!("fetching {}", url))?;
    match outcome {
        FetchOutcome::Cached(path) => println!("{} (cached)", path.display()),
        FetchOutcome::Downloaded { path, bytes } => {
            println!("{} ({} bytes downloaded)", path.display(), bytes)
        }
    }
    Ok(())
}

pub async fn run_fetch(
    cfg: &OnDemandConfig,
    kind: &str,
    name: &str,
    args: FetchArgs,
) -> Result<()> {
    let kind: ArtifactKind = kind.parse()?;
    let catalogs = load_static_catalog(&static_catalog_path(cfg)?);
    let url = catalogs.resolve(kind.category_key(), name)?.to_string();
    let sha256 = catalogs
        .get(kind.category_key())
        .and_then(|c| c.lookup(name))
        .and_then(|e| e.sha256.clone());
    let dir = cfg.models_dir()?.join(kind.subdir());
    let credential = cfg
        .credential_selector()
        .select(&url, args.credential.as_deref());

    let req = DownloadRequest::new(url, dir, name)
        .with_credential(credential)
        .with_chunk_size(chunk_size(cfg, &args)?)
        .with_expected_sha256(sha256);
    fetch_blocking(cfg, req).await
}

pub async fn run_fetch_url(
    cfg: &OnDemandConfig,
    url: String,
    dir: PathBuf,
    args: FetchArgs,
    sha256: Option<String>,
) -> Result<()> {
    let credential = cfg
        .credential_selector()
        .select(&url, args.credential.as_deref());
    let req = DownloadRequest::new(url.clone(), dir, url)
        .with_credential(credential)
        .with_chunk_size(chunk_size(cfg, &args)?)
        .with_expected_sha256(sha256);
    fetch_blocking(cfg, req).await
}
