use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::catalog::FAVORITES_API_URL;
use crate::credentials::{CredentialHost, CredentialSelector};
use crate::fetcher::{CachePolicy, ChunkSize, FetchSettings};

/// Global configuration loaded from `~/.config/ondemand/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnDemandConfig {
    /// Root directory holding one subdirectory per artifact kind (None = XDG data dir).
    #[serde(default)]
    pub models_dir: Option<PathBuf>,
    /// Static catalog file (None = `catalog.json` next to this config).
    /// `ONDEMAND_LOADERS_CONFIG_PATH` overrides it when the file exists.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    /// Receive chunk size in KiB used when a caller does not pick one (1..=12).
    pub default_chunk_kib: u32,
    /// Connection timeout for artifact and catalog requests.
    pub connect_timeout_secs: u64,
    /// Overall transfer deadline (None = no deadline, libcurl default).
    #[serde(default)]
    pub transfer_timeout_secs: Option<u64>,
    /// Maximum number of redirects followed per request.
    pub max_redirections: u32,
    /// Whether cached files are trusted as-is or checked against a known digest.
    #[serde(default)]
    pub cache_policy: CachePolicy,
    /// Remote catalog endpoint listing the user's favorited items.
    pub favorites_url: String,
    /// How long a fetched favorites catalog stays fresh (None = until refreshed).
    #[serde(default)]
    pub favorites_ttl_secs: Option<u64>,
    /// URL prefix → environment variable holding the token for that host.
    #[serde(default = "crate::credentials::default_hosts")]
    pub credential_hosts: Vec<CredentialHost>,
}

impl Default for OnDemandConfig {
    fn default() -> Self {
        Self {
            models_dir: None,
            catalog_path: None,
            default_chunk_kib: ChunkSize::DEFAULT_KIB,
            connect_timeout_secs: 30,
            transfer_timeout_secs: None,
            max_redirections: 10,
            cache_policy: CachePolicy::default(),
            favorites_url: FAVORITES_API_URL.to_string(),
            favorites_ttl_secs: None,
            credential_hosts: crate::credentials::default_hosts(),
        }
    }
}

impl OnDemandConfig {
    /// Models root: configured value or `~/.local/share/ondemand/models`.
    pub fn models_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.models_dir {
            return Ok(dir.clone());
        }
        let xdg_dirs = xdg::BaseDirectories::with_prefix("ondemand")?;
        Ok(xdg_dirs.get_data_home().join("models"))
    }

    /// Chunk size used when the caller passes none; invalid config values fall back to the default.
    pub fn default_chunk_size(&self) -> ChunkSize {
        ChunkSize::new(self.default_chunk_kib).unwrap_or_else(|_| {
            tracing::warn!(
                value = self.default_chunk_kib,
                "default_chunk_kib out of range, using {} KiB",
                ChunkSize::DEFAULT_KIB
            );
            ChunkSize::default()
        })
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        FetchSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            transfer_timeout: self.transfer_timeout_secs.map(Duration::from_secs),
            max_redirections: self.max_redirections,
            cache_policy: self.cache_policy,
        }
    }

    pub fn credential_selector(&self) -> CredentialSelector {
        CredentialSelector::new(self.credential_hosts.clone())
    }

    pub fn favorites_ttl(&self) -> Option<Duration> {
        self.favorites_ttl_secs.map(Duration::from_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ondemand")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<OnDemandConfig> {
    load_or_init_at(&config_path()?)
}

/// Like `load_or_init` but for an explicit path.
pub fn load_or_init_at(path: &Path) -> Result<OnDemandConfig> {
    if !path.exists() {
        let default_cfg = OnDemandConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: OnDemandConfig =
        toml::from_str(&data).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}
