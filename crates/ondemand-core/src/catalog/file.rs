//! Static catalog file (JSON): `{ "<category>": [ {"name": .., "url": ..}, .. ], .. }`.

use anyhow::Result;
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{Catalog, CatalogEntry, CatalogError, Catalogs};
use crate::config::OnDemandConfig;

/// Environment variable overriding the static catalog location (used only if the file exists).
pub const CONFIG_PATH_ENV: &str = "ONDEMAND_LOADERS_CONFIG_PATH";

const DEFAULT_FILENAME: &str = "catalog.json";
const PLACEHOLDER_URL: &str = "not_valid_url";

/// Built-in fallback so selection lists are never empty: two placeholder loras
/// whose URLs fail at download time.
pub fn default_catalogs() -> Catalogs {
    let mut all = Catalogs::new();
    all.insert(
        "loras",
        Catalog::new(vec![
            CatalogEntry::new("Lora n1", PLACEHOLDER_URL),
            CatalogEntry::new("Lora n2", PLACEHOLDER_URL),
        ]),
    );
    all
}

/// Parses catalog JSON. Non-list top-level values are ignored; every list gets the sentinel first.
pub fn parse_catalogs(text: &str) -> Result<Catalogs, serde_json::Error> {
    let root: Map<String, Value> = serde_json::from_str(text)?;
    let mut all = Catalogs::new();
    for (category, value) in root {
        if !value.is_array() {
            continue;
        }
        let entries: Vec<CatalogEntry> = serde_json::from_value(value)?;
        all.insert(category, Catalog::new(entries).with_sentinel());
    }
    Ok(all)
}

/// Strict variant of `load_static_catalog`: reports missing or malformed files.
pub fn read_catalogs(path: &Path) -> Result<Catalogs, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalogs(&text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the static catalog, falling back to `default_catalogs()` on any failure.
pub fn load_static_catalog(path: &Path) -> Catalogs {
    match read_catalogs(path) {
        Ok(all) => {
            tracing::info!(path = %path.display(), "loaded catalog");
            all
        }
        Err(CatalogError::Read { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(
                path = %path.display(),
                "catalog file not found, using default fallback catalog"
            );
            default_catalogs()
        }
        Err(e) => {
            tracing::error!("{}; using default fallback catalog", e);
            default_catalogs()
        }
    }
}

/// Static catalog location for `config`, honoring `ONDEMAND_LOADERS_CONFIG_PATH`.
pub fn static_catalog_path(config: &OnDemandConfig) -> Result<PathBuf> {
    let env_path = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
    static_catalog_path_from(env_path, config.catalog_path.as_deref())
}

/// Resolution order: existing env override, configured path, XDG config dir.
pub fn static_catalog_path_from(
    env_path: Option<PathBuf>,
    configured: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(p) = env_path.filter(|p| p.exists()) {
        return Ok(p);
    }
    if let Some(p) = configured {
        return Ok(p.to_path_buf());
    }
    let xdg_dirs = xdg::BaseDirectories::with_prefix("ondemand")?;
    Ok(xdg_dirs.get_config_home().join(DEFAULT_FILENAME))
}
