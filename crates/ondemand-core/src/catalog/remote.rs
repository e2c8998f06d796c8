//! Remote favorites catalog: one GET to a collection endpoint, flattened into entries.

use serde::Deserialize;

use super::{Catalog, CatalogEntry, CatalogError};
use crate::credentials::CredentialSelector;
use crate::fetcher::FetchSettings;
use crate::http;

/// The user's favorited LoRA collection on CivitAI.
pub const FAVORITES_API_URL: &str =
    "https://civitai.com/api/v1/models?types=LORA&favorites=true&nsfw=true";

/// File type marking a version's primary artifact.
pub const PRIMARY_FILE_KIND: &str = "Model";

#[derive(Debug, Default, Deserialize)]
struct FavoritesPage {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    name: String,
    #[serde(default, rename = "modelVersions")]
    model_versions: Vec<Version>,
}

#[derive(Debug, Deserialize)]
struct Version {
    #[serde(default)]
    name: String,
    #[serde(default)]
    files: Vec<VersionFile>,
    #[serde(default, rename = "downloadUrl")]
    download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VersionFile {
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// One entry per version whose first file is a primary artifact, named `"{item} - {version}"`.
fn entries_from_page(page: FavoritesPage) -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    for item in page.items {
        for version in item.model_versions {
            let primary = version
                .files
                .first()
                .and_then(|f| f.kind.as_deref())
                .map_or(false, |k| k == PRIMARY_FILE_KIND);
            let url = match version.download_url {
                Some(u) if primary && !u.is_empty() => u,
                _ => continue,
            };
            entries.push(CatalogEntry::new(
                format!("{} - {}", item.name, version.name),
                url,
            ));
        }
    }
    entries
}

/// Decodes a favorites API response into a catalog (sentinel first).
pub fn parse_favorites(body: &[u8]) -> Result<Catalog, serde_json::Error> {
    let page: FavoritesPage = serde_json::from_slice(body)?;
    Ok(Catalog::new(entries_from_page(page)).with_sentinel())
}

/// Anything that can produce a fresh catalog on request.
pub trait CatalogSource {
    fn fetch_catalog(&self) -> Result<Catalog, CatalogError>;
}

impl<T: CatalogSource + ?Sized> CatalogSource for Box<T> {
    fn fetch_catalog(&self) -> Result<Catalog, CatalogError> {
        (**self).fetch_catalog()
    }
}

/// HTTP favorites endpoint with an optional bearer token.
#[derive(Debug, Clone)]
pub struct FavoritesApi {
    url: String,
    credential: Option<String>,
    settings: FetchSettings,
}

impl FavoritesApi {
    pub fn new(
        url: impl Into<String>,
        credential: Option<String>,
        settings: FetchSettings,
    ) -> Self {
        Self {
            url: url.into(),
            credential,
            settings,
        }
    }

    /// Token picked by `selector` for the endpoint's host (e.g. `CIVITAI_TOKEN`).
    pub fn with_selector(
        url: impl Into<String>,
        selector: &CredentialSelector,
        settings: FetchSettings,
    ) -> Self {
        let url = url.into();
        let credential = selector.select(&url, None);
        Self::new(url, credential, settings)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CatalogSource for FavoritesApi {
    fn fetch_catalog(&self) -> Result<Catalog, CatalogError> {
        let body = http::get_bytes(&self.url, self.credential.as_deref(), &self.settings)?;
        let catalog = parse_favorites(&body).map_err(CatalogError::Decode)?;
        tracing::debug!(url = %self.url, entries = catalog.len(), "fetched favorites catalog");
        Ok(catalog)
    }
}

/// Fetches the remote catalog once. `None` means "catalog unavailable"; the cause is logged.
pub fn load_dynamic_catalog(api_url: &str, credential: Option<&str>) -> Option<Catalog> {
    let api = FavoritesApi::new(
        api_url,
        credential.map(str::to_string),
        FetchSettings::default(),
    );
    match api.fetch_catalog() {
        Ok(c) => Some(c),
        Err(e) => {
            tracing::error!(url = %api_url, "error retrieving remote catalog: {}", e);
            None
        }
    }
}
