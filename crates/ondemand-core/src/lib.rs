pub mod config;
pub mod logging;

// Catalogs, credentials and the download path
pub mod adapter;
pub mod catalog;
pub mod checksum;
pub mod credentials;
pub mod fetcher;
pub mod http;
pub mod storage;
pub mod url_model;

pub use adapter::{ArtifactKind, ArtifactLoader, LoadOptions, LoadOutcome, OnDemandLoader};
pub use catalog::{Catalog, CatalogEntry, Catalogs, DynamicCatalog};
pub use fetcher::{DownloadRequest, FetchError, FetchOutcome, Fetcher};
