//! `ondemand favorites` – names from the remote favorites catalog.

use anyhow::{Context, Result};
use ondemand_core::catalog::{CatalogSource, FavoritesApi};
use ondemand_core::config::OnDemandConfig;

pub async fn run_favorites(cfg: &OnDemandConfig) -> Result<()> {
    let api = FavoritesApi::with_selector(
        cfg.favorites_url.clone(),
        &cfg.credential_selector(),
        cfg.fetch_settings(),
    );
    let catalog = tokio::task::spawn_blocking(move || api.fetch_catalog())
        .await?
        .context("remote catalog unavailable")?;
    for name in catalog.names() {
        println!("{}", name);
    }
    Ok(())
}
