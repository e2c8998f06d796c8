//! `ondemand serve` – HTTP callback service for UI selection changes.

use anyhow::{Context, Result};
use ondemand_core::catalog::{
    load_static_catalog, static_catalog_path, DynamicCatalog, FavoritesApi,
};
use ondemand_core::config::OnDemandConfig;
use ondemand_core::fetcher::Fetcher;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::server::{self, AppState, Prefetcher};

pub async fn run_serve(cfg: &OnDemandConfig, bind: SocketAddr, prefetch: bool) -> Result<()> {
    let catalogs = load_static_catalog(&static_catalog_path(cfg)?);
    let api = FavoritesApi::with_selector(
        cfg.favorites_url.clone(),
        &cfg.credential_selector(),
        cfg.fetch_settings(),
    );
    let favorites = Arc::new(DynamicCatalog::new(
        Box::new(api) as server::BoxedSource,
        cfg.favorites_ttl(),
    ));

    let mut state = AppState::new(catalogs, Arc::clone(&favorites));
    if prefetch {
        let fetcher = Arc::new(Fetcher::new(cfg.fetch_settings()));
        state = state.with_prefetcher(Prefetcher::new(
            favorites,
            fetcher,
            cfg.models_dir()?,
            cfg.credential_selector(),
            cfg.default_chunk_size(),
        ));
    }

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {}", bind))?;
    tracing::info!(addr = %bind, prefetch, "callback service listening");
    println!("Listening on http://{}", bind);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("callback service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
