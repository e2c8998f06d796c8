//! Callback service: UI selection notifications and catalog listings over HTTP.

mod handlers;
mod state;

pub use state::{AppState, BoxedSource, Prefetcher};

use axum::routing::{get, post};
use axum::Router;

/// Routes of the callback service. All paths live under `/ondemand/`.
///
/// The stock UI extension posts selections to `/francarl/lora_changed`; a UI script has to
/// target `/ondemand/lora_changed` instead. The request and response bodies are unchanged.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ondemand/lora_changed", post(handlers::lora_changed))
        .route("/ondemand/catalogs/{category}", get(handlers::catalog_names))
        .route("/ondemand/favorites", get(handlers::favorite_names))
        .with_state(state)
}
