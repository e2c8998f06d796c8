//! Route handlers.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::AppState;

#[derive(Debug, Deserialize)]
struct LoraChanged {
    lora_name: Option<String>,
}

/// Selected name from a `lora_changed` body; `None` when missing, empty or unparseable.
pub(super) fn selected_lora(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<LoraChanged>(body)
        .ok()
        .and_then(|b| b.lora_name)
        .filter(|n| !n.is_empty())
}

pub async fn lora_changed(State(state): State<AppState>, body: Bytes) -> (StatusCode, Json<Value>) {
    let Some(name) = selected_lora(&body) else {
        tracing::warn!("lora_changed without lora_name");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "lora_name not provided" })),
        );
    };

    tracing::info!(lora = %name, "LoRA selection changed");
    state.selection.set_lora(name.clone());
    if let Some(prefetcher) = &state.prefetcher {
        prefetcher.spawn(name);
    }
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

#[derive(Debug, Serialize)]
pub struct NamesResponse {
    category: String,
    names: Vec<String>,
}

pub async fn catalog_names(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<NamesResponse>, (StatusCode, Json<Value>)> {
    let catalog = state.catalogs.get(&category).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("unknown category '{}'", category) })),
        )
    })?;
    let names = catalog.names().into_iter().map(str::to_string).collect();
    Ok(Json(NamesResponse { category, names }))
}

#[derive(Debug, Default, Deserialize)]
pub struct FavoritesQuery {
    #[serde(default)]
    refresh: bool,
}

pub async fn favorite_names(
    State(state): State<AppState>,
    Query(query): Query<FavoritesQuery>,
) -> Result<Json<NamesResponse>, (StatusCode, Json<Value>)> {
    let favorites = state.favorites.clone();
    let catalog = tokio::task::spawn_blocking(move || {
        if query.refresh {
            favorites.refresh()
        } else {
            favorites.get()
        }
    })
    .await
    .ok()
    .flatten()
    .ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "error": "remote catalog unavailable" })),
        )
    })?;
    let names = catalog.names().into_iter().map(str::to_string).collect();
    Ok(Json(NamesResponse {
        category: "favorites".to_string(),
        names,
    }))
}
