use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use tracing::{info, warn};

use crate::routes::data::bytes_response;
use crate::services::dataset_loader::EMPTY_SUBZONES_JSON;
use crate::state::{AppState, KernelConfig};

pub async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let dataset = state.dataset().await;
    Json(serde_json::json!({
        "ok": true,
        "dataset_loaded": dataset.is_some(),
        "regions": dataset.as_ref().map_or(0, |snapshot| snapshot.region_count),
        "dataset_seq": dataset.as_ref().map(|snapshot| snapshot.seq),
        "loaded_at": dataset.as_ref().map(|snapshot| snapshot.loaded_at.to_rfc3339()),
    }))
}

/// Serve the pre-serialized name listing. An absent dataset lists nothing.
pub async fn get_subzones(State(state): State<AppState>) -> Response {
    let body = match state.dataset().await {
        Some(snapshot) => (*snapshot.subzones_json).clone(),
        None => Bytes::from_static(EMPTY_SUBZONES_JSON),
    };
    bytes_response(body, "application/json", "no-cache", None)
}

pub async fn get_config(State(state): State<AppState>) -> Json<KernelConfig> {
    Json(state.kernel_config.read().await.clone())
}

pub async fn put_config(
    State(state): State<AppState>,
    Json(config): Json<KernelConfig>,
) -> Result<Json<serde_json::Value>, Response> {
    if let Err(reason) = config.validate() {
        warn!(%reason, "rejected kernel config update");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "ok": false, "error": reason })),
        )
            .into_response());
    }

    info!(kernel_kind = %config.kernel_kind, "kernel config updated");
    *state.kernel_config.write().await = config;
    Ok(Json(serde_json::json!({ "ok": true })))
}
