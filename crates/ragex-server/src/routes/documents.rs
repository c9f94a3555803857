//! Read-only document listing and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::routes::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/documents", get(list_documents))
        .route("/health", get(health))
}

/// GET /api/documents — distinct source files with chunk counts.
async fn list_documents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let probe = state.store.probe().and_then(|_| state.store.list_documents());
    match probe {
        Ok(documents) => Json(serde_json::json!({
            "documents": documents,
            "total": documents.len(),
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// GET /api/health — store reachability plus provider availability.
/// Read-only; never creates or repairs anything.
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let store_ok = state.store.probe().is_ok();
    let availability = state.orchestrator.check_availability().await;

    let status = if store_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(serde_json::json!({
            "status": if store_ok { "ok" } else { "degraded" },
            "store": store_ok,
            "provider": availability,
        })),
    )
}
