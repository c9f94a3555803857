//! HTTP route handlers.

pub mod ask;
pub mod documents;
pub mod indexing;

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use ragex_core::Error;

use crate::state::AppState;

/// Build the Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(ask::routes())
        .merge(indexing::routes())
        .merge(documents::routes())
}

/// Map a core error to an HTTP response carrying its canonical message.
/// Diagnostic detail stays in the log.
pub fn error_response(err: Error) -> (StatusCode, Json<serde_json::Value>) {
    tracing::error!("Request failed: {}", err);
    let status = match &err {
        Error::NoValidInputs(_) => StatusCode::BAD_REQUEST,
        Error::IndexState(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::ProviderTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        Error::ProviderUnavailable(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(serde_json::json!({ "message": err.canonical_message() })),
    )
}
