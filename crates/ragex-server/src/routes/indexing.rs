//! Indexing routes: path-based indexing and multipart upload.
//!
//! Both call the same pipeline; neither assembles its own
//! validation/loading/chunking steps.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use tracing::info;

use crate::routes::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/index", post(index_paths))
        .route("/upload", post(upload))
}

#[derive(Deserialize)]
struct IndexRequest {
    #[serde(default)]
    paths: Vec<PathBuf>,
    #[serde(default)]
    clear: bool,
}

/// POST /api/index — index server-local paths.
async fn index_paths(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IndexRequest>,
) -> impl IntoResponse {
    match ragex_ingest::index_paths(
        &state.store,
        state.embedder.as_ref(),
        &req.paths,
        req.clear,
    ) {
        Ok(result) => (StatusCode::OK, Json(serde_json::json!(result))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

/// POST /api/upload — save multipart files into the uploads directory,
/// then index them through the same pipeline.
async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> impl IntoResponse {
    let mut saved: Vec<PathBuf> = Vec::new();

    while let Ok(Some(field)) = multipart.next_field().await {
        let filename = match field.file_name() {
            Some(name) => sanitize_filename(name),
            None => continue,
        };
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({ "message": format!("upload read failed: {}", e) })),
                )
                    .into_response();
            }
        };

        let mut target = state.config.data_paths.uploads.join(&filename);
        if target.exists() {
            target = state
                .config
                .data_paths
                .uploads
                .join(timestamped(&filename));
        }
        if let Err(e) = std::fs::write(&target, &bytes) {
            return error_response(e.into()).into_response();
        }
        info!("Saved upload: {}", target.display());
        saved.push(target);
    }

    if saved.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "message": "no files in upload" })),
        )
            .into_response();
    }

    match ragex_ingest::index_paths(&state.store, state.embedder.as_ref(), &saved, false) {
        Ok(result) => (StatusCode::OK, Json(serde_json::json!(result))).into_response(),
        Err(e) => error_response(e).into_response(),
    }
}

fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn timestamped(filename: &str) -> String {
    let path = std::path::Path::new(filename);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let ts = chrono::Utc::now().format("%Y%m%d%H%M%S");
    if ext.is_empty() {
        format!("{}_{}", stem, ts)
    } else {
        format!("{}_{}.{}", stem, ts, ext)
    }
}
