//! Question answering route.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use ragex_retrieve::QueryIntent;

use crate::routes::error_response;
use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ask", post(ask))
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    /// Optional explicit intent; detected from the question when absent.
    intent: Option<String>,
}

/// POST /api/ask — retrieve evidence and generate a grounded answer.
async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> impl IntoResponse {
    let intent = req
        .intent
        .as_deref()
        .and_then(QueryIntent::parse)
        .unwrap_or_else(|| ragex_retrieve::detect_intent(&req.question));

    let evidence = match ragex_retrieve::retrieve(
        &state.store,
        state.embedder.as_ref(),
        &state.config,
        &req.question,
    ) {
        Ok(evidence) => evidence,
        Err(e) => return error_response(e).into_response(),
    };

    match ragex_answer::generate_answer(
        &state.orchestrator,
        &state.config,
        &req.question,
        &evidence,
        intent,
    )
    .await
    {
        Ok(answer) => Json(serde_json::json!({
            "answer": answer.answer,
            "sources": answer.sources,
            "intent": intent.as_str(),
        }))
        .into_response(),
        Err(e) => error_response(e).into_response(),
    }
}
