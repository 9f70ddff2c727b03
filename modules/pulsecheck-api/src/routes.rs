use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::warn;

use crate::AppState;

// --- Query structs ---

#[derive(Deserialize)]
pub struct AnalysisQuery {
    name: String,
}

// --- Router ---

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/analysis", get(get_analysis))
        .route("/api/health", get(health))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// --- Handlers ---

async fn health() -> &'static str {
    "Healthy"
}

/// Look up a subject's stored summary. A subject that has never been
/// analysed gets a work item enqueued and an immediate "submitted" answer —
/// this endpoint never waits for the pipeline.
async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalysisQuery>,
) -> impl IntoResponse {
    if query.name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "name must not be empty" })),
        );
    }

    let subject = match state.feed.resolve_subject(&query.name).await {
        Ok(subject) => subject,
        Err(err) => {
            warn!(handle = %query.name, error = %err, "Subject resolution failed");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": err.to_string() })),
            );
        }
    };

    match state.store.get(subject.id).await {
        Ok(Some(summary)) => match serde_json::to_value(&summary) {
            Ok(body) => (StatusCode::OK, Json(body)),
            Err(err) => {
                warn!(subject_id = subject.id, error = %err, "Summary serialization failed");
                internal_error()
            }
        },
        Ok(None) => {
            if let Err(err) = state.queue.enqueue(subject.id, Some(&query.name)).await {
                warn!(subject_id = subject.id, error = %err, "Enqueue failed");
                return internal_error();
            }
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "message": "This subject has not been analysed yet. \
                                They have been submitted for analysis; check back later."
                })),
            )
        }
        Err(err) => {
            warn!(subject_id = subject.id, error = %err, "Summary read failed");
            internal_error()
        }
    }
}

fn internal_error() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "internal error" })),
    )
}
