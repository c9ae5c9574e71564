use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::errors::AppError;
use crate::feedback::queries::{self, FeedbackDetail};
use crate::ingestion::pipeline::{BatchIngestOutcome, IngestPipeline};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct BatchIngestRequest {
    pub items: Vec<Value>,
}

/// POST /api/feedback/batch
///
/// Returns 200 even when some items fail — per-item errors travel in the
/// response body with their original indices.
pub async fn handle_create_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchIngestRequest>,
) -> Result<Json<BatchIngestOutcome>, AppError> {
    let pipeline = IngestPipeline::new(state.store.clone(), state.scorer.clone());
    let outcome = pipeline.create_batch(req.items).await?;
    Ok(Json(outcome))
}

/// POST /api/feedback
///
/// Single-item ingestion. Runs the same pipeline as the batch endpoint and
/// responds with the fully-resolved record.
pub async fn handle_create_feedback(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<FeedbackDetail>), AppError> {
    let pipeline = IngestPipeline::new(state.store.clone(), state.scorer.clone());
    let id = pipeline.create_one(payload).await?;
    let detail = queries::find_one(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}
