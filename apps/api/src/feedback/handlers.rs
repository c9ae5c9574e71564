use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::queries::{
    self, FeedbackDetail, FeedbackListParams, FeedbackListResponse, UpdateFeedbackRequest,
};
use crate::models::feedback::FeedbackRow;
use crate::state::AppState;

/// GET /api/feedback
pub async fn handle_list_feedback(
    State(state): State<AppState>,
    Query(params): Query<FeedbackListParams>,
) -> Result<Json<FeedbackListResponse>, AppError> {
    let response = queries::find_all(&state.db, &params).await?;
    Ok(Json(response))
}

/// GET /api/feedback/:id
pub async fn handle_get_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FeedbackDetail>, AppError> {
    let detail = queries::find_one(&state.db, id).await?;
    Ok(Json(detail))
}

/// PATCH /api/feedback/:id
pub async fn handle_update_feedback(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateFeedbackRequest>,
) -> Result<Json<FeedbackRow>, AppError> {
    let updated = queries::update(&state.db, id, &req).await?;
    Ok(Json(updated))
}
