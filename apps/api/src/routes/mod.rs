pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::feedback::handlers as feedback;
use crate::ingestion::handlers as ingestion;
use crate::insights::handlers as insights;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Ingestion
        .route(
            "/api/feedback",
            post(ingestion::handle_create_feedback).get(feedback::handle_list_feedback),
        )
        .route("/api/feedback/batch", post(ingestion::handle_create_batch))
        // Query & triage
        .route(
            "/api/feedback/:id",
            get(feedback::handle_get_feedback).patch(feedback::handle_update_feedback),
        )
        // Insights
        .route("/api/insights/urgent", get(insights::handle_urgent))
        .route("/api/insights/trends", get(insights::handle_trends))
        .route("/api/insights/summary", get(insights::handle_summary))
        .with_state(state)
}
