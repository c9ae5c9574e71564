use std::sync::Arc;

use sqlx::PgPool;

use crate::config::Config;
use crate::prioritization::UrgencyScorer;
use crate::store::FeedbackStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Write-path persistence seam. Production: `PgFeedbackStore`.
    pub store: Arc<dyn FeedbackStore>,
    /// Pluggable urgency scorer. Production: `LlmUrgencyScorer` with fallback.
    pub scorer: Arc<dyn UrgencyScorer>,
    pub config: Config,
}
