//! Persistence seam for the ingestion pipeline.
//!
//! The pipeline never touches `sqlx` directly — it talks to `FeedbackStore`,
//! carried in `AppState` as `Arc<dyn FeedbackStore>` so tests can substitute
//! an in-memory fake. The read-side query layer (`feedback`, `insights`)
//! queries the pool directly; only the write path needs this seam.

pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::{
    CategoryRow, CustomerRow, CustomerTier, FeedbackSource, Sentiment,
};

pub use pg::PgFeedbackStore;

/// A fully-processed feedback record ready for bulk insert. `id` is generated
/// client-side and doubles as the correlation key for tag association —
/// we never rely on the store echoing rows back in a particular order.
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub category_id: Option<i32>,
    pub source: FeedbackSource,
    pub content: String,
    pub urgency_score: i32,
    pub urgency_reasoning: String,
    pub sentiment: Sentiment,
    pub frequency_count: i32,
    pub metadata: Value,
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Loads the full category catalog (small, read-mostly).
    async fn load_categories(&self) -> Result<Vec<CategoryRow>, AppError>;

    /// Resolves or lazily creates a customer by email. An existing row wins:
    /// the stored tier is never overwritten by ingestion.
    async fn upsert_customer(
        &self,
        email: &str,
        tier: CustomerTier,
        company_name: Option<&str>,
    ) -> Result<CustomerRow, AppError>;

    /// Counts persisted feedback created at or after `since` whose content
    /// contains `keyword` (case-insensitive substring), optionally filtered
    /// to one category.
    async fn count_containing(
        &self,
        keyword: &str,
        category_id: Option<i32>,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError>;

    /// Bulk-persists feedback records. All-or-nothing: any failure is fatal
    /// to the whole batch (no partial insert capability is assumed).
    /// Returns the ids in input order.
    async fn insert_feedback(&self, rows: &[NewFeedback]) -> Result<Vec<Uuid>, AppError>;

    /// Bulk-persists (feedback_id, tag) associations. Callers treat failure
    /// as best-effort enrichment, not batch failure.
    async fn insert_tags(&self, pairs: &[(Uuid, String)]) -> Result<(), AppError>;
}
