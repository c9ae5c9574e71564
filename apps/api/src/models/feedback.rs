use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Where a piece of feedback came from. Detected during payload
/// normalization when the raw item carries no explicit `source` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackSource {
    Support,
    Nps,
    Appstore,
    Social,
}

impl FeedbackSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackSource::Support => "support",
            FeedbackSource::Nps => "nps",
            FeedbackSource::Appstore => "appstore",
            FeedbackSource::Social => "social",
        }
    }
}

/// Triage lifecycle. Forward-moving by convention, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    New,
    Reviewed,
    Assigned,
    Resolved,
}

impl FeedbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::New => "new",
            FeedbackStatus::Reviewed => "reviewed",
            FeedbackStatus::Assigned => "assigned",
            FeedbackStatus::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerTier {
    Free,
    Pro,
    Enterprise,
}

impl CustomerTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            CustomerTier::Free => "free",
            CustomerTier::Pro => "pro",
            CustomerTier::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(CustomerTier::Free),
            "pro" => Some(CustomerTier::Pro),
            "enterprise" => Some(CustomerTier::Enterprise),
            _ => None,
        }
    }
}

/// Triage SLA bucket derived from the final urgency score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendedAction {
    Immediate,
    SameDay,
    ThisWeek,
    Backlog,
}

/// The central persisted entity. Urgency, category, and sentiment are
/// write-once at ingestion time; only status/assigned_to/notes mutate later.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub category_id: Option<i32>,
    pub source: String,
    pub content: String,
    pub urgency_score: Option<i32>,
    pub urgency_reasoning: Option<String>,
    pub sentiment: String,
    pub status: String,
    pub frequency_count: i32,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Created lazily on first feedback referencing an email; email is the
/// natural key for upserts. Never deleted by the ingestion path.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CustomerRow {
    pub id: Uuid,
    pub email: String,
    pub tier: String,
    pub company_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-mostly category catalog row. Seeded once with the five fixed
/// categories; `keywords` drives the whole-word categorizer.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CategoryRow {
    pub id: i32,
    pub name: String,
    pub category_type: String,
    pub keywords: Vec<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_rounds_up() {
        let meta = PaginationMeta::new(1, 20, 41);
        assert_eq!(meta.total_pages, 3);
    }

    #[test]
    fn test_pagination_exact_multiple() {
        let meta = PaginationMeta::new(2, 20, 40);
        assert_eq!(meta.total_pages, 2);
    }

    #[test]
    fn test_pagination_empty() {
        let meta = PaginationMeta::new(1, 20, 0);
        assert_eq!(meta.total_pages, 0);
    }

    #[test]
    fn test_source_wire_form_is_lowercase() {
        let json = serde_json::to_string(&FeedbackSource::Appstore).unwrap();
        assert_eq!(json, "\"appstore\"");
        let back: FeedbackSource = serde_json::from_str("\"support\"").unwrap();
        assert_eq!(back, FeedbackSource::Support);
    }

    #[test]
    fn test_recommended_action_snake_case() {
        let json = serde_json::to_string(&RecommendedAction::SameDay).unwrap();
        assert_eq!(json, "\"same_day\"");
    }
}
