//! Urgency Scorer — assigns each feedback item a 0–100 urgency score with
//! reasoning and a recommended action.
//!
//! Two paths: the primary LLM path (best-effort, non-deterministic) and a
//! deterministic rule-based fallback that reproduces the same rubric without
//! a network. Provider errors never reach the caller — every input gets an
//! analysis.

pub mod fallback;
pub mod prompts;
pub mod scorer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::feedback::{CustomerTier, FeedbackSource, RecommendedAction};

pub use scorer::{LlmUrgencyScorer, UrgencyScorer};

/// Everything the scorer knows about one feedback item.
#[derive(Debug, Clone)]
pub struct UrgencyInput {
    pub content: String,
    pub customer_tier: Option<CustomerTier>,
    pub category: Option<String>,
    pub frequency_count: i32,
    pub created_at: DateTime<Utc>,
    pub source: FeedbackSource,
    pub metadata: Value,
}

/// Scoring outcome, identical in shape for both paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrgencyAnalysis {
    pub urgency_score: i32,
    pub reasoning: String,
    pub recommended_action: RecommendedAction,
}
