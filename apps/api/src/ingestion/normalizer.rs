//! Payload Normalizer — maps raw, source-specific feedback payloads onto the
//! canonical record the rest of the pipeline operates on.
//!
//! The four known shapes plus the canonical passthrough form a closed sum;
//! anything else is an explicit `UnknownShape` error, never an open dictionary.
//! Detection precedence is load-bearing: adversarial payloads can carry fields
//! from several shapes at once, and the first matching rule wins.

use serde::Deserialize;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::models::feedback::{CustomerTier, FeedbackSource};

#[derive(Debug, Error)]
pub enum NormalizationError {
    #[error("payload must be a JSON object")]
    NotAnObject,

    #[error("unable to determine feedback source from payload; include a \"source\" field or use source-specific fields")]
    UnknownShape,

    #[error("malformed {shape} payload: {reason}")]
    Malformed { shape: &'static str, reason: String },

    #[error("invalid payload: {0}")]
    Invalid(String),
}

/// Canonical feedback record produced by normalization. Pure data — no ids,
/// no timestamps; those are assigned downstream by the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeedback {
    pub source: FeedbackSource,
    pub content: String,
    pub customer_email: Option<String>,
    pub customer_tier: Option<CustomerTier>,
    pub customer_company: Option<String>,
    pub metadata: Value,
}

#[derive(Deserialize)]
struct CanonicalPayload {
    source: FeedbackSource,
    content: String,
    customer_email: Option<String>,
    customer_tier: Option<CustomerTier>,
    customer_company: Option<String>,
    metadata: Option<Value>,
}

#[derive(Deserialize)]
struct SupportTicketPayload {
    content: String,
    ticket_id: String,
    channel: String,
    customer_email: Option<String>,
    customer_tier: Option<CustomerTier>,
    customer_company: Option<String>,
    assigned_agent: Option<String>,
    resolution_time: Option<f64>,
}

#[derive(Deserialize)]
struct SurveyPayload {
    content: String,
    nps_score: i64,
    survey_campaign: Option<String>,
    response_date: Option<String>,
    customer_email: Option<String>,
    customer_tier: Option<CustomerTier>,
    customer_company: Option<String>,
}

#[derive(Deserialize)]
struct AppStoreReviewPayload {
    content: String,
    store: String,
    app_version: String,
    star_rating: i64,
    reviewer_username: Option<String>,
    customer_email: Option<String>,
    customer_tier: Option<CustomerTier>,
}

#[derive(Deserialize)]
struct SocialMentionPayload {
    content: String,
    platform: String,
    author_handle: String,
    engagement_count: Option<i64>,
    post_url: Option<String>,
    customer_email: Option<String>,
    customer_tier: Option<CustomerTier>,
}

/// Detects the payload shape and maps it to a `NormalizedFeedback`.
///
/// Precedence (first match wins):
/// 1. explicit `source` field — trusted canonical shape, passed through
/// 2. `ticket_id` + `channel` — support ticket
/// 3. `nps_score` — NPS survey
/// 4. `store` + `star_rating` + `app_version` — app-store review
/// 5. `platform` + `author_handle` — social mention
pub fn normalize_payload(payload: &Value) -> Result<NormalizedFeedback, NormalizationError> {
    let obj = payload.as_object().ok_or(NormalizationError::NotAnObject)?;

    if obj.contains_key("source") {
        return normalize_canonical(payload);
    }

    if obj.contains_key("ticket_id") && obj.contains_key("channel") {
        return normalize_support_ticket(payload);
    }

    if obj.contains_key("nps_score") {
        return normalize_survey(payload);
    }

    if obj.contains_key("store") && obj.contains_key("star_rating") && obj.contains_key("app_version")
    {
        return normalize_app_store_review(payload);
    }

    if obj.contains_key("platform") && obj.contains_key("author_handle") {
        return normalize_social_mention(payload);
    }

    Err(NormalizationError::UnknownShape)
}

fn normalize_canonical(payload: &Value) -> Result<NormalizedFeedback, NormalizationError> {
    let p: CanonicalPayload = parse(payload, "canonical")?;
    let content = require_content(&p.content)?;

    Ok(NormalizedFeedback {
        source: p.source,
        content,
        customer_email: p.customer_email,
        customer_tier: p.customer_tier,
        customer_company: p.customer_company,
        metadata: p.metadata.unwrap_or_else(|| json!({})),
    })
}

fn normalize_support_ticket(payload: &Value) -> Result<NormalizedFeedback, NormalizationError> {
    let p: SupportTicketPayload = parse(payload, "support ticket")?;
    let content = require_content(&p.content)?;

    let mut metadata = Map::new();
    metadata.insert("ticket_id".into(), json!(p.ticket_id));
    metadata.insert("channel".into(), json!(p.channel));
    if let Some(agent) = p.assigned_agent {
        metadata.insert("assigned_agent".into(), json!(agent));
    }
    if let Some(rt) = p.resolution_time {
        metadata.insert("resolution_time".into(), json!(rt));
    }

    Ok(NormalizedFeedback {
        source: FeedbackSource::Support,
        content,
        customer_email: p.customer_email,
        customer_tier: p.customer_tier,
        customer_company: p.customer_company,
        metadata: Value::Object(metadata),
    })
}

fn normalize_survey(payload: &Value) -> Result<NormalizedFeedback, NormalizationError> {
    let p: SurveyPayload = parse(payload, "NPS survey")?;
    let content = require_content(&p.content)?;

    if !(0..=10).contains(&p.nps_score) {
        return Err(NormalizationError::Invalid(format!(
            "nps_score must be between 0 and 10, got {}",
            p.nps_score
        )));
    }

    let mut metadata = Map::new();
    metadata.insert("nps_score".into(), json!(p.nps_score));
    if let Some(campaign) = p.survey_campaign {
        metadata.insert("survey_campaign".into(), json!(campaign));
    }
    if let Some(date) = p.response_date {
        metadata.insert("response_date".into(), json!(date));
    }

    Ok(NormalizedFeedback {
        source: FeedbackSource::Nps,
        content,
        customer_email: p.customer_email,
        customer_tier: p.customer_tier,
        customer_company: p.customer_company,
        metadata: Value::Object(metadata),
    })
}

fn normalize_app_store_review(payload: &Value) -> Result<NormalizedFeedback, NormalizationError> {
    let p: AppStoreReviewPayload = parse(payload, "app-store review")?;
    let content = require_content(&p.content)?;

    if !(1..=5).contains(&p.star_rating) {
        return Err(NormalizationError::Invalid(format!(
            "star_rating must be between 1 and 5, got {}",
            p.star_rating
        )));
    }

    let mut metadata = Map::new();
    metadata.insert("store".into(), json!(p.store));
    metadata.insert("app_version".into(), json!(p.app_version));
    metadata.insert("star_rating".into(), json!(p.star_rating));
    if let Some(username) = p.reviewer_username {
        metadata.insert("reviewer_username".into(), json!(username));
    }

    Ok(NormalizedFeedback {
        source: FeedbackSource::Appstore,
        content,
        customer_email: p.customer_email,
        customer_tier: p.customer_tier,
        customer_company: None,
        metadata: Value::Object(metadata),
    })
}

fn normalize_social_mention(payload: &Value) -> Result<NormalizedFeedback, NormalizationError> {
    let p: SocialMentionPayload = parse(payload, "social mention")?;
    let content = require_content(&p.content)?;

    let mut metadata = Map::new();
    metadata.insert("platform".into(), json!(p.platform));
    metadata.insert("author_handle".into(), json!(p.author_handle));
    if let Some(count) = p.engagement_count {
        metadata.insert("engagement_count".into(), json!(count));
    }
    if let Some(url) = p.post_url {
        metadata.insert("post_url".into(), json!(url));
    }

    Ok(NormalizedFeedback {
        source: FeedbackSource::Social,
        content,
        customer_email: p.customer_email,
        customer_tier: p.customer_tier,
        customer_company: None,
        metadata: Value::Object(metadata),
    })
}

fn parse<T: serde::de::DeserializeOwned>(
    payload: &Value,
    shape: &'static str,
) -> Result<T, NormalizationError> {
    serde_json::from_value(payload.clone()).map_err(|e| NormalizationError::Malformed {
        shape,
        reason: e.to_string(),
    })
}

fn require_content(content: &str) -> Result<String, NormalizationError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(NormalizationError::Invalid(
            "content must not be empty".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_support_ticket_shape_detected() {
        let payload = json!({
            "content": "Cannot log in since this morning",
            "ticket_id": "TICKET-42",
            "channel": "email",
            "customer_email": "ops@megacorp.io",
            "customer_tier": "enterprise",
            "assigned_agent": "sarah@company.com"
        });

        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized.source, FeedbackSource::Support);
        assert_eq!(normalized.metadata["ticket_id"], "TICKET-42");
        assert_eq!(normalized.metadata["channel"], "email");
        assert_eq!(normalized.metadata["assigned_agent"], "sarah@company.com");
        assert_eq!(normalized.customer_tier, Some(CustomerTier::Enterprise));
    }

    #[test]
    fn test_survey_shape_detected() {
        let payload = json!({
            "content": "Would recommend to a colleague",
            "nps_score": 9,
            "survey_campaign": "Q1-2026"
        });

        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized.source, FeedbackSource::Nps);
        assert_eq!(normalized.metadata["nps_score"], 9);
        assert_eq!(normalized.metadata["survey_campaign"], "Q1-2026");
    }

    #[test]
    fn test_app_store_review_shape_detected() {
        let payload = json!({
            "content": "Crashes on launch after the update",
            "store": "ios",
            "star_rating": 1,
            "app_version": "2.1.0",
            "reviewer_username": "frustrated_manager"
        });

        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized.source, FeedbackSource::Appstore);
        assert_eq!(normalized.metadata["store"], "ios");
        assert_eq!(normalized.metadata["star_rating"], 1);
        assert_eq!(normalized.metadata["app_version"], "2.1.0");
    }

    #[test]
    fn test_app_store_review_requires_all_three_fields() {
        // `store` + `star_rating` without `app_version` must not match rule 4
        let payload = json!({
            "content": "Nice app",
            "store": "ios",
            "star_rating": 4
        });

        assert!(matches!(
            normalize_payload(&payload),
            Err(NormalizationError::UnknownShape)
        ));
    }

    #[test]
    fn test_social_mention_shape_detected() {
        let payload = json!({
            "content": "Their dashboard is down again",
            "platform": "twitter",
            "author_handle": "@dev_ops_dan",
            "engagement_count": 120
        });

        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized.source, FeedbackSource::Social);
        assert_eq!(normalized.metadata["platform"], "twitter");
        assert_eq!(normalized.metadata["author_handle"], "@dev_ops_dan");
        assert_eq!(normalized.metadata["engagement_count"], 120);
    }

    #[test]
    fn test_canonical_passthrough() {
        let payload = json!({
            "source": "support",
            "content": "Export is broken",
            "metadata": { "ticket_id": "T-9" }
        });

        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized.source, FeedbackSource::Support);
        assert_eq!(normalized.metadata["ticket_id"], "T-9");
    }

    #[test]
    fn test_canonical_without_metadata_defaults_to_empty_object() {
        let payload = json!({ "source": "social", "content": "hello" });
        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized.metadata, json!({}));
    }

    #[test]
    fn test_ticket_fields_take_precedence_over_nps() {
        // Adversarial payload carrying both shapes — rule 2 wins over rule 3
        let payload = json!({
            "content": "Mixed payload",
            "ticket_id": "TICKET-1",
            "channel": "chat",
            "nps_score": 3
        });

        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized.source, FeedbackSource::Support);
        assert!(normalized.metadata.get("nps_score").is_none());
    }

    #[test]
    fn test_explicit_source_wins_over_everything() {
        let payload = json!({
            "source": "nps",
            "content": "Score below",
            "ticket_id": "TICKET-1",
            "channel": "chat"
        });

        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized.source, FeedbackSource::Nps);
    }

    #[test]
    fn test_unrecognized_shape_errors() {
        let payload = json!({ "content": "who am I" });
        assert!(matches!(
            normalize_payload(&payload),
            Err(NormalizationError::UnknownShape)
        ));
    }

    #[test]
    fn test_non_object_payload_errors() {
        assert!(matches!(
            normalize_payload(&json!("just a string")),
            Err(NormalizationError::NotAnObject)
        ));
    }

    #[test]
    fn test_empty_content_rejected() {
        let payload = json!({
            "content": "   ",
            "ticket_id": "TICKET-2",
            "channel": "phone"
        });
        assert!(matches!(
            normalize_payload(&payload),
            Err(NormalizationError::Invalid(_))
        ));
    }

    #[test]
    fn test_nps_score_out_of_range_rejected() {
        let payload = json!({ "content": "meh", "nps_score": 11 });
        assert!(matches!(
            normalize_payload(&payload),
            Err(NormalizationError::Invalid(_))
        ));
    }

    #[test]
    fn test_star_rating_out_of_range_rejected() {
        let payload = json!({
            "content": "ok app",
            "store": "android",
            "star_rating": 6,
            "app_version": "1.0"
        });
        assert!(matches!(
            normalize_payload(&payload),
            Err(NormalizationError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_required_field_is_malformed() {
        // ticket shape detected but content missing entirely
        let payload = json!({ "ticket_id": "T-1", "channel": "email" });
        assert!(matches!(
            normalize_payload(&payload),
            Err(NormalizationError::Malformed { shape: "support ticket", .. })
        ));
    }

    #[test]
    fn test_optional_metadata_fields_omitted_when_absent() {
        let payload = json!({
            "content": "Slow dashboard",
            "ticket_id": "T-3",
            "channel": "chat"
        });
        let normalized = normalize_payload(&payload).unwrap();
        assert!(normalized.metadata.get("assigned_agent").is_none());
        assert!(normalized.metadata.get("resolution_time").is_none());
    }
}
