//! Prompt construction for the LLM urgency path. The rubric embedded here and
//! the rule tables in `fallback.rs` must stay in lockstep — the fallback is
//! the deterministic rendition of this exact rubric.

use chrono::Utc;
use serde_json::Value;

use crate::prioritization::UrgencyInput;

/// System prompt — enforces the triage persona and JSON-only output.
pub const TRIAGE_SYSTEM: &str = "You are a customer feedback triage expert. \
    Analyze feedback and assign urgency scores based on multiple factors. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";

/// Builds the urgency analysis prompt for one feedback item.
pub fn build_urgency_prompt(input: &UrgencyInput) -> String {
    let tier = input
        .customer_tier
        .map(|t| t.as_str())
        .unwrap_or("unknown");
    let category = input.category.as_deref().unwrap_or("uncategorized");
    let time_ago = time_ago(hours_since(input));
    let metadata_info = metadata_lines(&input.metadata);

    format!(
        r#"Analyze the following feedback and assign an urgency score (0-100) based on these criteria:

FEEDBACK DETAILS:
- Content: "{content}"
- Source: {source}
- Customer Tier: {tier}
- Category: {category}
- Similar reports in last 30 days: {frequency}{metadata_info}
- Received: {time_ago}

SCORING GUIDELINES:
- Customer Value (30%): enterprise=30pts, pro=20pts, free=10pts, unknown=5pts
- Severity (25%):
  * Crashes, data loss, security issues: 25pts
  * Payment/checkout blocking issues: 20pts
  * Major feature broken: 15pts
  * UX degradation: 10pts
  * Cosmetic issues: 5pts
- Frequency (20%):
  * 10+ similar reports: 20pts
  * 5-9 reports: 15pts
  * 2-4 reports: 10pts
  * 1 report: 5pts
- Recency (15%):
  * Last 24h: 15pts
  * Last 3 days: 10pts
  * Last week: 5pts
  * Older: 2pts
- Business Impact (10%):
  * Revenue-affecting (payment, billing, checkout): 10pts
  * Onboarding-affecting (signup, login, first-time experience): 7pts
  * Core feature: 5pts
  * Nice-to-have: 2pts

Consider:
- Low NPS scores (0-6) or low star ratings (1-2) indicate higher urgency
- Multiple users reporting the same issue increases urgency
- Issues affecting enterprise customers are more urgent
- Blocking issues (cannot proceed) are more urgent than non-blocking

OUTPUT FORMAT (JSON only, no other text):
{{
  "urgency_score": <number 0-100>,
  "reasoning": "<2-3 sentence explanation of why this score was assigned>",
  "recommended_action": "<immediate|same_day|this_week|backlog>"
}}"#,
        content = input.content,
        source = input.source.as_str(),
        frequency = input.frequency_count,
    )
}

/// Hours elapsed since the item was created. Clock-skewed future timestamps
/// clamp to zero.
pub fn hours_since(input: &UrgencyInput) -> f64 {
    let elapsed = Utc::now().signed_duration_since(input.created_at);
    (elapsed.num_seconds() as f64 / 3600.0).max(0.0)
}

fn time_ago(hours: f64) -> String {
    if hours < 1.0 {
        "less than 1 hour ago".to_string()
    } else if hours < 24.0 {
        format!("{} hours ago", hours.round() as i64)
    } else if hours < 168.0 {
        format!("{} days ago", (hours / 24.0).round() as i64)
    } else {
        format!("{} weeks ago", (hours / 168.0).round() as i64)
    }
}

/// Source-specific metadata hints appended to the prompt when present.
fn metadata_lines(metadata: &Value) -> String {
    let mut lines = String::new();
    if let Some(nps) = metadata.get("nps_score") {
        lines.push_str(&format!("\n- NPS Score: {nps}/10"));
    }
    if let Some(stars) = metadata.get("star_rating") {
        lines.push_str(&format!("\n- Star Rating: {stars}/5"));
    }
    if let Some(channel) = metadata.get("channel").and_then(Value::as_str) {
        lines.push_str(&format!("\n- Channel: {channel}"));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feedback::{CustomerTier, FeedbackSource};
    use chrono::Duration;
    use serde_json::json;

    fn input() -> UrgencyInput {
        UrgencyInput {
            content: "Payment fails with 500 error".to_string(),
            customer_tier: Some(CustomerTier::Enterprise),
            category: Some("Bug Report".to_string()),
            frequency_count: 4,
            created_at: Utc::now() - Duration::hours(2),
            source: FeedbackSource::Support,
            metadata: json!({ "channel": "email" }),
        }
    }

    #[test]
    fn test_prompt_embeds_feedback_details() {
        let prompt = build_urgency_prompt(&input());
        assert!(prompt.contains("Payment fails with 500 error"));
        assert!(prompt.contains("Customer Tier: enterprise"));
        assert!(prompt.contains("Category: Bug Report"));
        assert!(prompt.contains("Similar reports in last 30 days: 4"));
        assert!(prompt.contains("- Channel: email"));
        assert!(prompt.contains("2 hours ago"));
    }

    #[test]
    fn test_prompt_embeds_rubric_and_output_contract() {
        let prompt = build_urgency_prompt(&input());
        assert!(prompt.contains("Customer Value (30%)"));
        assert!(prompt.contains("Severity (25%)"));
        assert!(prompt.contains("Frequency (20%)"));
        assert!(prompt.contains("Recency (15%)"));
        assert!(prompt.contains("Business Impact (10%)"));
        assert!(prompt.contains("\"urgency_score\""));
        assert!(prompt.contains("<immediate|same_day|this_week|backlog>"));
    }

    #[test]
    fn test_prompt_unknown_tier_and_category_defaults() {
        let mut i = input();
        i.customer_tier = None;
        i.category = None;
        let prompt = build_urgency_prompt(&i);
        assert!(prompt.contains("Customer Tier: unknown"));
        assert!(prompt.contains("Category: uncategorized"));
    }

    #[test]
    fn test_metadata_lines_for_survey_and_review() {
        let lines = metadata_lines(&json!({ "nps_score": 3, "star_rating": 1 }));
        assert!(lines.contains("NPS Score: 3/10"));
        assert!(lines.contains("Star Rating: 1/5"));
        assert!(metadata_lines(&json!({})).is_empty());
    }

    #[test]
    fn test_time_ago_buckets() {
        assert_eq!(time_ago(0.4), "less than 1 hour ago");
        assert_eq!(time_ago(5.0), "5 hours ago");
        assert_eq!(time_ago(49.0), "2 days ago");
        assert_eq!(time_ago(400.0), "2 weeks ago");
    }
}
