//! Deterministic rule-based urgency scoring, used whenever the LLM path
//! fails or returns an invalid result. Pure function of its input — no
//! network, no store, fully unit-testable.
//!
//! The five weighted factors and their point tables mirror the rubric in
//! `prompts.rs`: Customer Value 30, Severity 25, Frequency 20, Recency 15,
//! Business Impact 10. Severity and business-impact term lists are checked
//! in priority order — first matching tier wins, never cumulative.

use crate::models::feedback::{CustomerTier, RecommendedAction};
use crate::prioritization::prompts::hours_since;
use crate::prioritization::{UrgencyAnalysis, UrgencyInput};

/// Maps a final score onto a triage SLA bucket.
pub fn recommended_action_for(score: i32) -> RecommendedAction {
    if score >= 80 {
        RecommendedAction::Immediate
    } else if score >= 60 {
        RecommendedAction::SameDay
    } else if score >= 40 {
        RecommendedAction::ThisWeek
    } else {
        RecommendedAction::Backlog
    }
}

/// Rule-based urgency calculation.
pub fn fallback_urgency(input: &UrgencyInput) -> UrgencyAnalysis {
    let mut score = 0;
    let mut reasons: Vec<String> = Vec::new();
    let content = input.content.to_lowercase();

    // Customer Value (30%)
    match input.customer_tier {
        Some(CustomerTier::Enterprise) => {
            score += 30;
            reasons.push("enterprise customer".to_string());
        }
        Some(CustomerTier::Pro) => {
            score += 20;
            reasons.push("pro customer".to_string());
        }
        Some(CustomerTier::Free) => score += 10,
        None => score += 5,
    }

    // Severity (25%) — first matching tier wins
    if contains_any(&content, &["crash", "data loss", "security"]) {
        score += 25;
        reasons.push("critical issue detected".to_string());
    } else if contains_any(&content, &["payment", "checkout", "billing"]) {
        score += 20;
        reasons.push("revenue-affecting issue".to_string());
    } else if contains_any(&content, &["broken", "not working", "error"]) {
        score += 15;
        reasons.push("major functionality issue".to_string());
    } else if contains_any(&content, &["slow", "ux"]) {
        score += 10;
    } else {
        score += 5;
    }

    // Frequency (20%)
    if input.frequency_count >= 10 {
        score += 20;
        reasons.push(format!("{} similar reports", input.frequency_count));
    } else if input.frequency_count >= 5 {
        score += 15;
        reasons.push(format!("{} similar reports", input.frequency_count));
    } else if input.frequency_count >= 2 {
        score += 10;
        reasons.push(format!("{} similar reports", input.frequency_count));
    } else {
        score += 5;
    }

    // Recency (15%)
    let hours = hours_since(input);
    if hours <= 24.0 {
        score += 15;
        reasons.push("recent feedback".to_string());
    } else if hours <= 72.0 {
        score += 10;
    } else if hours <= 168.0 {
        score += 5;
    } else {
        score += 2;
    }

    // Business Impact (10%) — first matching tier wins
    if contains_any(&content, &["payment", "billing", "checkout"]) {
        score += 10;
    } else if contains_any(&content, &["signup", "login", "onboarding"]) {
        score += 7;
    } else if contains_any(&content, &["dashboard", "core", "main"]) {
        score += 5;
    } else {
        score += 2;
    }

    let reasoning = if reasons.is_empty() {
        "Standard urgency assessment based on available factors.".to_string()
    } else {
        format!("Urgency based on: {}.", reasons.join(", "))
    };

    // Rubric construction keeps the sum ≤ 100; clamp anyway.
    let urgency_score = score.clamp(0, 100);

    UrgencyAnalysis {
        urgency_score,
        reasoning,
        recommended_action: recommended_action_for(urgency_score),
    }
}

fn contains_any(content: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| content.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feedback::FeedbackSource;
    use chrono::{Duration, Utc};
    use serde_json::json;

    fn input(
        content: &str,
        tier: Option<CustomerTier>,
        frequency: i32,
        age_hours: i64,
    ) -> UrgencyInput {
        UrgencyInput {
            content: content.to_string(),
            customer_tier: tier,
            category: None,
            frequency_count: frequency,
            created_at: Utc::now() - Duration::hours(age_hours),
            source: FeedbackSource::Support,
            metadata: json!({}),
        }
    }

    #[test]
    fn test_enterprise_crash_high_frequency_scores_immediate() {
        // 30 (enterprise) + 25 (crash) + 20 (12 reports) + 15 (2h) + 2 = 92
        let analysis = fallback_urgency(&input(
            "app crash",
            Some(CustomerTier::Enterprise),
            12,
            2,
        ));
        assert!(analysis.urgency_score >= 90, "got {}", analysis.urgency_score);
        assert_eq!(analysis.recommended_action, RecommendedAction::Immediate);
    }

    #[test]
    fn test_enterprise_payment_failure_scores_immediate() {
        // 30 + 20 (payment severity) + 5 (1 report) + 15 (recent) + 10 (payment impact) = 80
        let analysis = fallback_urgency(&input(
            "Payment fails with 500 error",
            Some(CustomerTier::Enterprise),
            1,
            1,
        ));
        assert!(analysis.urgency_score >= 80, "got {}", analysis.urgency_score);
        assert_eq!(analysis.recommended_action, RecommendedAction::Immediate);
    }

    #[test]
    fn test_severity_tiers_are_first_match_wins() {
        // crash outranks payment even when both terms appear
        let with_both = fallback_urgency(&input("crash during payment", None, 1, 500));
        let crash_only = fallback_urgency(&input("crash during sync", None, 1, 500));
        // both get the 25pt severity tier; the payment one also gets the
        // 10pt business-impact tier instead of 2
        assert_eq!(with_both.urgency_score - crash_only.urgency_score, 8);
    }

    #[test]
    fn test_unknown_tier_minimal_input_is_backlog() {
        // 5 + 5 + 5 + 2 + 2 = 19
        let analysis = fallback_urgency(&input("some mild remark", None, 1, 1000));
        assert_eq!(analysis.urgency_score, 19);
        assert_eq!(analysis.recommended_action, RecommendedAction::Backlog);
        assert_eq!(
            analysis.reasoning,
            "Standard urgency assessment based on available factors."
        );
    }

    #[test]
    fn test_score_always_within_bounds() {
        let maxed = fallback_urgency(&input(
            "crash payment checkout",
            Some(CustomerTier::Enterprise),
            100,
            0,
        ));
        assert!(maxed.urgency_score <= 100);
        let minimal = fallback_urgency(&input("hello", Some(CustomerTier::Free), 1, 9999));
        assert!(minimal.urgency_score >= 0);
    }

    #[test]
    fn test_frequency_tiers() {
        let base = |f| fallback_urgency(&input("plain note", None, f, 1000)).urgency_score;
        // 5 (unknown tier) + 5 (severity floor) + 5 (1 report) + 2 (old) + 2 (impact floor)
        assert_eq!(base(1), 19);
        assert_eq!(base(2) - base(1), 5);
        assert_eq!(base(5) - base(1), 10);
        assert_eq!(base(10) - base(1), 15);
    }

    #[test]
    fn test_recency_tiers() {
        let at = |h| fallback_urgency(&input("plain note", None, 1, h)).urgency_score;
        assert_eq!(at(1) - at(1000), 13); // 15 vs 2
        assert_eq!(at(48) - at(1000), 8); // 10 vs 2
        assert_eq!(at(100) - at(1000), 3); // 5 vs 2
    }

    #[test]
    fn test_business_impact_tiers() {
        let score = |c: &str| fallback_urgency(&input(c, None, 1, 1000)).urgency_score;
        // baseline with no impact terms would be 19 (impact floor of 2)
        assert_eq!(score("signup flow confusing"), 24); // onboarding tier, +7
        assert_eq!(score("dashboard looks off"), 22); // core-feature tier, +5
    }

    #[test]
    fn test_reasoning_lists_fired_conditions() {
        let analysis = fallback_urgency(&input(
            "checkout crash",
            Some(CustomerTier::Enterprise),
            7,
            3,
        ));
        assert!(analysis.reasoning.contains("enterprise customer"));
        assert!(analysis.reasoning.contains("critical issue detected"));
        assert!(analysis.reasoning.contains("7 similar reports"));
        assert!(analysis.reasoning.contains("recent feedback"));
    }

    #[test]
    fn test_action_thresholds() {
        assert_eq!(recommended_action_for(80), RecommendedAction::Immediate);
        assert_eq!(recommended_action_for(79), RecommendedAction::SameDay);
        assert_eq!(recommended_action_for(60), RecommendedAction::SameDay);
        assert_eq!(recommended_action_for(59), RecommendedAction::ThisWeek);
        assert_eq!(recommended_action_for(40), RecommendedAction::ThisWeek);
        assert_eq!(recommended_action_for(39), RecommendedAction::Backlog);
    }
}
