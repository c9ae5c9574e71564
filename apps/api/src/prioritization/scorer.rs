use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::feedback::RecommendedAction;
use crate::prioritization::fallback::{fallback_urgency, recommended_action_for};
use crate::prioritization::prompts::{build_urgency_prompt, TRIAGE_SYSTEM};
use crate::prioritization::{UrgencyAnalysis, UrgencyInput};

/// The urgency scorer seam. Carried in `AppState` as `Arc<dyn UrgencyScorer>`
/// so the pipeline can be exercised with fakes.
///
/// Contract: a returned `Ok` has one analysis per input, in input order.
/// An `Err` fails the whole sub-batch the pipeline handed in.
#[async_trait]
pub trait UrgencyScorer: Send + Sync {
    async fn score_batch(&self, inputs: &[UrgencyInput]) -> Result<Vec<UrgencyAnalysis>, AppError>;
}

/// Loosely-typed provider output. Everything is optional so a structurally
/// valid but incomplete response still parses and gets validated here rather
/// than bubbling a JSON error.
#[derive(Debug, Deserialize)]
struct RawUrgency {
    urgency_score: Option<f64>,
    reasoning: Option<String>,
    recommended_action: Option<RecommendedAction>,
}

/// Pure decision boundary between the two scoring paths: only an in-range
/// numeric score counts as a usable provider result.
pub fn is_valid_score(score: f64) -> bool {
    score.is_finite() && (0.0..=100.0).contains(&score)
}

/// Production scorer: best-effort LLM call per item, deterministic fallback
/// on any failure or invalid output. Never surfaces provider errors.
#[derive(Clone)]
pub struct LlmUrgencyScorer {
    llm: LlmClient,
}

impl LlmUrgencyScorer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }

    async fn score_one(&self, input: &UrgencyInput) -> UrgencyAnalysis {
        let prompt = build_urgency_prompt(input);

        match self.llm.call_json::<RawUrgency>(&prompt, TRIAGE_SYSTEM).await {
            Ok(raw) => match raw.urgency_score.filter(|s| is_valid_score(*s)) {
                Some(score) => {
                    let urgency_score = score.round() as i32;
                    debug!("LLM urgency score: {urgency_score}");
                    UrgencyAnalysis {
                        urgency_score,
                        reasoning: raw.reasoning.unwrap_or_else(|| {
                            "Urgency assessed by triage model.".to_string()
                        }),
                        recommended_action: raw
                            .recommended_action
                            .unwrap_or_else(|| recommended_action_for(urgency_score)),
                    }
                }
                None => {
                    warn!("Invalid urgency score from LLM, using fallback scoring");
                    fallback_urgency(input)
                }
            },
            Err(e) => {
                warn!("LLM urgency call failed ({e}), using fallback scoring");
                fallback_urgency(input)
            }
        }
    }
}

#[async_trait]
impl UrgencyScorer for LlmUrgencyScorer {
    /// Scores one pipeline sub-batch. The calls inside a sub-batch are issued
    /// concurrently — this is the only genuinely parallel, high-latency spot
    /// in the pipeline; the pipeline bounds it by handing in at most ten
    /// inputs at a time.
    async fn score_batch(&self, inputs: &[UrgencyInput]) -> Result<Vec<UrgencyAnalysis>, AppError> {
        let mut tasks = tokio::task::JoinSet::new();
        for (idx, input) in inputs.iter().cloned().enumerate() {
            let scorer = self.clone();
            tasks.spawn(async move { (idx, scorer.score_one(&input).await) });
        }

        let mut results: Vec<Option<UrgencyAnalysis>> = vec![None; inputs.len()];
        while let Some(joined) = tasks.join_next().await {
            let (idx, analysis) =
                joined.map_err(|e| AppError::Llm(format!("urgency task failed: {e}")))?;
            results[idx] = Some(analysis);
        }

        results
            .into_iter()
            .map(|r| {
                r.ok_or_else(|| AppError::Internal(anyhow::anyhow!("missing urgency result")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_score_bounds() {
        assert!(is_valid_score(0.0));
        assert!(is_valid_score(100.0));
        assert!(is_valid_score(54.5));
        assert!(!is_valid_score(-1.0));
        assert!(!is_valid_score(100.1));
        assert!(!is_valid_score(f64::NAN));
        assert!(!is_valid_score(f64::INFINITY));
    }

    #[test]
    fn test_raw_urgency_tolerates_missing_fields() {
        let raw: RawUrgency = serde_json::from_str("{\"urgency_score\": 72}").unwrap();
        assert_eq!(raw.urgency_score, Some(72.0));
        assert!(raw.reasoning.is_none());
        assert!(raw.recommended_action.is_none());
    }

    #[test]
    fn test_raw_urgency_rejects_non_numeric_score_gracefully() {
        // a string score parses to None via the optional field, not an error
        let raw: Result<RawUrgency, _> =
            serde_json::from_str("{\"urgency_score\": \"high\", \"reasoning\": \"x\"}");
        // serde rejects the wrong type; caller treats parse failure as provider error
        assert!(raw.is_err());
    }

    #[test]
    fn test_raw_urgency_parses_full_response() {
        let raw: RawUrgency = serde_json::from_str(
            "{\"urgency_score\": 85, \"reasoning\": \"enterprise blocker\", \"recommended_action\": \"immediate\"}",
        )
        .unwrap();
        assert_eq!(raw.urgency_score, Some(85.0));
        assert_eq!(raw.recommended_action, Some(RecommendedAction::Immediate));
    }
}
