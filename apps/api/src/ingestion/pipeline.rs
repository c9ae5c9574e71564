//! Batch Ingestion Pipeline — staged execution over a batch of raw items.
//!
//! Stages (each operates on the survivors of the previous one):
//!   0. normalize every raw payload
//!   1. load the category catalog once for the whole batch
//!   2. per item: customer upsert, categorize, sentiment, frequency, tags
//!   3. urgency scoring in fixed-size sub-batches
//!   4. bulk-persist the scored records (fatal on failure)
//!   5. bulk-persist tag associations (best-effort)
//!
//! Per-item failures never abort the batch; every input index ends up either
//! in `feedback_ids` (via its record) or in `errors`, so callers can retry
//! exactly the items that failed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::categorization::{categorize, determine_sentiment, extract_tags, is_critical};
use crate::ingestion::frequency::similar_feedback_count;
use crate::ingestion::normalizer::{normalize_payload, NormalizationError, NormalizedFeedback};
use crate::models::feedback::{CustomerRow, CustomerTier, Sentiment};
use crate::prioritization::{UrgencyAnalysis, UrgencyInput, UrgencyScorer};
use crate::store::{FeedbackStore, NewFeedback};

/// Upper bound on concurrent LLM calls: sub-batches of this size are scored
/// one after another, with concurrency only inside a sub-batch.
pub const URGENCY_SUB_BATCH: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct BatchItemError {
    /// Original input index, stable across stage filtering.
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BatchIngestOutcome {
    pub success: bool,
    pub ingested_count: usize,
    pub failed_count: usize,
    pub feedback_ids: Vec<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<BatchItemError>>,
}

/// One item that survived stages 0–2. Carries its original input index so
/// errors and urgency results can always be traced back.
struct ProcessedItem {
    index: usize,
    normalized: NormalizedFeedback,
    customer: Option<CustomerRow>,
    category_id: Option<i32>,
    category_name: Option<String>,
    sentiment: Sentiment,
    frequency_count: i32,
    tags: Vec<String>,
}

pub struct IngestPipeline {
    store: Arc<dyn FeedbackStore>,
    scorer: Arc<dyn UrgencyScorer>,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn FeedbackStore>, scorer: Arc<dyn UrgencyScorer>) -> Self {
        Self { store, scorer }
    }

    /// Ingests a batch of raw feedback payloads.
    ///
    /// Invariant: `ingested_count + failed_count == items.len()`. Returns
    /// `Err` only for catastrophic failures (catalog load, bulk insert) —
    /// never for per-item problems.
    pub async fn create_batch(&self, items: Vec<Value>) -> Result<BatchIngestOutcome, AppError> {
        let total = items.len();
        info!("Starting batch ingestion of {total} items");
        let started = std::time::Instant::now();

        let mut errors: Vec<BatchItemError> = Vec::new();

        // Stage 0: normalize payloads
        info!("Stage 0: normalizing payloads");
        let mut normalized: Vec<(usize, NormalizedFeedback)> = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match normalize_payload(item) {
                Ok(n) => normalized.push((index, n)),
                Err(e) => {
                    warn!("Normalization failed for item {index}: {e}");
                    errors.push(BatchItemError {
                        index,
                        error: format!("Normalization failed: {e}"),
                    });
                }
            }
        }

        // Stage 1: load the category catalog once for the batch
        info!("Stage 1: loading category catalog");
        let categories = self.store.load_categories().await?;

        // Stage 2: customers, categorization, sentiment, frequency, tags
        info!("Stage 2: processing customers, categorization, and frequency");
        let mut processed: Vec<ProcessedItem> = Vec::new();
        for (index, item) in normalized {
            match self.process_item(index, item, &categories).await {
                Ok(p) => processed.push(p),
                Err(e) => {
                    warn!("Processing failed for item {index}: {e}");
                    errors.push(BatchItemError {
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }

        // Stage 3: urgency scoring in sub-batches of URGENCY_SUB_BATCH.
        // A failed sub-batch fails every item in it — no partial-sub-batch
        // success. This is a deliberate simplification.
        info!(
            "Stage 3: calculating urgency (sub-batches of {})",
            URGENCY_SUB_BATCH
        );
        let mut urgency_by_index: HashMap<usize, UrgencyAnalysis> = HashMap::new();
        for chunk in processed.chunks(URGENCY_SUB_BATCH) {
            let inputs: Vec<UrgencyInput> = chunk.iter().map(urgency_input).collect();
            match self.scorer.score_batch(&inputs).await {
                Ok(results) => {
                    for (item, analysis) in chunk.iter().zip(results) {
                        urgency_by_index.insert(item.index, analysis);
                    }
                }
                Err(e) => {
                    warn!("Urgency scoring failed for a sub-batch: {e}");
                    for item in chunk {
                        errors.push(BatchItemError {
                            index: item.index,
                            error: format!("Urgency calculation failed: {e}"),
                        });
                    }
                }
            }
        }

        // Stage 4: bulk insert. Ids are generated here, client-side, and
        // serve as the tag correlation keys in stage 5.
        info!("Stage 4: bulk inserting feedback");
        let scored: Vec<(&ProcessedItem, NewFeedback)> = processed
            .iter()
            .filter_map(|item| {
                urgency_by_index.get(&item.index).map(|urgency| {
                    (item, new_feedback(item, urgency))
                })
            })
            .collect();

        let feedback_ids = if scored.is_empty() {
            Vec::new()
        } else {
            let rows: Vec<NewFeedback> = scored.iter().map(|(_, row)| row.clone()).collect();
            self.store.insert_feedback(&rows).await?
        };

        // Stage 5: tag associations, best-effort
        info!("Stage 5: bulk inserting tags");
        let tag_pairs: Vec<(Uuid, String)> = scored
            .iter()
            .flat_map(|(item, row)| item.tags.iter().map(|t| (row.id, t.clone())))
            .collect();
        if !tag_pairs.is_empty() {
            if let Err(e) = self.store.insert_tags(&tag_pairs).await {
                warn!("Tag insert failed (ingestion unaffected): {e}");
            }
        }

        errors.sort_by_key(|e| e.index);
        let outcome = BatchIngestOutcome {
            success: true,
            ingested_count: feedback_ids.len(),
            failed_count: errors.len(),
            feedback_ids,
            errors: if errors.is_empty() {
                None
            } else {
                Some(errors)
            },
        };

        info!(
            "Batch ingestion complete: {} succeeded, {} failed ({:?})",
            outcome.ingested_count,
            outcome.failed_count,
            started.elapsed()
        );
        Ok(outcome)
    }

    /// Single-item ingestion: the same pipeline without batching. Errors that
    /// the batch path would collect per-item surface directly here.
    pub async fn create_one(&self, item: Value) -> Result<Uuid, AppError> {
        let normalized = normalize_payload(&item).map_err(|e| match e {
            // shape was recognized but the values are unusable
            NormalizationError::Invalid(_) => AppError::UnprocessableEntity(e.to_string()),
            _ => AppError::Validation(e.to_string()),
        })?;
        let categories = self.store.load_categories().await?;
        let processed = self.process_item(0, normalized, &categories).await?;

        let analyses = self
            .scorer
            .score_batch(std::slice::from_ref(&urgency_input(&processed)))
            .await?;
        let urgency = analyses
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("scorer returned no result")))?;

        let row = new_feedback(&processed, &urgency);
        let id = row.id;
        self.store.insert_feedback(std::slice::from_ref(&row)).await?;

        let tag_pairs: Vec<(Uuid, String)> =
            processed.tags.iter().map(|t| (id, t.clone())).collect();
        if !tag_pairs.is_empty() {
            if let Err(e) = self.store.insert_tags(&tag_pairs).await {
                warn!("Tag insert failed (ingestion unaffected): {e}");
            }
        }

        info!("Created feedback {id} with urgency {}", urgency.urgency_score);
        Ok(id)
    }

    async fn process_item(
        &self,
        index: usize,
        normalized: NormalizedFeedback,
        categories: &[crate::models::feedback::CategoryRow],
    ) -> Result<ProcessedItem, AppError> {
        let customer = match &normalized.customer_email {
            Some(email) => Some(
                self.store
                    .upsert_customer(
                        email,
                        normalized.customer_tier.unwrap_or(CustomerTier::Free),
                        normalized.customer_company.as_deref(),
                    )
                    .await?,
            ),
            None => None,
        };

        if is_critical(&normalized.content) {
            warn!("Critical keywords detected in item {index}");
        }

        let category = categorize(&normalized.content, categories);
        let sentiment = determine_sentiment(
            &normalized.content,
            category.map(|c| c.category_type.as_str()),
        );
        let frequency_count =
            similar_feedback_count(self.store.as_ref(), &normalized.content, category.map(|c| c.id))
                .await;
        let tags = extract_tags(&normalized.content, &normalized.metadata);

        Ok(ProcessedItem {
            index,
            category_id: category.map(|c| c.id),
            category_name: category.map(|c| c.name.clone()),
            customer,
            sentiment,
            frequency_count,
            tags,
            normalized,
        })
    }
}

fn urgency_input(item: &ProcessedItem) -> UrgencyInput {
    UrgencyInput {
        content: item.normalized.content.clone(),
        // The persisted customer's tier wins over whatever the payload claims
        customer_tier: item
            .customer
            .as_ref()
            .and_then(|c| CustomerTier::parse(&c.tier))
            .or(item.normalized.customer_tier),
        category: item.category_name.clone(),
        frequency_count: item.frequency_count,
        created_at: Utc::now(),
        source: item.normalized.source,
        metadata: item.normalized.metadata.clone(),
    }
}

fn new_feedback(item: &ProcessedItem, urgency: &UrgencyAnalysis) -> NewFeedback {
    NewFeedback {
        id: Uuid::new_v4(),
        customer_id: item.customer.as_ref().map(|c| c.id),
        category_id: item.category_id,
        source: item.normalized.source,
        content: item.normalized.content.clone(),
        urgency_score: urgency.urgency_score,
        urgency_reasoning: urgency.reasoning.clone(),
        sentiment: item.sentiment,
        frequency_count: item.frequency_count,
        metadata: item.normalized.metadata.clone(),
    }
}
