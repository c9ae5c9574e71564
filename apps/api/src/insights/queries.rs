use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::errors::AppError;

/// Projection used by all insights aggregations: feedback joined with its
/// category name/type. Loaded once per request, aggregated in memory.
#[derive(Debug, Clone, FromRow)]
pub struct InsightRow {
    pub id: Uuid,
    pub content: String,
    pub source: String,
    pub sentiment: String,
    pub status: String,
    pub urgency_score: Option<i32>,
    pub frequency_count: i32,
    pub category_name: Option<String>,
    pub category_type: Option<String>,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

const SELECT_INSIGHT: &str = r#"
    SELECT f.id, f.content, f.source, f.sentiment, f.status,
           f.urgency_score, f.frequency_count,
           c.name AS category_name, c.category_type,
           f.metadata, f.created_at
    FROM feedback f
    LEFT JOIN categories c ON c.id = f.category_id
"#;

/// All feedback created in `[from, to)`, newest first.
pub async fn fetch_window(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<InsightRow>, AppError> {
    let rows: Vec<InsightRow> = sqlx::query_as(&format!(
        "{SELECT_INSIGHT} WHERE f.created_at >= $1 AND f.created_at < $2 \
         ORDER BY f.created_at DESC"
    ))
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Row count in `[from, to)` — used for the previous-period comparison
/// without materializing the rows.
pub async fn count_window(
    pool: &PgPool,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM feedback WHERE created_at >= $1 AND created_at < $2",
    )
    .bind(from)
    .bind(to)
    .fetch_one(pool)
    .await?;
    Ok(count)
}

/// Scored feedback at or above `min_urgency` created since `since`, most
/// urgent first.
pub async fn fetch_urgent(
    pool: &PgPool,
    min_urgency: i32,
    since: DateTime<Utc>,
) -> Result<Vec<InsightRow>, AppError> {
    let rows: Vec<InsightRow> = sqlx::query_as(&format!(
        "{SELECT_INSIGHT} WHERE f.urgency_score >= $1 AND f.created_at >= $2 \
         ORDER BY f.urgency_score DESC, f.created_at DESC"
    ))
    .bind(min_urgency)
    .bind(since)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
