//! Dashboard queries over the feedback table. Runs directly against the pool
//! with `sqlx::QueryBuilder` for the dynamic filter set; only the write path
//! goes through the `FeedbackStore` seam.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::frequency::representative_keywords;
use crate::models::feedback::{
    CategoryRow, CustomerRow, FeedbackRow, FeedbackStatus, PaginationMeta,
};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;
const SIMILAR_LIMIT: i64 = 5;

#[derive(Debug, Default, Deserialize)]
pub struct FeedbackListParams {
    pub source: Option<String>,
    /// Category name, e.g. "Bug Report".
    pub category: Option<String>,
    pub customer_tier: Option<String>,
    pub status: Option<String>,
    pub sentiment: Option<String>,
    pub min_urgency: Option<i32>,
    pub max_urgency: Option<i32>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    /// Case-insensitive substring match over content.
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackWithTags {
    #[serde(flatten)]
    pub feedback: FeedbackRow,
    pub tags: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FeedbackListResponse {
    pub data: Vec<FeedbackWithTags>,
    pub pagination: PaginationMeta,
}

#[derive(Debug, Serialize)]
pub struct FeedbackDetail {
    #[serde(flatten)]
    pub feedback: FeedbackRow,
    pub customer: Option<CustomerRow>,
    pub category: Option<CategoryRow>,
    pub tags: Vec<String>,
    /// Up to five keyword-similar records, same-category first.
    pub similar: Vec<FeedbackRow>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateFeedbackRequest {
    pub status: Option<FeedbackStatus>,
    pub assigned_to: Option<String>,
    pub notes: Option<String>,
}

/// Appends the WHERE fragment shared by the count and data queries. Both
/// queries must apply identical filters or pagination totals drift.
fn apply_filters<'a>(qb: &mut QueryBuilder<'a, Postgres>, params: &'a FeedbackListParams) {
    if let Some(source) = &params.source {
        qb.push(" AND f.source = ").push_bind(source);
    }
    if let Some(category) = &params.category {
        qb.push(" AND c.name = ").push_bind(category);
    }
    if let Some(tier) = &params.customer_tier {
        qb.push(" AND cu.tier = ").push_bind(tier);
    }
    if let Some(status) = &params.status {
        qb.push(" AND f.status = ").push_bind(status);
    }
    if let Some(sentiment) = &params.sentiment {
        qb.push(" AND f.sentiment = ").push_bind(sentiment);
    }
    if let Some(min) = params.min_urgency {
        qb.push(" AND f.urgency_score >= ").push_bind(min);
    }
    if let Some(max) = params.max_urgency {
        qb.push(" AND f.urgency_score <= ").push_bind(max);
    }
    if let Some(from) = params.date_from {
        qb.push(" AND f.created_at >= ").push_bind(from);
    }
    if let Some(to) = params.date_to {
        qb.push(" AND f.created_at <= ").push_bind(to);
    }
    if let Some(search) = &params.search {
        qb.push(" AND f.content ILIKE ")
            .push_bind(format!("%{search}%"));
    }
}

/// Sort column whitelist — anything else falls back to `created_at`.
fn sort_column(params: &FeedbackListParams) -> &'static str {
    match params.sort_by.as_deref() {
        Some("urgency_score") => "urgency_score",
        Some("frequency_count") => "frequency_count",
        _ => "created_at",
    }
}

fn sort_direction(params: &FeedbackListParams) -> &'static str {
    match params.sort_order.as_deref() {
        Some("asc") => "ASC",
        _ => "DESC",
    }
}

const FROM_CLAUSE: &str = " FROM feedback f \
     LEFT JOIN categories c ON c.id = f.category_id \
     LEFT JOIN customers cu ON cu.id = f.customer_id \
     WHERE 1=1";

/// GET /api/feedback — filtered, sorted, paginated listing.
pub async fn find_all(
    pool: &PgPool,
    params: &FeedbackListParams,
) -> Result<FeedbackListResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = (page - 1) * limit;

    let mut count_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
    count_qb.push(FROM_CLAUSE);
    apply_filters(&mut count_qb, params);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut data_qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT f.*");
    data_qb.push(FROM_CLAUSE);
    apply_filters(&mut data_qb, params);
    data_qb.push(format!(
        " ORDER BY f.{} {} LIMIT ",
        sort_column(params),
        sort_direction(params)
    ));
    data_qb.push_bind(limit);
    data_qb.push(" OFFSET ");
    data_qb.push_bind(offset);

    let rows: Vec<FeedbackRow> = data_qb.build_query_as().fetch_all(pool).await?;
    let mut tags_by_id = load_tags(pool, rows.iter().map(|r| r.id).collect()).await?;

    let data = rows
        .into_iter()
        .map(|feedback| {
            let tags = tags_by_id.remove(&feedback.id).unwrap_or_default();
            FeedbackWithTags { feedback, tags }
        })
        .collect();

    Ok(FeedbackListResponse {
        data,
        pagination: PaginationMeta::new(page, limit, total),
    })
}

/// GET /api/feedback/:id — record plus its customer, category, tags, and
/// keyword-similar neighbors.
pub async fn find_one(pool: &PgPool, id: Uuid) -> Result<FeedbackDetail, AppError> {
    let feedback: FeedbackRow = sqlx::query_as("SELECT * FROM feedback WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Feedback {id} not found")))?;

    let customer: Option<CustomerRow> = match feedback.customer_id {
        Some(customer_id) => {
            sqlx::query_as("SELECT * FROM customers WHERE id = $1")
                .bind(customer_id)
                .fetch_optional(pool)
                .await?
        }
        None => None,
    };

    let category: Option<CategoryRow> = match feedback.category_id {
        Some(category_id) => {
            sqlx::query_as(
                "SELECT id, name, category_type, keywords, description \
                 FROM categories WHERE id = $1",
            )
            .bind(category_id)
            .fetch_optional(pool)
            .await?
        }
        None => None,
    };

    let tags: Vec<String> =
        sqlx::query_scalar("SELECT tag FROM feedback_tags WHERE feedback_id = $1 ORDER BY tag")
            .bind(id)
            .fetch_all(pool)
            .await?;

    let similar = find_similar(pool, &feedback).await?;

    Ok(FeedbackDetail {
        feedback,
        customer,
        category,
        tags,
        similar,
    })
}

/// PATCH /api/feedback/:id — mutates only the triage fields. Urgency,
/// category, and sentiment are write-once at ingestion and stay untouched.
pub async fn update(
    pool: &PgPool,
    id: Uuid,
    req: &UpdateFeedbackRequest,
) -> Result<FeedbackRow, AppError> {
    let row: Option<FeedbackRow> = sqlx::query_as(
        r#"
        UPDATE feedback SET
            status = COALESCE($2, status),
            assigned_to = COALESCE($3, assigned_to),
            notes = COALESCE($4, notes),
            updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.status.map(|s| s.as_str()))
    .bind(req.assigned_to.as_deref())
    .bind(req.notes.as_deref())
    .fetch_optional(pool)
    .await?;

    row.ok_or_else(|| AppError::NotFound(format!("Feedback {id} not found")))
}

/// Same keyword heuristic as the frequency detector: the first representative
/// keyword anchors the ILIKE search, same-category rows sort first.
async fn find_similar(pool: &PgPool, feedback: &FeedbackRow) -> Result<Vec<FeedbackRow>, AppError> {
    let keywords = representative_keywords(&feedback.content);
    let Some(keyword) = keywords.first() else {
        return Ok(Vec::new());
    };

    let rows: Vec<FeedbackRow> = sqlx::query_as(
        r#"
        SELECT * FROM feedback
        WHERE id != $1 AND content ILIKE $2
        ORDER BY (category_id IS NOT DISTINCT FROM $3) DESC, created_at DESC
        LIMIT $4
        "#,
    )
    .bind(feedback.id)
    .bind(format!("%{keyword}%"))
    .bind(feedback.category_id)
    .bind(SIMILAR_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

async fn load_tags(
    pool: &PgPool,
    ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, Vec<String>>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let pairs: Vec<(Uuid, String)> = sqlx::query_as(
        "SELECT feedback_id, tag FROM feedback_tags WHERE feedback_id = ANY($1) ORDER BY tag",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    let mut by_id: HashMap<Uuid, Vec<String>> = HashMap::new();
    for (feedback_id, tag) in pairs {
        by_id.entry(feedback_id).or_default().push(tag);
    }
    Ok(by_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_column_whitelist() {
        let mut params = FeedbackListParams::default();
        assert_eq!(sort_column(&params), "created_at");

        params.sort_by = Some("urgency_score".to_string());
        assert_eq!(sort_column(&params), "urgency_score");

        params.sort_by = Some("frequency_count".to_string());
        assert_eq!(sort_column(&params), "frequency_count");

        // injection attempts and typos collapse to the default
        params.sort_by = Some("created_at; DROP TABLE feedback".to_string());
        assert_eq!(sort_column(&params), "created_at");
    }

    #[test]
    fn test_sort_direction_defaults_desc() {
        let mut params = FeedbackListParams::default();
        assert_eq!(sort_direction(&params), "DESC");

        params.sort_order = Some("asc".to_string());
        assert_eq!(sort_direction(&params), "ASC");

        params.sort_order = Some("sideways".to_string());
        assert_eq!(sort_direction(&params), "DESC");
    }

    #[test]
    fn test_filters_bind_rather_than_interpolate() {
        let mut params = FeedbackListParams::default();
        params.search = Some("pay'; --".to_string());
        params.source = Some("support".to_string());

        let mut qb: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*)");
        qb.push(FROM_CLAUSE);
        apply_filters(&mut qb, &params);

        let sql = qb.sql();
        assert!(sql.contains("f.source = $1"));
        assert!(sql.contains("f.content ILIKE $2"));
        assert!(!sql.contains("pay"));
    }
}
