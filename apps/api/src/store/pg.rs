use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::{CategoryRow, CustomerRow, CustomerTier};
use crate::store::{FeedbackStore, NewFeedback};

/// PostgreSQL-backed store used in production.
#[derive(Clone)]
pub struct PgFeedbackStore {
    pool: PgPool,
}

impl PgFeedbackStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FeedbackStore for PgFeedbackStore {
    async fn load_categories(&self) -> Result<Vec<CategoryRow>, AppError> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, category_type, keywords, description FROM categories ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_customer(
        &self,
        email: &str,
        tier: CustomerTier,
        company_name: Option<&str>,
    ) -> Result<CustomerRow, AppError> {
        // ON CONFLICT touches only updated_at, so an existing customer keeps
        // its tier and company; RETURNING hands back the surviving row.
        let row: CustomerRow = sqlx::query_as(
            r#"
            INSERT INTO customers (id, email, tier, company_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (email) DO UPDATE SET updated_at = now()
            RETURNING id, email, tier, company_name, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(tier.as_str())
        .bind(company_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn count_containing(
        &self,
        keyword: &str,
        category_id: Option<i32>,
        since: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let pattern = format!("%{keyword}%");
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM feedback
            WHERE created_at >= $1
              AND content ILIKE $2
              AND ($3::int IS NULL OR category_id = $3)
            "#,
        )
        .bind(since)
        .bind(pattern)
        .bind(category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn insert_feedback(&self, rows: &[NewFeedback]) -> Result<Vec<Uuid>, AppError> {
        let mut tx = self.pool.begin().await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO feedback
                    (id, customer_id, category_id, source, content,
                     urgency_score, urgency_reasoning, sentiment, status,
                     frequency_count, metadata)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'new', $9, $10)
                "#,
            )
            .bind(row.id)
            .bind(row.customer_id)
            .bind(row.category_id)
            .bind(row.source.as_str())
            .bind(&row.content)
            .bind(row.urgency_score)
            .bind(&row.urgency_reasoning)
            .bind(row.sentiment.as_str())
            .bind(row.frequency_count)
            .bind(&row.metadata)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(rows.iter().map(|r| r.id).collect())
    }

    async fn insert_tags(&self, pairs: &[(Uuid, String)]) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for (feedback_id, tag) in pairs {
            sqlx::query("INSERT INTO feedback_tags (feedback_id, tag) VALUES ($1, $2)")
                .bind(feedback_id)
                .bind(tag)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
