use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::insights::aggregate::{
    bucket_key, calculate_nps, change_percent, count_by, most_common_theme, response_rate,
    GroupBy,
};
use crate::insights::queries::{self, InsightRow};
use crate::state::AppState;

const DEFAULT_MIN_URGENCY: i32 = 70;
const DEFAULT_URGENT_HOURS: i64 = 24;
const URGENT_LIST_LIMIT: usize = 50;
const TOP_N: usize = 5;

#[derive(Debug, Deserialize)]
pub struct UrgentParams {
    pub min_urgency: Option<i32>,
    pub hours: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct UrgentItem {
    pub id: Uuid,
    pub content: String,
    pub source: String,
    pub urgency_score: i32,
    pub frequency_count: i32,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct UrgentSummary {
    pub total_urgent: usize,
    /// Score 90 and above.
    pub critical_count: usize,
    /// Score 70–89.
    pub high_count: usize,
    pub by_category: Vec<CountEntry>,
}

#[derive(Debug, Serialize)]
pub struct CountEntry {
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct UrgentResponse {
    pub data: Vec<UrgentItem>,
    pub summary: UrgentSummary,
}

/// GET /api/insights/urgent — the triage queue: most urgent feedback within
/// a recency window, capped at 50 rows. The summary covers every matching
/// row, not just the returned page.
pub async fn handle_urgent(
    State(state): State<AppState>,
    Query(params): Query<UrgentParams>,
) -> Result<Json<UrgentResponse>, AppError> {
    let min_urgency = params.min_urgency.unwrap_or(DEFAULT_MIN_URGENCY);
    let hours = params.hours.unwrap_or(DEFAULT_URGENT_HOURS).max(1);
    let since = Utc::now() - Duration::hours(hours);

    let rows = queries::fetch_urgent(&state.db, min_urgency, since).await?;

    let critical_count = rows
        .iter()
        .filter(|r| r.urgency_score.unwrap_or(0) >= 90)
        .count();
    let high_count = rows
        .iter()
        .filter(|r| (70..=89).contains(&r.urgency_score.unwrap_or(0)))
        .count();
    let by_category = count_entries(rows.iter().filter_map(|r| r.category_name.as_deref()));

    let summary = UrgentSummary {
        total_urgent: rows.len(),
        critical_count,
        high_count,
        by_category,
    };

    let data = rows
        .into_iter()
        .take(URGENT_LIST_LIMIT)
        .map(|r| UrgentItem {
            id: r.id,
            content: r.content,
            source: r.source,
            urgency_score: r.urgency_score.unwrap_or(0),
            frequency_count: r.frequency_count,
            category: r.category_name,
            created_at: r.created_at,
        })
        .collect();

    Ok(Json(UrgentResponse { data, summary }))
}

#[derive(Debug, Deserialize)]
pub struct TrendsParams {
    /// day | week | month — window length, default week.
    pub period: Option<String>,
    /// day | week | month — series bucket, default day.
    pub group_by: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SeriesPoint {
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct TopIssue {
    pub id: Uuid,
    pub content: String,
    pub frequency_count: i32,
    pub urgency_score: Option<i32>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrendsResponse {
    pub period: String,
    pub total_feedback: usize,
    pub previous_total: i64,
    pub change_percent: f64,
    pub by_day: Vec<SeriesPoint>,
    pub by_category: Vec<CountEntry>,
    pub by_source: Vec<CountEntry>,
    pub top_issues: Vec<TopIssue>,
}

/// GET /api/insights/trends — volume over time versus the previous period.
pub async fn handle_trends(
    State(state): State<AppState>,
    Query(params): Query<TrendsParams>,
) -> Result<Json<TrendsResponse>, AppError> {
    let (period, days) = match params.period.as_deref() {
        Some("day") => ("day", 1),
        Some("month") => ("month", 30),
        _ => ("week", 7),
    };
    let group_by = GroupBy::parse(params.group_by.as_deref());

    let now = Utc::now();
    let from = now - Duration::days(days);
    let previous_from = from - Duration::days(days);

    let rows = queries::fetch_window(&state.db, from, now).await?;
    let previous_total = queries::count_window(&state.db, previous_from, from).await?;

    let keys: Vec<String> = rows
        .iter()
        .map(|r| bucket_key(r.created_at, group_by))
        .collect();
    let mut counted = count_by(keys.iter().map(|k| k.as_str()));
    counted.sort_by(|a, b| a.0.cmp(&b.0));
    let series: Vec<SeriesPoint> = counted
        .into_iter()
        .map(|(date, count)| SeriesPoint { date, count })
        .collect();

    let by_category = count_entries(rows.iter().filter_map(|r| r.category_name.as_deref()));
    let by_source = count_entries(rows.iter().map(|r| r.source.as_str()));

    let mut by_frequency: Vec<&InsightRow> = rows.iter().collect();
    by_frequency.sort_by(|a, b| {
        b.frequency_count
            .cmp(&a.frequency_count)
            .then_with(|| b.urgency_score.cmp(&a.urgency_score))
    });
    let top_issues = by_frequency
        .into_iter()
        .take(TOP_N)
        .map(|r| TopIssue {
            id: r.id,
            content: truncate(&r.content, 120),
            frequency_count: r.frequency_count,
            urgency_score: r.urgency_score,
            category: r.category_name.clone(),
        })
        .collect();

    Ok(Json(TrendsResponse {
        period: period.to_string(),
        total_feedback: rows.len(),
        previous_total,
        change_percent: change_percent(rows.len() as i64, previous_total),
        by_day: series,
        by_category,
        by_source,
        top_issues,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    /// week | month | quarter — default month.
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SentimentDistribution {
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
}

#[derive(Debug, Serialize)]
pub struct CriticalIssue {
    pub id: Uuid,
    pub content: String,
    pub urgency_score: i32,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Highlights {
    pub most_requested_feature: Option<String>,
    pub biggest_pain_point: Option<String>,
    pub praise_summary: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub period: String,
    pub total_feedback: usize,
    /// Promoters (9–10) minus detractors (0–6), percent. Null without NPS data.
    pub nps_score: Option<i32>,
    pub sentiment_distribution: SentimentDistribution,
    /// Percent of feedback with status past `new`.
    pub response_rate: f64,
    pub top_categories: Vec<CountEntry>,
    pub critical_issues: Vec<CriticalIssue>,
    pub highlights: Highlights,
}

/// GET /api/insights/summary — the executive rollup for one period.
pub async fn handle_summary(
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<SummaryResponse>, AppError> {
    let (period, days) = match params.period.as_deref() {
        Some("week") => ("week", 7),
        Some("quarter") => ("quarter", 90),
        _ => ("month", 30),
    };

    let now = Utc::now();
    let rows = queries::fetch_window(&state.db, now - Duration::days(days), now).await?;

    let nps_scores: Vec<i64> = rows
        .iter()
        .filter_map(|r| r.metadata.get("nps_score").and_then(|v| v.as_i64()))
        .collect();

    let sentiment_distribution = SentimentDistribution {
        positive: rows.iter().filter(|r| r.sentiment == "positive").count(),
        neutral: rows.iter().filter(|r| r.sentiment == "neutral").count(),
        negative: rows.iter().filter(|r| r.sentiment == "negative").count(),
    };

    let not_new = rows.iter().filter(|r| r.status != "new").count();

    let top_categories = count_entries(rows.iter().filter_map(|r| r.category_name.as_deref()))
        .into_iter()
        .take(TOP_N)
        .collect();

    let mut critical: Vec<&InsightRow> = rows
        .iter()
        .filter(|r| r.urgency_score.unwrap_or(0) >= 80)
        .collect();
    critical.sort_by(|a, b| b.urgency_score.cmp(&a.urgency_score));
    let critical_issues = critical
        .into_iter()
        .take(TOP_N)
        .map(|r| CriticalIssue {
            id: r.id,
            content: truncate(&r.content, 120),
            urgency_score: r.urgency_score.unwrap_or(0),
            category: r.category_name.clone(),
        })
        .collect();

    let highlights = build_highlights(&rows);

    Ok(Json(SummaryResponse {
        period: period.to_string(),
        total_feedback: rows.len(),
        nps_score: calculate_nps(&nps_scores),
        sentiment_distribution,
        response_rate: response_rate(rows.len(), not_new),
        top_categories,
        critical_issues,
        highlights,
    }))
}

fn build_highlights(rows: &[InsightRow]) -> Highlights {
    let most_requested_feature = most_common_theme(contents_of(rows, &["feature"]));
    let biggest_pain_point = most_common_theme(contents_of(rows, &["bug", "complaint"]));

    let praise_count = contents_of(rows, &["praise"]).count();
    let praise_summary = if praise_count == 0 {
        None
    } else {
        match most_common_theme(contents_of(rows, &["praise"])) {
            Some(theme) => Some(format!(
                "{praise_count} positive mentions, most often about \"{theme}\""
            )),
            None => Some(format!("{praise_count} positive mentions")),
        }
    };

    Highlights {
        most_requested_feature,
        biggest_pain_point,
        praise_summary,
    }
}

/// Content of every row whose category type is one of `wanted`.
fn contents_of<'a>(
    rows: &'a [InsightRow],
    wanted: &'a [&'a str],
) -> impl Iterator<Item = &'a str> + 'a {
    rows.iter().filter_map(move |r| {
        let category_type = r.category_type.as_deref()?;
        wanted
            .contains(&category_type)
            .then(|| r.content.as_str())
    })
}

fn count_entries<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<CountEntry> {
    count_by(labels)
        .into_iter()
        .map(|(name, count)| CountEntry { name, count })
        .collect()
}

fn truncate(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let cut: String = content.chars().take(max_chars).collect();
    format!("{cut}…")
}
