//! Pure aggregation math behind the insights endpoints. No I/O here.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, Utc};

/// Series bucket granularity for the trends endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupBy {
    Day,
    Week,
    Month,
}

impl GroupBy {
    pub fn parse(s: Option<&str>) -> Self {
        match s {
            Some("week") => GroupBy::Week,
            Some("month") => GroupBy::Month,
            _ => GroupBy::Day,
        }
    }
}

/// Net Promoter Score: percentage of promoters (9–10) minus percentage of
/// detractors (0–6), rounded. `None` when no survey responses exist.
pub fn calculate_nps(scores: &[i64]) -> Option<i32> {
    if scores.is_empty() {
        return None;
    }
    let total = scores.len() as f64;
    let promoters = scores.iter().filter(|&&s| s >= 9).count() as f64;
    let detractors = scores.iter().filter(|&&s| s <= 6).count() as f64;
    Some(((promoters - detractors) / total * 100.0).round() as i32)
}

/// Counts occurrences per label, ordered by count descending then label
/// ascending so output is stable across runs.
pub fn count_by<'a>(labels: impl Iterator<Item = &'a str>) -> Vec<(String, i64)> {
    let mut counts: HashMap<&str, i64> = HashMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    let mut out: Vec<(String, i64)> = counts
        .into_iter()
        .map(|(label, count)| (label.to_string(), count))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

/// Series bucket key for a timestamp. Weeks snap to their Monday.
pub fn bucket_key(ts: DateTime<Utc>, group_by: GroupBy) -> String {
    match group_by {
        GroupBy::Day => ts.format("%Y-%m-%d").to_string(),
        GroupBy::Week => {
            let monday =
                ts.date_naive() - Duration::days(ts.weekday().num_days_from_monday() as i64);
            monday.format("%Y-%m-%d").to_string()
        }
        GroupBy::Month => ts.format("%Y-%m").to_string(),
    }
}

/// Volume change versus the previous period, one decimal place. A previous
/// period of zero reads as +100% when anything arrived at all.
pub fn change_percent(current: i64, previous: i64) -> f64 {
    if previous == 0 {
        return if current > 0 { 100.0 } else { 0.0 };
    }
    let raw = (current - previous) as f64 / previous as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Dominant theme across a set of texts: the most frequent word longer than
/// four characters (same word-length rule the frequency detector uses).
pub fn most_common_theme<'a>(contents: impl Iterator<Item = &'a str>) -> Option<String> {
    let mut counts: HashMap<String, i64> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for content in contents {
        for word in content.split_whitespace() {
            let word: String = word
                .to_lowercase()
                .chars()
                .filter(|c| c.is_alphanumeric())
                .collect();
            if word.chars().count() <= 4 {
                continue;
            }
            let entry = counts.entry(word.clone()).or_insert(0);
            if *entry == 0 {
                first_seen.push(word);
            }
            *entry += 1;
        }
    }

    // max_by_key keeps the last maximum, so reverse to break ties toward
    // the word that appeared first
    first_seen.into_iter().rev().max_by_key(|w| counts[w])
}

/// Share of feedback that has been touched by a human (status moved past
/// `new`), as a percentage with one decimal place.
pub fn response_rate(total: usize, not_new: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = not_new as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}
