//! Frequency/Duplicate Detector — approximate duplicate counting over a
//! trailing 30-day window via keyword overlap.
//!
//! Deliberately crude (no embeddings, documented non-goal): each item is
//! reduced to its first three words longer than four characters, and for each
//! keyword we count stored feedback whose content contains it. The MAX across
//! keywords (not the sum — summing would double-penalize multi-keyword
//! overlap) plus one for the current item is the frequency count.

use chrono::{Duration, Utc};
use tracing::warn;

use crate::store::FeedbackStore;

pub const KEYWORD_LIMIT: usize = 3;

pub const WINDOW_DAYS: i64 = 30;

/// Representative keywords: lowercase words with more than four characters,
/// first [`KEYWORD_LIMIT`] in order of appearance.
pub fn representative_keywords(content: &str) -> Vec<String> {
    content
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| w.chars().count() > 4)
        .take(KEYWORD_LIMIT)
        .collect()
}

/// Counts near-duplicate feedback in the trailing window, including the
/// current item (always ≥ 1). Store errors degrade to 1 with a warning —
/// frequency is a weighted scoring input, never a reason to drop an item.
pub async fn similar_feedback_count(
    store: &dyn FeedbackStore,
    content: &str,
    category_id: Option<i32>,
) -> i32 {
    let keywords = representative_keywords(content);
    if keywords.is_empty() {
        return 1;
    }

    let since = Utc::now() - Duration::days(WINDOW_DAYS);
    let mut max_count: i64 = 0;

    for keyword in &keywords {
        match store.count_containing(keyword, category_id, since).await {
            Ok(count) if count > max_count => max_count = count,
            Ok(_) => {}
            Err(e) => {
                warn!("Error counting similar feedback for '{keyword}': {e}");
                return 1;
            }
        }
    }

    max_count as i32 + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords_keep_words_longer_than_four_chars() {
        let keywords = representative_keywords("Payment processing fails with error 500");
        assert_eq!(keywords, vec!["payment", "processing", "fails"]);
    }

    #[test]
    fn test_keywords_limited_to_three() {
        let keywords =
            representative_keywords("checkout broken payment billing dashboard export");
        assert_eq!(keywords.len(), KEYWORD_LIMIT);
        assert_eq!(keywords, vec!["checkout", "broken", "payment"]);
    }

    #[test]
    fn test_keywords_lowercased() {
        let keywords = representative_keywords("CRASH Crash LOGIN");
        assert_eq!(keywords, vec!["crash", "crash", "login"]);
    }

    #[test]
    fn test_no_usable_keywords_yields_empty() {
        // all words are four characters or fewer
        assert!(representative_keywords("the app is bad now").is_empty());
    }
}
