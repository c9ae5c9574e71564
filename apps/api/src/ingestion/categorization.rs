//! Categorization Engine — keyword categorizer, sentiment detector, tag
//! extractor, and crisis detector. All pure functions over the content string
//! and the read-mostly category catalog.

use serde_json::Value;

use crate::models::feedback::{CategoryRow, Sentiment};

/// Substring indicators for positive sentiment.
const POSITIVE_WORDS: &[&str] = &[
    "love",
    "great",
    "amazing",
    "awesome",
    "excellent",
    "perfect",
    "thank",
    "fantastic",
    "best",
    "wonderful",
    "incredible",
    "outstanding",
    "happy",
    "pleased",
    "satisfied",
    "appreciate",
    "brilliant",
];

/// Substring indicators for negative sentiment.
const NEGATIVE_WORDS: &[&str] = &[
    "hate",
    "terrible",
    "awful",
    "worst",
    "horrible",
    "disappointed",
    "frustrated",
    "angry",
    "useless",
    "waste",
    "poor",
    "bad",
    "annoying",
    "broken",
    "crash",
    "error",
    "fail",
    "slow",
];

/// Fixed feature-area vocabulary for tag extraction.
const FEATURE_AREAS: &[&str] = &[
    "checkout",
    "payment",
    "billing",
    "auth",
    "authentication",
    "login",
    "signup",
    "dashboard",
    "profile",
    "settings",
    "notification",
    "email",
    "mobile",
    "ios",
    "android",
    "api",
    "integration",
    "export",
    "import",
    "search",
    "filter",
    "upload",
    "download",
    "performance",
    "speed",
];

/// Crisis indicators. Matching any one of these marks the content critical.
const CRISIS_KEYWORDS: &[&str] = &[
    "crash",
    "down",
    "not working",
    "broken",
    "can't",
    "cannot",
    "error",
    "fail",
    "unable",
    "doesn't work",
    "stopped working",
    "data loss",
    "lost data",
    "security",
    "breach",
    "hack",
    "payment fail",
    "charge",
    "refund",
];

pub const MAX_TAGS: usize = 10;

/// Lowercase word tokens (alphanumeric runs). The unit of whole-word matching.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() {
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Counts whole-word occurrences of `keyword` in `tokens`. Multi-word
/// keywords ("not working", "data loss") match consecutive token runs.
/// Word-boundary semantics: "bug" never matches inside "debugging".
fn count_keyword(tokens: &[String], keyword: &str) -> usize {
    let kw_tokens = tokenize(keyword);
    if kw_tokens.is_empty() || kw_tokens.len() > tokens.len() {
        return 0;
    }
    tokens
        .windows(kw_tokens.len())
        .filter(|w| w.iter().zip(&kw_tokens).all(|(a, b)| a == b))
        .count()
}

/// Picks the category whose keywords occur most often in `content`
/// (whole-word, case-insensitive). Strictly-highest count wins; ties keep
/// the first-encountered category in catalog order; zero matches → `None`.
pub fn categorize<'a>(content: &str, categories: &'a [CategoryRow]) -> Option<&'a CategoryRow> {
    if content.is_empty() || categories.is_empty() {
        return None;
    }

    let tokens = tokenize(content);
    let mut best: Option<(&CategoryRow, usize)> = None;

    for category in categories {
        let match_count: usize = category
            .keywords
            .iter()
            .map(|kw| count_keyword(&tokens, kw))
            .sum();

        if match_count > 0 && best.map_or(true, |(_, count)| match_count > count) {
            best = Some((category, match_count));
        }
    }

    best.map(|(category, _)| category)
}

/// Determines sentiment. A praise/complaint category short-circuits;
/// otherwise whichever of the positive/negative word lists scores a strict,
/// non-zero majority wins. Indeterminate content is neutral.
pub fn determine_sentiment(content: &str, category_type: Option<&str>) -> Sentiment {
    if content.is_empty() {
        return Sentiment::Neutral;
    }

    match category_type {
        Some("praise") => return Sentiment::Positive,
        Some("complaint") => return Sentiment::Negative,
        _ => {}
    }

    let normalized = content.to_lowercase();
    let positive = POSITIVE_WORDS
        .iter()
        .filter(|w| normalized.contains(*w))
        .count();
    let negative = NEGATIVE_WORDS
        .iter()
        .filter(|w| normalized.contains(*w))
        .count();

    if positive > negative && positive > 0 {
        Sentiment::Positive
    } else if negative > positive && negative > 0 {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

/// Extracts up to [`MAX_TAGS`] tags: feature-area terms found in the content
/// (substring, vocabulary order) plus metadata-derived `channel:`/`store:`/
/// `platform:`/`version:` tags. Insertion order is preserved up to the cap.
pub fn extract_tags(content: &str, metadata: &Value) -> Vec<String> {
    let normalized = content.to_lowercase();
    let mut tags: Vec<String> = Vec::new();

    for area in FEATURE_AREAS {
        if normalized.contains(area) {
            tags.push((*area).to_string());
        }
    }

    for (key, prefix) in [
        ("channel", "channel"),
        ("store", "store"),
        ("platform", "platform"),
        ("app_version", "version"),
    ] {
        if let Some(value) = metadata.get(key).and_then(Value::as_str) {
            tags.push(format!("{prefix}:{value}"));
        }
    }

    tags.truncate(MAX_TAGS);
    tags
}

/// True if the content contains any crisis keyword (substring match).
pub fn is_critical(content: &str) -> bool {
    let normalized = content.to_lowercase();
    CRISIS_KEYWORDS.iter().any(|kw| normalized.contains(kw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn catalog() -> Vec<CategoryRow> {
        vec![
            CategoryRow {
                id: 1,
                name: "Bug Report".to_string(),
                category_type: "bug".to_string(),
                keywords: ["crash", "error", "broken", "not working", "bug", "fails", "500"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                description: None,
            },
            CategoryRow {
                id: 2,
                name: "Feature Request".to_string(),
                category_type: "feature".to_string(),
                keywords: ["wish", "should add", "please add", "missing", "suggestion"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                description: None,
            },
            CategoryRow {
                id: 4,
                name: "Praise".to_string(),
                category_type: "praise".to_string(),
                keywords: ["love", "great", "amazing", "thank you"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                description: None,
            },
        ]
    }

    #[test]
    fn test_categorize_picks_highest_match_count() {
        let categories = catalog();
        let category = categorize("App crash, then another crash, plus an error", &categories);
        assert_eq!(category.unwrap().name, "Bug Report");
    }

    #[test]
    fn test_categorize_whole_word_only() {
        let categories = catalog();
        // "debugging" must not count as "bug"
        assert!(categorize("I was debugging my own script", &categories).is_none());
    }

    #[test]
    fn test_categorize_multiword_keyword() {
        let categories = catalog();
        let category = categorize("The sync is not working at all", &categories);
        assert_eq!(category.unwrap().name, "Bug Report");
    }

    #[test]
    fn test_categorize_tie_keeps_catalog_order() {
        let categories = catalog();
        // one bug keyword, one feature keyword — tie resolves to Bug Report (first)
        let category = categorize("The export crash happens, wish it worked", &categories);
        assert_eq!(category.unwrap().name, "Bug Report");
    }

    #[test]
    fn test_categorize_no_match_returns_none() {
        let categories = catalog();
        assert!(categorize("Just saying hello", &categories).is_none());
    }

    #[test]
    fn test_categorize_is_deterministic() {
        let categories = catalog();
        let content = "error in checkout, please add retry";
        let first = categorize(content, &categories).map(|c| c.id);
        for _ in 0..10 {
            assert_eq!(categorize(content, &categories).map(|c| c.id), first);
        }
    }

    #[test]
    fn test_sentiment_praise_category_short_circuits() {
        // content alone reads negative, but the category wins
        assert_eq!(
            determine_sentiment("this used to be terrible", Some("praise")),
            Sentiment::Positive
        );
    }

    #[test]
    fn test_sentiment_complaint_category_short_circuits() {
        assert_eq!(
            determine_sentiment("thank you so much", Some("complaint")),
            Sentiment::Negative
        );
    }

    #[test]
    fn test_sentiment_counts_word_lists() {
        assert_eq!(
            determine_sentiment("I love this, great work, amazing team", None),
            Sentiment::Positive
        );
        assert_eq!(
            determine_sentiment("terrible, broken and slow", None),
            Sentiment::Negative
        );
    }

    #[test]
    fn test_sentiment_tie_or_silence_is_neutral() {
        assert_eq!(determine_sentiment("love it but it crashed", None), Sentiment::Neutral);
        assert_eq!(determine_sentiment("the sky is blue", None), Sentiment::Neutral);
    }

    #[test]
    fn test_extract_tags_feature_areas_and_metadata() {
        let metadata = json!({ "store": "ios", "app_version": "2.1.0" });
        let tags = extract_tags("Checkout payment hangs on mobile", &metadata);
        assert!(tags.contains(&"checkout".to_string()));
        assert!(tags.contains(&"payment".to_string()));
        assert!(tags.contains(&"mobile".to_string()));
        assert!(tags.contains(&"store:ios".to_string()));
        assert!(tags.contains(&"version:2.1.0".to_string()));
    }

    #[test]
    fn test_extract_tags_capped_at_ten() {
        let content = "checkout payment billing auth login signup dashboard \
                       profile settings notification email mobile api search";
        let tags = extract_tags(content, &json!({ "channel": "email" }));
        assert_eq!(tags.len(), MAX_TAGS);
        // insertion order preserved up to the cap: vocabulary terms first
        assert_eq!(tags[0], "checkout");
    }

    #[test]
    fn test_extract_tags_empty_for_plain_content() {
        assert!(extract_tags("nothing relevant here", &json!({})).is_empty());
    }

    #[test]
    fn test_is_critical() {
        assert!(is_critical("App crashes constantly"));
        assert!(is_critical("Possible data loss after sync"));
        assert!(is_critical("SECURITY hole in the API"));
        assert!(!is_critical("Would be nice to have dark mode"));
    }
}
