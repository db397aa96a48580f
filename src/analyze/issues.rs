// src/analyze/issues.rs
//! Keyword-table issue extraction. Matching is a case-insensitive substring test,
//! so one item can count toward several categories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analyze::sentiment::aggregate_sentiment;
use crate::model::{FeedbackItem, Sentiment};

const MAX_EXAMPLES: usize = 3;
const EXAMPLE_CHARS: usize = 100;

pub struct IssueCategory {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// Shared with the performance-crisis insight rule so both count the same items.
pub const PERFORMANCE_KEYWORDS: &[&str] =
    &["slow", "lag", "freeze", "freezing", "froze", "crash", "performance", "loading"];

pub const CATEGORIES: &[IssueCategory] = &[
    IssueCategory {
        name: "Performance Issues",
        keywords: PERFORMANCE_KEYWORDS,
    },
    IssueCategory {
        name: "Battery Drain",
        keywords: &["battery", "drain", "power", "consumption"],
    },
    IssueCategory {
        name: "UI/UX Problems",
        keywords: &["confusing", "hard to use", "interface", "design", "navigation"],
    },
    IssueCategory {
        name: "Bugs",
        keywords: &["bug", "broken", "error", "glitch", "not working"],
    },
    IssueCategory {
        name: "Missing Features",
        keywords: &["missing", "need", "want", "should have", "feature request"],
    },
    IssueCategory {
        name: "Price Concerns",
        keywords: &["expensive", "price", "cost", "subscription", "money"],
    },
    IssueCategory {
        name: "Customer Support",
        keywords: &["support", "help", "response", "contact", "service"],
    },
];

impl IssueCategory {
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub category: String,
    pub count: usize,
    pub examples: Vec<String>,
    pub by_source: BTreeMap<String, usize>,
    /// Aggregate over the matching items' sentiment; `mixed` is possible here.
    pub sentiment: Sentiment,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IssueExtractor;

impl IssueExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Category names an item's text falls into.
    pub fn categories_for(&self, item: &FeedbackItem) -> Vec<&'static str> {
        let lowered = item.text().to_lowercase();
        CATEGORIES
            .iter()
            .filter(|c| c.matches(&lowered))
            .map(|c| c.name)
            .collect()
    }

    /// Annotated copies carrying their issue categories as tags.
    pub fn tag_items(&self, items: &[FeedbackItem]) -> Vec<FeedbackItem> {
        items
            .iter()
            .map(|it| match self.categories_for(it) {
                cats if cats.is_empty() => it.clone(),
                cats => it.with_tags(cats),
            })
            .collect()
    }

    /// Issues with at least one mention, most frequent first.
    pub fn extract(&self, items: &[FeedbackItem]) -> Vec<Issue> {
        let lowered: Vec<String> = items.iter().map(|it| it.text().to_lowercase()).collect();

        let mut issues: Vec<Issue> = CATEGORIES
            .iter()
            .filter_map(|cat| {
                let hits: Vec<&FeedbackItem> = items
                    .iter()
                    .zip(&lowered)
                    .filter(|(_, low)| cat.matches(low))
                    .map(|(it, _)| it)
                    .collect();
                if hits.is_empty() {
                    return None;
                }

                let mut by_source = BTreeMap::new();
                for it in &hits {
                    *by_source.entry(it.source().to_string()).or_insert(0) += 1;
                }
                let positive = hits
                    .iter()
                    .filter(|it| it.sentiment() == Some(Sentiment::Positive))
                    .count();

                Some(Issue {
                    category: cat.name.to_string(),
                    count: hits.len(),
                    examples: pick_examples(&hits),
                    by_source,
                    sentiment: aggregate_sentiment(positive, hits.len()),
                })
            })
            .collect();

        // stable: ties keep table order
        issues.sort_by(|a, b| b.count.cmp(&a.count));
        issues
    }
}

/// Complaints first (rating <= 3, or negative sentiment when unrated), then the rest.
fn pick_examples(hits: &[&FeedbackItem]) -> Vec<String> {
    let is_complaint = |it: &FeedbackItem| match it.rating() {
        Some(r) => r <= 3,
        None => it.sentiment() == Some(Sentiment::Negative),
    };
    hits.iter()
        .filter(|it| is_complaint(it))
        .chain(hits.iter().filter(|it| !is_complaint(it)))
        .take(MAX_EXAMPLES)
        .map(|it| truncate(it.text()))
        .collect()
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= EXAMPLE_CHARS {
        return text.to_string();
    }
    let mut out: String = text.chars().take(EXAMPLE_CHARS).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provenance;
    use chrono::{Duration, TimeZone, Utc};

    fn item(source: &str, text: &str, rating: Option<u8>, i: i64) -> FeedbackItem {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(i);
        let it = FeedbackItem::new(source, text, ts, Provenance::Real);
        match rating {
            Some(r) => it.with_rating(r),
            None => it,
        }
    }

    #[test]
    fn counts_items_per_category_and_allows_overlap() {
        let items = vec![
            item("app_store", "So SLOW and the battery drains", Some(1), 0),
            item("app_store", "Crash on launch", Some(2), 1),
            item("reddit", "Too expensive for what it does", None, 2),
            item("reddit", "Nice app", None, 3),
        ];
        let issues = IssueExtractor::new().extract(&items);
        let perf = issues.iter().find(|i| i.category == "Performance Issues").unwrap();
        assert_eq!(perf.count, 2);
        assert_eq!(perf.by_source["app_store"], 2);
        let battery = issues.iter().find(|i| i.category == "Battery Drain").unwrap();
        assert_eq!(battery.count, 1);
        assert_eq!(issues[0].category, "Performance Issues");
        assert!(issues.iter().all(|i| i.count > 0));
        assert!(!issues.iter().any(|i| i.category == "Bugs"));
    }

    #[test]
    fn examples_prefer_low_ratings_and_are_truncated() {
        let long = format!("slow {}", "x".repeat(200));
        let items = vec![
            item("app_store", "slow but I still like it", Some(5), 0),
            item("app_store", &long, Some(1), 1),
            item("app_store", "slow sync", Some(3), 2),
            item("app_store", "slow start", Some(2), 3),
        ];
        let issues = IssueExtractor::new().extract(&items);
        let ex = &issues[0].examples;
        assert_eq!(ex.len(), 3);
        assert!(ex[0].ends_with("...") && ex[0].chars().count() == 103);
        assert_eq!(ex[1], "slow sync");
        assert_eq!(ex[2], "slow start");
    }

    #[test]
    fn tags_are_added_on_copies() {
        let items = vec![item("reddit", "There is a bug in export", None, 0)];
        let tagged = IssueExtractor::new().tag_items(&items);
        assert!(tagged[0].tags().contains("Bugs"));
        assert!(!items[0].tags().contains("Bugs"));
    }
}
