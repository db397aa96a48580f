//! # Feedback data model
//!
//! `FeedbackItem` is the single validated shape every adapter maps vendor payloads into.
//! Fields are private: provenance and identity are fixed at construction, and analyzers
//! derive annotated copies (`with_sentiment`, `with_tags`) instead of mutating in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

use crate::error::{AggregationError, SourceError};

/// Where an item came from: a genuine fetch or the synthetic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Real,
    Synthetic,
}

impl Provenance {
    pub fn is_real(self) -> bool {
        matches!(self, Provenance::Real)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provenance::Real => "real",
            Provenance::Synthetic => "synthetic",
        }
    }
}

/// Item-level sentiment. `Mixed` is only produced for aggregates (e.g. per issue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    Mixed,
}

/// Source-specific engagement counters. Semantics differ per source; only ever summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replies: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shares: Option<u64>,
}

impl Engagement {
    pub fn total(&self) -> u64 {
        [self.likes, self.replies, self.upvotes, self.shares]
            .iter()
            .map(|c| c.unwrap_or(0))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.likes.is_none() && self.replies.is_none() && self.upvotes.is_none() && self.shares.is_none()
    }
}

/// One unit of user feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    id: String,
    source: String,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rating: Option<u8>,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Engagement::is_empty")]
    engagement: Engagement,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sentiment: Option<Sentiment>,
    provenance: Provenance,
    #[serde(default)]
    tags: BTreeSet<String>,
}

impl FeedbackItem {
    /// Build an item. The id is derived from (source, provenance, timestamp, text);
    /// the source name and provenance are recorded as tags.
    pub fn new(
        source: impl Into<String>,
        text: impl Into<String>,
        timestamp: DateTime<Utc>,
        provenance: Provenance,
    ) -> Self {
        let source = source.into();
        let text = text.into();
        let id = item_id(&source, provenance, timestamp, &text);
        let mut tags = BTreeSet::new();
        tags.insert(source.clone());
        tags.insert(provenance.as_str().to_string());
        Self {
            id,
            source,
            text,
            rating: None,
            timestamp,
            author: None,
            engagement: Engagement::default(),
            sentiment: None,
            provenance,
            tags,
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        let a = author.into();
        if !a.trim().is_empty() {
            self.author = Some(a);
        }
        self
    }

    pub fn with_engagement(mut self, engagement: Engagement) -> Self {
        self.engagement = engagement;
        self
    }

    /// Annotated copy carrying a classifier verdict.
    pub fn with_sentiment(&self, sentiment: Sentiment) -> Self {
        let mut out = self.clone();
        out.sentiment = Some(sentiment);
        out
    }

    /// Annotated copy with extra labels (e.g. issue categories).
    pub fn with_tags<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out = self.clone();
        out.tags.extend(tags.into_iter().map(Into::into));
        out
    }

    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn source(&self) -> &str {
        &self.source
    }
    pub fn text(&self) -> &str {
        &self.text
    }
    pub fn rating(&self) -> Option<u8> {
        self.rating
    }
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }
    pub fn engagement(&self) -> &Engagement {
        &self.engagement
    }
    pub fn sentiment(&self) -> Option<Sentiment> {
        self.sentiment
    }
    pub fn provenance(&self) -> Provenance {
        self.provenance
    }
    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    /// Check the invariants an item must satisfy to enter the canonical feed.
    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.text.trim().is_empty() {
            return Err(AggregationError::EmptyText {
                id: self.id.clone(),
                origin: self.source.clone(),
            });
        }
        if let Some(r) = self.rating {
            if !(1..=5).contains(&r) {
                return Err(AggregationError::RatingOutOfRange {
                    id: self.id.clone(),
                    origin: self.source.clone(),
                    rating: r,
                });
            }
        }
        Ok(())
    }
}

/// Short, stable hex id: `<source>-<16 hex chars of sha256>`.
fn item_id(source: &str, provenance: Provenance, ts: DateTime<Utc>, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(provenance.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(ts.timestamp_millis().to_le_bytes());
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(source.len() + 17);
    out.push_str(source);
    out.push('-');
    for b in digest.iter().take(8) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Status of one source attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Failed,
    Empty,
}

/// Output of one source attempt within a single run.
///
/// After a fallback the status and error of the real attempt are kept, while
/// `provenance` and `items` describe the synthetic substitute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceResult {
    pub source: String,
    pub items: Vec<FeedbackItem>,
    pub status: SourceStatus,
    pub provenance: Provenance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub attempts: u32,
}

impl SourceResult {
    /// Map an adapter outcome into a real-provenance result.
    pub fn from_fetch(
        source: impl Into<String>,
        outcome: Result<Vec<FeedbackItem>, SourceError>,
        attempts: u32,
    ) -> Self {
        let source = source.into();
        let (items, status, error) = match outcome {
            Ok(items) if items.is_empty() => (Vec::new(), SourceStatus::Empty, None),
            Ok(items) => (items, SourceStatus::Ok, None),
            Err(SourceError::Empty) => (Vec::new(), SourceStatus::Empty, None),
            Err(e) => (Vec::new(), SourceStatus::Failed, Some(e.to_string())),
        };
        Self {
            source,
            items,
            status,
            provenance: Provenance::Real,
            error,
            attempts,
        }
    }

    /// A source that never produced an adapter outcome (panicked task, run deadline).
    pub fn failed(source: impl Into<String>, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            source: source.into(),
            items: Vec::new(),
            status: SourceStatus::Failed,
            provenance: Provenance::Real,
            error: Some(error.into()),
            attempts,
        }
    }

    /// Replace the items of a failed/empty attempt with synthetic ones.
    pub fn into_synthetic(self, items: Vec<FeedbackItem>) -> Self {
        Self {
            items,
            provenance: Provenance::Synthetic,
            ..self
        }
    }

    /// Counts toward "real data" statistics.
    pub fn is_real_data(&self) -> bool {
        self.provenance.is_real() && !self.items.is_empty()
    }

    pub fn needs_fallback(&self, fallback_on_empty: bool) -> bool {
        match self.status {
            SourceStatus::Failed => true,
            SourceStatus::Empty => fallback_on_empty,
            SourceStatus::Ok => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 20, 12, 0, 0).unwrap()
    }

    #[test]
    fn new_item_is_tagged_and_identified() {
        let it = FeedbackItem::new("reddit", "Love it", ts(), Provenance::Real);
        assert!(it.id().starts_with("reddit-"));
        assert_eq!(it.id().len(), "reddit-".len() + 16);
        assert!(it.tags().contains("reddit"));
        assert!(it.tags().contains("real"));
        assert!(it.sentiment().is_none());
    }

    #[test]
    fn annotation_leaves_original_untouched() {
        let it = FeedbackItem::new("app_store", "Great", ts(), Provenance::Synthetic).with_rating(5);
        let annotated = it.with_sentiment(Sentiment::Positive).with_tags(["Bugs"]);
        assert!(it.sentiment().is_none());
        assert!(!it.tags().contains("Bugs"));
        assert_eq!(annotated.sentiment(), Some(Sentiment::Positive));
        assert_eq!(annotated.provenance(), Provenance::Synthetic);
        assert_eq!(annotated.id(), it.id());
    }

    #[test]
    fn validate_rejects_empty_text_and_bad_rating() {
        let empty = FeedbackItem::new("x", "   ", ts(), Provenance::Real);
        assert!(matches!(empty.validate(), Err(AggregationError::EmptyText { .. })));
        let bad = FeedbackItem::new("x", "ok", ts(), Provenance::Real).with_rating(7);
        assert!(matches!(
            bad.validate(),
            Err(AggregationError::RatingOutOfRange { rating: 7, .. })
        ));
    }

    #[test]
    fn item_serde_roundtrip_is_identical() {
        let it = FeedbackItem::new("reddit", "Needs dark mode", ts(), Provenance::Real)
            .with_author("u1")
            .with_engagement(Engagement {
                upvotes: Some(12),
                replies: Some(3),
                ..Default::default()
            })
            .with_sentiment(Sentiment::Neutral);
        let json = serde_json::to_string(&it).unwrap();
        let back: FeedbackItem = serde_json::from_str(&json).unwrap();
        assert_eq!(back, it);
    }

    #[test]
    fn source_result_status_mapping() {
        let empty = SourceResult::from_fetch("a", Ok(vec![]), 1);
        assert_eq!(empty.status, SourceStatus::Empty);
        assert!(empty.needs_fallback(true));
        assert!(!empty.needs_fallback(false));

        let failed = SourceResult::from_fetch("a", Err(FetchError::Timeout(10).into()), 3);
        assert_eq!(failed.status, SourceStatus::Failed);
        assert!(failed.error.as_deref().unwrap().contains("timed out"));

        let it = FeedbackItem::new("a", "t", ts(), Provenance::Real);
        let ok = SourceResult::from_fetch("a", Ok(vec![it]), 1);
        assert!(ok.is_real_data());
    }
}
