// src/analyze/sentiment.rs
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::{FeedbackItem, Sentiment};

/// Keyword → +1 (positive) / -1 (negative).
static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// How an explicit star rating maps to sentiment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingRule {
    /// 4–5 positive, 1–2 negative, 3 neutral.
    #[default]
    ThreeWay,
    /// `>= 3.5` positive, everything else negative (workplace-review convention).
    #[serde(rename = "threshold_3_5")]
    Threshold35,
}

impl RatingRule {
    pub fn classify(self, rating: u8) -> Sentiment {
        match self {
            RatingRule::ThreeWay => match rating {
                r if r > 3 => Sentiment::Positive,
                r if r <= 2 => Sentiment::Negative,
                _ => Sentiment::Neutral,
            },
            RatingRule::Threshold35 => {
                if f64::from(rating) >= 3.5 {
                    Sentiment::Positive
                } else {
                    Sentiment::Negative
                }
            }
        }
    }
}

/// Deterministic lexicon classifier. Never yields `Mixed`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentClassifier {
    rating_rule: RatingRule,
}

impl SentimentClassifier {
    pub fn new(rating_rule: RatingRule) -> Self {
        Self { rating_rule }
    }

    /// Positive hits minus negative hits.
    pub fn score_text(&self, text: &str) -> i32 {
        tokenize(text).map(|t| *LEXICON.get(&t).unwrap_or(&0)).sum()
    }

    pub fn classify_text(&self, text: &str) -> Sentiment {
        match self.score_text(text) {
            s if s > 0 => Sentiment::Positive,
            s if s < 0 => Sentiment::Negative,
            _ => Sentiment::Neutral,
        }
    }

    /// The rating wins when present; text decides otherwise.
    pub fn classify(&self, item: &FeedbackItem) -> Sentiment {
        match item.rating() {
            Some(r) => self.rating_rule.classify(r),
            None => self.classify_text(item.text()),
        }
    }

    /// Annotated copies of `items`, in order.
    pub fn annotate(&self, items: &[FeedbackItem]) -> Vec<FeedbackItem> {
        items
            .iter()
            .map(|it| it.with_sentiment(self.classify(it)))
            .collect()
    }
}

/// Alphanumeric tokens, lower-case.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

/// Sentiment counts over a set of items.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentBreakdown {
    pub positive: usize,
    pub negative: usize,
    pub neutral: usize,
    pub mixed: usize,
}

impl SentimentBreakdown {
    /// Items without a sentiment are not counted.
    pub fn from_items<'a>(items: impl IntoIterator<Item = &'a FeedbackItem>) -> Self {
        let mut out = Self::default();
        for it in items {
            match it.sentiment() {
                Some(Sentiment::Positive) => out.positive += 1,
                Some(Sentiment::Negative) => out.negative += 1,
                Some(Sentiment::Neutral) => out.neutral += 1,
                Some(Sentiment::Mixed) => out.mixed += 1,
                None => {}
            }
        }
        out
    }

    pub fn total(&self) -> usize {
        self.positive + self.negative + self.neutral + self.mixed
    }

    /// Share of positive items, `None` for an empty breakdown.
    pub fn positive_ratio(&self) -> Option<f64> {
        match self.total() {
            0 => None,
            n => Some(self.positive as f64 / n as f64),
        }
    }
}

/// Aggregate verdict for a group: > 0.6 positive → positive, < 0.3 → negative, else mixed.
pub fn aggregate_sentiment(positive: usize, total: usize) -> Sentiment {
    if total == 0 {
        return Sentiment::Neutral;
    }
    let ratio = positive as f64 / total as f64;
    if ratio > 0.6 {
        Sentiment::Positive
    } else if ratio < 0.3 {
        Sentiment::Negative
    } else {
        Sentiment::Mixed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provenance;
    use chrono::Utc;

    #[test]
    fn keyword_balance_decides_text_sentiment() {
        let c = SentimentClassifier::default();
        assert_eq!(c.classify_text("great app, I love it"), Sentiment::Positive);
        assert_eq!(c.classify_text("terrible, crashes, I hate it"), Sentiment::Negative);
        assert_eq!(c.classify_text("great idea but awful execution"), Sentiment::Neutral);
        assert_eq!(c.classify_text("it opens"), Sentiment::Neutral);
    }

    #[test]
    fn classification_is_pure() {
        let c = SentimentClassifier::default();
        let t = "Best app ever, but the sync sucks and support is poor";
        assert_eq!(c.score_text(t), -1);
        assert_eq!(c.classify_text(t), c.classify_text(t));
    }

    #[test]
    fn rating_rules() {
        let three = RatingRule::ThreeWay;
        assert_eq!(three.classify(5), Sentiment::Positive);
        assert_eq!(three.classify(3), Sentiment::Neutral);
        assert_eq!(three.classify(2), Sentiment::Negative);

        let t35 = RatingRule::Threshold35;
        assert_eq!(t35.classify(4), Sentiment::Positive);
        assert_eq!(t35.classify(3), Sentiment::Negative);
    }

    #[test]
    fn rating_overrides_text() {
        let c = SentimentClassifier::default();
        let it = FeedbackItem::new("app_store", "I love the idea", Utc::now(), Provenance::Real).with_rating(1);
        assert_eq!(c.classify(&it), Sentiment::Negative);
        let annotated = c.annotate(std::slice::from_ref(&it));
        assert_eq!(annotated[0].sentiment(), Some(Sentiment::Negative));
        assert!(it.sentiment().is_none());
    }

    #[test]
    fn aggregate_thresholds() {
        assert_eq!(aggregate_sentiment(7, 10), Sentiment::Positive);
        assert_eq!(aggregate_sentiment(2, 10), Sentiment::Negative);
        assert_eq!(aggregate_sentiment(5, 10), Sentiment::Mixed);
    }

    #[test]
    fn rating_rule_serde_names() {
        let r: RatingRule = serde_json::from_str(r#""threshold_3_5""#).unwrap();
        assert_eq!(r, RatingRule::Threshold35);
        assert_eq!(serde_json::to_string(&RatingRule::ThreeWay).unwrap(), r#""three_way""#);
    }
}
