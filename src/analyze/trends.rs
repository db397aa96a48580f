// src/analyze/trends.rs
use serde::{Deserialize, Serialize};

use crate::model::FeedbackItem;

pub const DEFAULT_TOPICS: &[&str] = &["performance", "features", "price", "support", "design"];

const RISING_FACTOR: f64 = 1.2;
const FALLING_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Stable,
}

/// `recent > 1.2 * old` rising, `recent < 0.8 * old` falling, else stable.
pub fn classify(old_rate: f64, recent_rate: f64) -> TrendDirection {
    if recent_rate > old_rate * RISING_FACTOR {
        TrendDirection::Rising
    } else if recent_rate < old_rate * FALLING_FACTOR {
        TrendDirection::Falling
    } else {
        TrendDirection::Stable
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trend {
    pub topic: String,
    pub direction: TrendDirection,
    pub old_mentions: usize,
    pub recent_mentions: usize,
    pub old_rate: f64,
    pub recent_rate: f64,
}

/// Compares topic mention rates between the older and newer half of the feed.
#[derive(Debug, Clone)]
pub struct TrendAnalyzer {
    topics: Vec<String>,
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_TOPICS.iter().copied())
    }
}

impl TrendAnalyzer {
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            topics: topics.into_iter().map(|t| t.into().to_lowercase()).collect(),
        }
    }

    /// One trend per topic, in topic order. The feed is split at its midpoint by
    /// timestamp; when either half is empty every topic is `stable`.
    pub fn analyze(&self, items: &[FeedbackItem]) -> Vec<Trend> {
        let mut sorted: Vec<&FeedbackItem> = items.iter().collect();
        sorted.sort_by_key(|it| it.timestamp());
        let lowered: Vec<String> = sorted.iter().map(|it| it.text().to_lowercase()).collect();
        let (old, recent) = lowered.split_at(lowered.len() / 2);

        self.topics
            .iter()
            .map(|topic| {
                let old_mentions = old.iter().filter(|t| t.contains(topic.as_str())).count();
                let recent_mentions = recent.iter().filter(|t| t.contains(topic.as_str())).count();
                if old.is_empty() || recent.is_empty() {
                    return Trend {
                        topic: topic.clone(),
                        direction: TrendDirection::Stable,
                        old_mentions,
                        recent_mentions,
                        old_rate: 0.0,
                        recent_rate: 0.0,
                    };
                }
                let old_rate = old_mentions as f64 / old.len() as f64;
                let recent_rate = recent_mentions as f64 / recent.len() as f64;
                Trend {
                    topic: topic.clone(),
                    direction: classify(old_rate, recent_rate),
                    old_mentions,
                    recent_mentions,
                    old_rate: round3(old_rate),
                    recent_rate: round3(recent_rate),
                }
            })
            .collect()
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}
