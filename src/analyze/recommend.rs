// src/analyze/recommend.rs
use serde::{Deserialize, Serialize};

use crate::analyze::insights::{Insight, InsightType};
use crate::model::{FeedbackItem, Sentiment};

/// Stand-ins when a feed has no rated or no unrated items.
const NEUTRAL_RATING: f64 = 3.0;
const NEUTRAL_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timeline {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "1-2 weeks")]
    Weeks,
    #[serde(rename = "1-2 months")]
    Months,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub priority: u8,
    pub action: String,
    pub impact: String,
    pub effort: Effort,
    pub timeline: Timeline,
}

/// Weighted composite: 40% rating, 30% review sentiment, 30% social sentiment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthScore {
    /// 0..=100, rounded.
    pub score: u32,
    /// Mean over rated items, one decimal.
    pub average_rating: Option<f64>,
    pub review_positive_ratio: Option<f64>,
    pub social_positive_ratio: Option<f64>,
}

impl HealthScore {
    /// Rated items count as reviews, unrated ones as social posts. Items need a sentiment.
    pub fn from_items(items: &[FeedbackItem]) -> Self {
        let (rated, social): (Vec<&FeedbackItem>, Vec<&FeedbackItem>) =
            items.iter().partition(|it| it.rating().is_some());

        let average_rating = (!rated.is_empty()).then(|| {
            let sum: u32 = rated.iter().filter_map(|it| it.rating()).map(u32::from).sum();
            round1(f64::from(sum) / rated.len() as f64)
        });
        let review_positive_ratio = positive_ratio(&rated);
        let social_positive_ratio = positive_ratio(&social);

        let blended = average_rating.unwrap_or(NEUTRAL_RATING) / 5.0 * 40.0
            + review_positive_ratio.unwrap_or(NEUTRAL_RATIO) * 30.0
            + social_positive_ratio.unwrap_or(NEUTRAL_RATIO) * 30.0;

        Self {
            score: blended.round().clamp(0.0, 100.0) as u32,
            average_rating,
            review_positive_ratio: review_positive_ratio.map(round3),
            social_positive_ratio: social_positive_ratio.map(round3),
        }
    }
}

fn positive_ratio(items: &[&FeedbackItem]) -> Option<f64> {
    if items.is_empty() {
        return None;
    }
    let pos = items
        .iter()
        .filter(|it| it.sentiment() == Some(Sentiment::Positive))
        .count();
    Some(pos as f64 / items.len() as f64)
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, Copy)]
pub struct RecommendationGenerator {
    health_threshold: u32,
}

impl Default for RecommendationGenerator {
    fn default() -> Self {
        Self::new(70)
    }
}

impl RecommendationGenerator {
    pub fn new(health_threshold: u32) -> Self {
        Self { health_threshold }
    }

    /// P1 every critical insight, P2 quick wins when health is low, P3 every opportunity.
    pub fn generate(&self, insights: &[Insight], health: &HealthScore) -> Vec<Action> {
        let mut out: Vec<Action> = insights
            .iter()
            .filter(|i| i.kind == InsightType::Critical)
            .map(|i| Action {
                priority: 1,
                action: i.recommendation.clone(),
                impact: i.expected_impact.clone(),
                effort: Effort::High,
                timeline: Timeline::Immediate,
            })
            .collect();

        if health.score < self.health_threshold {
            out.push(Action {
                priority: 2,
                action: "Implement quick fixes for top 3 user complaints".into(),
                impact: "Improve health score by 10-15 points".into(),
                effort: Effort::Medium,
                timeline: Timeline::Weeks,
            });
        }

        out.extend(
            insights
                .iter()
                .filter(|i| i.kind == InsightType::Opportunity)
                .map(|i| Action {
                    priority: 3,
                    action: i.recommendation.clone(),
                    impact: i.expected_impact.clone(),
                    effort: Effort::Medium,
                    timeline: Timeline::Months,
                }),
        );

        out.sort_by_key(|a| a.priority);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Provenance;
    use chrono::Utc;

    fn insight(kind: InsightType, rec: &str) -> Insight {
        Insight {
            kind,
            title: rec.into(),
            description: String::new(),
            evidence: vec![],
            recommendation: rec.into(),
            expected_impact: format!("impact of {rec}"),
            confidence: 0.9,
        }
    }

    fn health(score: u32) -> HealthScore {
        HealthScore {
            score,
            average_rating: None,
            review_positive_ratio: None,
            social_positive_ratio: None,
        }
    }

    #[test]
    fn priorities_and_tiers() {
        let insights = vec![
            insight(InsightType::Opportunity, "build export"),
            insight(InsightType::Warning, "watch competitors"),
            insight(InsightType::Critical, "fix perf"),
        ];
        let actions = RecommendationGenerator::default().generate(&insights, &health(55));
        let prios: Vec<u8> = actions.iter().map(|a| a.priority).collect();
        assert_eq!(prios, vec![1, 2, 3]);
        assert_eq!(actions[0].action, "fix perf");
        assert_eq!(actions[0].effort, Effort::High);
        assert_eq!(actions[0].timeline, Timeline::Immediate);
        assert_eq!(actions[2].impact, "impact of build export");
        assert_eq!(actions[2].timeline, Timeline::Months);
    }

    #[test]
    fn healthy_feed_skips_quick_wins() {
        let actions = RecommendationGenerator::default().generate(&[], &health(70));
        assert!(actions.is_empty());
    }

    #[test]
    fn health_blend() {
        let now = Utc::now();
        let items = vec![
            FeedbackItem::new("app_store", "a", now, Provenance::Real)
                .with_rating(5)
                .with_sentiment(Sentiment::Positive),
            FeedbackItem::new("app_store", "b", now, Provenance::Real)
                .with_rating(3)
                .with_sentiment(Sentiment::Neutral),
            FeedbackItem::new("reddit", "c", now, Provenance::Real).with_sentiment(Sentiment::Negative),
        ];
        let h = HealthScore::from_items(&items);
        // 4.0/5*40 + 0.5*30 + 0*30 = 47
        assert_eq!(h.average_rating, Some(4.0));
        assert_eq!(h.score, 47);

        // nothing known → neutral stand-ins: 3/5*40 + 15 + 15 = 54
        assert_eq!(HealthScore::from_items(&[]).score, 54);
    }

    #[test]
    fn timeline_wire_names() {
        assert_eq!(serde_json::to_string(&Timeline::Weeks).unwrap(), r#""1-2 weeks""#);
    }
}
