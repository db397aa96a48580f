// src/analyze/mod.rs
//! Analysis pipeline over the canonical feed: sentiment → issues → trends →
//! insights → recommendations. Every stage is a pure, synchronous transform.

pub mod insights;
pub mod issues;
pub mod recommend;
pub mod sentiment;
pub mod trends;

use serde::{Deserialize, Serialize};

use crate::model::FeedbackItem;

// Re-export convenient types.
pub use crate::analyze::insights::{Evidence, Insight, InsightCorrelator, InsightType};
pub use crate::analyze::issues::{Issue, IssueExtractor};
pub use crate::analyze::recommend::{Action, Effort, HealthScore, RecommendationGenerator, Timeline};
pub use crate::analyze::sentiment::{RatingRule, SentimentBreakdown, SentimentClassifier};
pub use crate::analyze::trends::{Trend, TrendAnalyzer, TrendDirection};

/// Tunables for the analysis stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub rating_rule: RatingRule,
    /// Drop repeated (source, normalized text) items before analysis.
    pub dedup: bool,
    /// Performance items per source must exceed this ...
    pub performance_threshold: usize,
    /// ... in at least this many sources.
    pub performance_min_sources: usize,
    pub competitor_threshold: usize,
    pub feature_threshold: usize,
    /// Below this health score a quick-wins action is added.
    pub health_threshold: u32,
    pub competitor_terms: Vec<String>,
    pub trend_topics: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rating_rule: RatingRule::default(),
            dedup: true,
            performance_threshold: 10,
            performance_min_sources: 2,
            competitor_threshold: 15,
            feature_threshold: 5,
            health_threshold: 70,
            competitor_terms: vec!["competitor".into()],
            trend_topics: trends::DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Whole-word (plural-tolerant) match of a lower-case term in lower-case text.
pub(crate) fn mentions(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    let is_word = |c: char| c.is_alphanumeric();
    let mut from = 0;
    while let Some(pos) = text[from..].find(term) {
        let start = from + pos;
        let end = start + term.len();
        let left_ok = !text[..start].chars().next_back().is_some_and(is_word);
        let rest = &text[end..];
        let rest = rest.strip_prefix('s').unwrap_or(rest);
        let right_ok = !rest.chars().next().is_some_and(is_word);
        if left_ok && right_ok {
            return true;
        }
        from = start + text[start..].chars().next().map_or(1, char::len_utf8);
    }
    false
}

/// Output of one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    /// The feed with sentiment and issue tags attached.
    pub items: Vec<FeedbackItem>,
    pub sentiment: SentimentBreakdown,
    pub issues: Vec<Issue>,
    pub trends: Vec<Trend>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Action>,
    pub health: HealthScore,
    /// Items per day across the feed's time span.
    pub velocity: f64,
}

/// Run every analyzer over an already aggregated feed.
pub fn analyze_feed(items: &[FeedbackItem], cfg: &AnalysisConfig) -> Analysis {
    let t0 = std::time::Instant::now();

    let classified = SentimentClassifier::new(cfg.rating_rule).annotate(items);
    let extractor = IssueExtractor::new();
    let issues = extractor.extract(&classified);
    let annotated = extractor.tag_items(&classified);

    let trends = TrendAnalyzer::new(cfg.trend_topics.iter().cloned()).analyze(&annotated);
    let insights = InsightCorrelator::from_config(cfg).correlate(&annotated, &trends);
    let health = HealthScore::from_items(&annotated);
    let recommendations = RecommendationGenerator::new(cfg.health_threshold).generate(&insights, &health);

    let sentiment = SentimentBreakdown::from_items(&annotated);
    let velocity = velocity(&annotated);

    tracing::info!(
        target: "analyze",
        items = annotated.len(),
        issues = issues.len(),
        insights = insights.len(),
        health = health.score,
        elapsed_ms = t0.elapsed().as_millis() as u64,
        "analysis finished"
    );

    Analysis {
        items: annotated,
        sentiment,
        issues,
        trends,
        insights,
        recommendations,
        health,
        velocity,
    }
}

/// Items per day between the oldest and newest item (a span under a day counts as one).
pub fn velocity(items: &[FeedbackItem]) -> f64 {
    let (Some(min), Some(max)) = (
        items.iter().map(|it| it.timestamp()).min(),
        items.iter().map(|it| it.timestamp()).max(),
    ) else {
        return 0.0;
    };
    let days = (max - min).num_seconds() as f64 / 86_400.0;
    let days = if days < 1.0 { 1.0 } else { days };
    (items.len() as f64 / days * 10.0).round() / 10.0
}
