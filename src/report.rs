//! # Report
//! The boundary artifact handed to the dashboard/API collaborator. It always says
//! which sources were real and which were answered with synthetic data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analyze::{Action, Analysis, Insight, Issue, SentimentBreakdown, Trend};
use crate::ingest::orchestrator::CollectionOutcome;
use crate::model::FeedbackItem;

const TOP_ISSUES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_feedback: usize,
    pub real_data_percentage: u32,
    pub real_reviews_percentage: u32,
    pub source_breakdown: BTreeMap<String, usize>,
    pub sentiment_breakdown: SentimentBreakdown,
    pub real_data_sources: Vec<String>,
    pub mock_data_sources: Vec<String>,
    pub real_items: usize,
    pub synthetic_items: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_rating: Option<f64>,
    pub health_score: u32,
    pub velocity: f64,
    pub top_issues: Vec<Issue>,
    pub trends: Vec<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub summary: Summary,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Action>,
    pub generated_at: DateTime<Utc>,
    /// The annotated canonical feed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<FeedbackItem>,
}

impl Report {
    /// Join collection statistics with analysis output. `sourceBreakdown` counts the
    /// canonical feed, so duplicates dropped during merge are not included.
    pub fn build(outcome: &CollectionOutcome, analysis: Analysis) -> Self {
        let mut source_breakdown: BTreeMap<String, usize> =
            outcome.results.iter().map(|r| (r.source.clone(), 0)).collect();
        for it in &analysis.items {
            *source_breakdown.entry(it.source().to_string()).or_insert(0) += 1;
        }

        let summary = Summary {
            total_feedback: analysis.items.len(),
            real_data_percentage: outcome.real_data_percentage,
            real_reviews_percentage: outcome.real_reviews_percentage,
            source_breakdown,
            sentiment_breakdown: analysis.sentiment,
            real_data_sources: outcome.real_data_sources.clone(),
            mock_data_sources: outcome.mock_data_sources.clone(),
            real_items: outcome.real_items,
            synthetic_items: outcome.synthetic_items,
            average_rating: analysis.health.average_rating,
            health_score: analysis.health.score,
            velocity: analysis.velocity,
            top_issues: analysis.issues.into_iter().take(TOP_ISSUES).collect(),
            trends: analysis.trends,
        };

        Self {
            summary,
            insights: analysis.insights,
            recommendations: analysis.recommendations,
            generated_at: Utc::now(),
            items: analysis.items,
        }
    }

    /// Same report without the item list (smaller payload for listings).
    pub fn without_items(&self) -> Self {
        Self {
            items: Vec::new(),
            ..self.clone()
        }
    }
}
