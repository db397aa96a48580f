// tests/pipeline_report.rs
//
// End-to-end engine runs with registered in-memory adapters:
// collect → fallback → merge → sink → analyze → report.

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use feedback_correlator::analyze::{InsightType, SentimentClassifier, Timeline};
use feedback_correlator::ingest::config::{EngineConfig, SourceConfig, SourceKind};
use feedback_correlator::ingest::providers::fixture::StaticAdapter;
use feedback_correlator::ingest::sink::MemorySink;
use feedback_correlator::ingest::types::SourceAdapter as _;
use feedback_correlator::{
    CollectRequest, FeedbackEngine, FeedbackItem, Provenance, Report, Sentiment, SourceError,
};

fn feed(source: &str, text: &str, n: usize, rating: Option<u8>) -> Vec<FeedbackItem> {
    let t0 = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let it = FeedbackItem::new(source, format!("{text} #{i}"), t0 + Duration::minutes(i as i64 * 30), Provenance::Real);
            match rating {
                Some(r) => it.with_rating(r),
                None => it,
            }
        })
        .collect()
}

fn engine() -> FeedbackEngine {
    let mut cfg = EngineConfig::default();
    cfg.synthetic.seed = Some(11);
    cfg.orchestrator.backoff_base_ms = 1;
    FeedbackEngine::new(cfg)
}

#[tokio::test]
async fn performance_complaints_in_two_sources_yield_one_critical_insight() {
    let engine = engine()
        .with_adapter(Arc::new(StaticAdapter::new(
            "app_store",
            feed("app_store", "App is so slow after the update", 12, Some(2)),
        )))
        .with_adapter(Arc::new(StaticAdapter::new(
            "reddit",
            feed("reddit", "It keeps crashing on my phone", 12, None),
        )));

    let req = CollectRequest::new(["app_store", "reddit"])
        .with_app_id("123")
        .with_search_query("DemoApp")
        .with_limit(50);
    let report = engine.collect(&req).await.expect("collect ok");

    let critical: Vec<_> = report
        .insights
        .iter()
        .filter(|i| i.kind == InsightType::Critical)
        .collect();
    assert_eq!(critical.len(), 1, "insights: {:?}", report.insights);
    let sources: Vec<&str> = critical[0].evidence.iter().map(|e| e.source.as_str()).collect();
    assert_eq!(sources, vec!["app_store", "reddit"]);
    assert!((critical[0].confidence - 0.92).abs() < f64::EPSILON);
    assert_eq!(report.insights[0].kind, InsightType::Critical);

    // P1 from the critical insight, P2 because health is far below 70
    assert_eq!(report.recommendations[0].priority, 1);
    assert_eq!(report.recommendations[0].timeline, Timeline::Immediate);
    assert_eq!(report.recommendations[1].priority, 2);

    let s = &report.summary;
    assert_eq!(s.total_feedback, 24);
    assert_eq!(s.real_data_percentage, 100);
    assert!(s.mock_data_sources.is_empty());
    assert_eq!(s.source_breakdown["app_store"], 12);
    assert_eq!(s.source_breakdown["reddit"], 12);
    assert_eq!(s.average_rating, Some(2.0));
    assert_eq!(s.health_score, 16);
    assert_eq!(s.top_issues[0].category, "Performance Issues");
    assert_eq!(s.top_issues[0].count, 24);
    assert_eq!(s.sentiment_breakdown.negative, 12);
    assert_eq!(s.sentiment_breakdown.neutral, 12);
    assert_eq!(s.velocity, 24.0);
}

#[tokio::test]
async fn failed_source_is_marked_mock_and_sink_gets_the_canonical_batch() {
    let sink = Arc::new(MemorySink::new());
    let mut dupes = feed("app_store", "Great app, I love it", 3, Some(5));
    dupes.push(dupes[0].clone());

    let engine = engine()
        .with_sink(sink.clone())
        .with_adapter(Arc::new(StaticAdapter::new("app_store", dupes)))
        .with_adapter(Arc::new(StaticAdapter::failing("forum", SourceError::Parse("html error page".into()))));

    let req = CollectRequest::new(["app_store", "forum"])
        .with_app_id("123")
        .with_search_query("DemoApp");
    let report = engine.collect(&req).await.expect("collect ok");

    let s = &report.summary;
    assert_eq!(s.real_data_sources, vec!["app_store".to_string()]);
    assert_eq!(s.mock_data_sources, vec!["forum".to_string()]);
    assert_eq!(s.real_data_percentage, 50);
    assert_eq!(s.source_breakdown["app_store"], 3, "duplicate dropped before analysis");
    assert_eq!(s.synthetic_items, 5);

    // synthetic templates may repeat, and repeats are merged like any other duplicate
    let forum: Vec<_> = report.items.iter().filter(|i| i.source() == "forum").collect();
    assert!((1..=5).contains(&forum.len()));
    assert_eq!(s.source_breakdown["forum"], forum.len());
    assert!(forum.iter().all(|i| i.provenance() == Provenance::Synthetic));
    assert!(report
        .items
        .iter()
        .filter(|i| i.source() == "app_store")
        .all(|i| i.provenance() == Provenance::Real && i.sentiment() == Some(Sentiment::Positive)));

    let batches = sink.batches.lock().unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 3 + forum.len());
}

#[test]
fn text_sentiment_follows_the_lexicon() {
    let c = SentimentClassifier::default();
    assert_eq!(c.classify_text("great app, I love it"), Sentiment::Positive);
    assert_eq!(c.classify_text("terrible, crashes, I hate it"), Sentiment::Negative);
    assert_eq!(c.classify_text("great idea but terrible execution"), Sentiment::Neutral);
    assert_eq!(c.classify_text("it opens"), Sentiment::Neutral);
}

#[tokio::test]
async fn report_survives_a_json_round_trip() {
    let engine = engine().with_adapter(Arc::new(StaticAdapter::new(
        "reddit",
        feed("reddit", "Really need dark mode, app is slow", 8, None),
    )));
    let report = engine
        .collect(&CollectRequest::new(["reddit"]).with_search_query("DemoApp"))
        .await
        .unwrap();
    assert!(report.insights.iter().any(|i| i.kind == InsightType::Opportunity));

    let json = serde_json::to_string(&report).unwrap();
    let back: Report = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);

    let v: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(v["summary"]["realDataPercentage"].is_u64());
    assert!(v["summary"]["mockDataSources"].is_array());
    assert_eq!(v["insights"][0]["type"], "opportunity");
}

#[test]
fn analyze_items_reports_supplied_provenance() {
    let mut items = feed("app_store", "Love the widgets", 2, Some(4));
    items.push(FeedbackItem::new(
        "reddit",
        "bad sync",
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        Provenance::Synthetic,
    ));
    let report = engine().analyze_items(items);
    assert_eq!(report.summary.real_data_sources, vec!["app_store".to_string()]);
    assert_eq!(report.summary.mock_data_sources, vec!["reddit".to_string()]);
    assert_eq!(report.summary.total_feedback, 3);
}

#[test]
fn inflected_performance_complaints_raise_the_critical_insight() {
    let mut items = feed("app_store", "app crashed again", 12, None);
    items.extend(feed("reddit", "keeps freezing and lagging", 12, None));
    let report = engine().analyze_items(items);

    let critical: Vec<_> = report
        .insights
        .iter()
        .filter(|i| i.kind == InsightType::Critical)
        .collect();
    assert_eq!(critical.len(), 1, "insights: {:?}", report.insights);
    let sources: Vec<&str> = critical[0].evidence.iter().map(|e| e.source.as_str()).collect();
    assert_eq!(sources, vec!["app_store", "reddit"]);
    // the issue table and the insight rule agree on what a performance complaint is
    assert_eq!(report.summary.top_issues[0].category, "Performance Issues");
    assert_eq!(report.summary.top_issues[0].count, 24);
}

#[test]
fn malformed_items_never_count_as_real_data() {
    let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut items = feed("reddit", "Love the widgets", 2, None);
    items.push(FeedbackItem::new("forum", "   ", ts, Provenance::Real));
    items.push(FeedbackItem::new("app_store", "no stars", ts, Provenance::Real).with_rating(0));

    let s = engine().analyze_items(items).summary;
    assert_eq!(s.real_data_sources, vec!["reddit".to_string()]);
    assert!(s.mock_data_sources.is_empty());
    assert_eq!(s.real_data_percentage, 100);
    assert_eq!(s.total_feedback, 2);
    assert!(!s.source_breakdown.contains_key("forum"));
    assert!(!s.source_breakdown.contains_key("app_store"));
}

fn unreachable_reddit(name: &str) -> SourceConfig {
    SourceConfig {
        name: name.into(),
        kind: SourceKind::Reddit,
        app_id: None,
        company_name: None,
        search_query: Some("DemoApp".into()),
        limit: Some(5),
        time_range_days: None,
        url: Some("http://127.0.0.1:9".into()),
        fixture: None,
        bearer_token: None,
    }
}

#[tokio::test]
async fn two_sources_of_one_kind_run_side_by_side() {
    let mut cfg = EngineConfig::default();
    cfg.synthetic.seed = Some(5);
    cfg.orchestrator.max_attempts = 1;
    cfg.orchestrator.attempt_timeout_ms = 500;
    cfg.sources = vec![unreachable_reddit("reddit_brand"), unreachable_reddit("reddit_competitor")];
    let engine = FeedbackEngine::new(cfg);

    let names: Vec<String> = engine
        .configured_jobs()
        .expect("distinct names are valid")
        .iter()
        .map(|j| j.adapter.name().to_string())
        .collect();
    assert_eq!(names, vec!["reddit_brand", "reddit_competitor"]);

    let report = engine.run_configured().await.expect("run is not fatal");
    let s = &report.summary;
    assert_eq!(
        s.mock_data_sources,
        vec!["reddit_brand".to_string(), "reddit_competitor".to_string()]
    );
    assert!(s.source_breakdown.contains_key("reddit_brand"));
    assert!(s.source_breakdown.contains_key("reddit_competitor"));
    assert!(!s.source_breakdown.contains_key("reddit"));
}
