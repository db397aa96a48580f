// src/ingest/scheduler.rs
use metrics::counter;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::engine::FeedbackEngine;
use crate::report::Report;

/// Last report produced by the scheduler, shared with the HTTP layer.
pub type LatestReport = Arc<RwLock<Option<Report>>>;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn a periodic collection over every configured source. The first run
/// starts immediately; a failed run is logged and the previous report is kept.
pub fn spawn_scheduler(
    cfg: SchedulerCfg,
    engine: Arc<FeedbackEngine>,
    latest: LatestReport,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(cfg.interval_secs.max(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            run_tick(&engine, &latest).await;
        }
    })
}

/// One scheduled run; returns whether a new report was stored.
pub async fn run_tick(engine: &FeedbackEngine, latest: &LatestReport) -> bool {
    counter!("collector_scheduled_runs_total").increment(1);
    match engine.run_configured().await {
        Ok(report) => {
            tracing::info!(
                target: "ingest",
                total = report.summary.total_feedback,
                real_pct = report.summary.real_data_percentage,
                insights = report.insights.len(),
                "scheduled collection tick"
            );
            match latest.write() {
                Ok(mut slot) => {
                    *slot = Some(report);
                    true
                }
                Err(_) => {
                    tracing::error!(target: "ingest", "latest report lock poisoned");
                    false
                }
            }
        }
        Err(e) => {
            tracing::error!(target: "ingest", error = %e, "scheduled collection failed");
            false
        }
    }
}
