//! Feedback Correlator: binary entrypoint
//! Boots the Axum HTTP server: config, engine, optional scheduler, metrics.

use std::sync::{Arc, RwLock};

use feedback_correlator::api::{self, AppState};
use feedback_correlator::engine::FeedbackEngine;
use feedback_correlator::ingest::config::load_config_default;
use feedback_correlator::ingest::scheduler::{spawn_scheduler, LatestReport, SchedulerCfg};
use feedback_correlator::metrics::Metrics;
use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    feedback_correlator::init_tracing();

    let config = load_config_default()?;
    tracing::info!(
        sources = config.sources.len(),
        max_concurrency = config.orchestrator.max_concurrency,
        fallback_on_empty = config.orchestrator.fallback_on_empty,
        "configuration loaded"
    );

    let metrics = Metrics::init(&config).map_err(shuttle_runtime::CustomError::new)?;

    let interval = config.schedule_interval_secs;
    let has_sources = !config.sources.is_empty();
    let engine = Arc::new(FeedbackEngine::new(config));
    let latest: LatestReport = Arc::new(RwLock::new(None));

    match interval {
        Some(secs) if has_sources => {
            tracing::info!(interval_secs = secs, "starting collection scheduler");
            spawn_scheduler(SchedulerCfg { interval_secs: secs }, Arc::clone(&engine), Arc::clone(&latest));
        }
        Some(_) => tracing::warn!("schedule_interval_secs set but no sources configured; scheduler off"),
        None => {}
    }

    let router = api::router(AppState::new(engine, latest)).merge(metrics.router());

    Ok(router.into())
}
