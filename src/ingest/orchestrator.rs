// src/ingest/orchestrator.rs
//! Real-first collection with synthetic fallback.
//!
//! One task per source, bounded by a semaphore. Each task retries its adapter
//! with exponential backoff and a per-attempt timeout; the fan-in waits for every
//! task (or the run deadline) before any fallback is chosen. Nothing a single
//! source does can fail the run; only an empty or invalid job list can.

use metrics::{counter, gauge};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{ConfigError, FetchError, SourceError};
use crate::ingest::synthetic::SyntheticGenerator;
use crate::ingest::types::{SourceAdapter, SourceQuery};
use crate::model::{FeedbackItem, SourceResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorPolicy {
    /// Attempts per source including the first one.
    pub max_attempts: u32,
    pub attempt_timeout_ms: u64,
    /// Backoff before retry n is `backoff_base_ms << (n - 1)`.
    pub backoff_base_ms: u64,
    pub max_concurrency: usize,
    pub run_deadline_ms: u64,
    /// Treat a valid-but-empty real result like a failure.
    pub fallback_on_empty: bool,
}

impl Default for OrchestratorPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout_ms: 10_000,
            backoff_base_ms: 500,
            max_concurrency: 4,
            run_deadline_ms: 60_000,
            fallback_on_empty: true,
        }
    }
}

/// One source to collect: the adapter and what to ask it for.
#[derive(Clone)]
pub struct SourceJob {
    pub adapter: Arc<dyn SourceAdapter>,
    pub query: SourceQuery,
}

impl SourceJob {
    pub fn new(adapter: Arc<dyn SourceAdapter>, query: SourceQuery) -> Self {
        Self { adapter, query }
    }
}

/// Result of one orchestration run, after fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionOutcome {
    pub results: Vec<SourceResult>,
    pub real_data_sources: Vec<String>,
    pub mock_data_sources: Vec<String>,
    pub real_data_percentage: u32,
    pub real_reviews_percentage: u32,
    pub real_items: usize,
    pub synthetic_items: usize,
}

impl CollectionOutcome {
    pub fn from_results(results: Vec<SourceResult>) -> Self {
        let mut real_data_sources = Vec::new();
        let mut mock_data_sources = Vec::new();
        let (mut real_items, mut synthetic_items) = (0usize, 0usize);
        for r in &results {
            if r.is_real_data() {
                real_data_sources.push(r.source.clone());
                real_items += r.items.len();
            } else {
                mock_data_sources.push(r.source.clone());
                if !r.provenance.is_real() {
                    synthetic_items += r.items.len();
                }
            }
        }
        let real_data_percentage = percentage(real_data_sources.len(), results.len());
        let real_reviews_percentage = percentage(real_items, real_items + synthetic_items);
        Self {
            results,
            real_data_sources,
            mock_data_sources,
            real_data_percentage,
            real_reviews_percentage,
            real_items,
            synthetic_items,
        }
    }

    /// Rebuild per-source results from an already collected feed (e.g. items posted
    /// for analysis only). A source counts as real only if all its items are real.
    pub fn from_feed(items: &[FeedbackItem]) -> Self {
        let mut by_source: BTreeMap<&str, Vec<FeedbackItem>> = BTreeMap::new();
        for it in items {
            by_source.entry(it.source()).or_default().push(it.clone());
        }
        let results = by_source
            .into_iter()
            .map(|(source, items)| {
                let all_real = items.iter().all(|it| it.provenance().is_real());
                let res = SourceResult::from_fetch(source, Ok(items), 0);
                if all_real {
                    res
                } else {
                    let items = res.items.clone();
                    res.into_synthetic(items)
                }
            })
            .collect();
        Self::from_results(results)
    }

    /// Item count per source, after fallback.
    pub fn source_breakdown(&self) -> BTreeMap<String, usize> {
        self.results
            .iter()
            .map(|r| (r.source.clone(), r.items.len()))
            .collect()
    }
}

/// `round(100 * part / whole)`, 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u32
}

pub struct FallbackOrchestrator {
    generator: Arc<dyn SyntheticGenerator>,
    policy: OrchestratorPolicy,
}

impl FallbackOrchestrator {
    pub fn new(generator: Arc<dyn SyntheticGenerator>) -> Self {
        Self {
            generator,
            policy: OrchestratorPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: OrchestratorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &OrchestratorPolicy {
        &self.policy
    }

    /// Collect every job, substituting synthetic data where the real source
    /// failed (or came back empty, per policy). Results keep job order.
    pub async fn run(&self, jobs: Vec<SourceJob>) -> Result<CollectionOutcome, ConfigError> {
        crate::ingest::ensure_metrics_described();
        validate_jobs(&jobs)?;

        let sem = Arc::new(Semaphore::new(self.policy.max_concurrency.max(1)));
        let mut set: JoinSet<(usize, SourceResult)> = JoinSet::new();
        for (idx, job) in jobs.iter().cloned().enumerate() {
            let sem = Arc::clone(&sem);
            let policy = self.policy.clone();
            set.spawn(async move {
                let name = job.adapter.name().to_string();
                let Ok(_permit) = sem.acquire_owned().await else {
                    return (idx, SourceResult::failed(name, "worker pool closed", 0));
                };
                (idx, collect_source(job, &policy).await)
            });
        }

        // Fan-in barrier: nothing is aggregated until every task resolved or the deadline hit.
        let mut slots: Vec<Option<SourceResult>> = vec![None; jobs.len()];
        let deadline =
            tokio::time::Instant::now() + Duration::from_millis(self.policy.run_deadline_ms);
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(Ok((idx, res)))) => slots[idx] = Some(res),
                Ok(Some(Err(e))) => {
                    tracing::error!(target: "orchestrator", error = %e, "source task aborted");
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(
                        target: "orchestrator",
                        deadline_ms = self.policy.run_deadline_ms,
                        pending = set.len(),
                        "run deadline exceeded; cancelling pending sources"
                    );
                    set.abort_all();
                    break;
                }
            }
        }

        let mut results = Vec::with_capacity(jobs.len());
        for (job, slot) in jobs.iter().zip(slots) {
            let name = job.adapter.name();
            let real = slot.unwrap_or_else(|| {
                SourceResult::failed(name, "source did not finish before the run deadline", 0)
            });
            results.push(self.resolve(real, &job.query));
        }

        let outcome = CollectionOutcome::from_results(results);
        gauge!("collector_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
        tracing::info!(
            target: "orchestrator",
            sources = outcome.results.len(),
            real = ?outcome.real_data_sources,
            mock = ?outcome.mock_data_sources,
            real_pct = outcome.real_data_percentage,
            "collection finished"
        );
        Ok(outcome)
    }

    /// Keep a good real result, or swap in synthetic items.
    fn resolve(&self, real: SourceResult, query: &SourceQuery) -> SourceResult {
        if !real.needs_fallback(self.policy.fallback_on_empty) {
            counter!("collector_items_total", "source" => real.source.clone(), "provenance" => "real")
                .increment(real.items.len() as u64);
            return real;
        }
        let items: Vec<FeedbackItem> = self.generator.generate(&real.source, query);
        counter!("collector_fallbacks_total", "source" => real.source.clone()).increment(1);
        counter!("collector_items_total", "source" => real.source.clone(), "provenance" => "synthetic")
            .increment(items.len() as u64);
        tracing::warn!(
            target: "orchestrator",
            source = %real.source,
            status = ?real.status,
            error = real.error.as_deref().unwrap_or("-"),
            synthetic = items.len(),
            "falling back to synthetic data"
        );
        real.into_synthetic(items)
    }
}

fn validate_jobs(jobs: &[SourceJob]) -> Result<(), ConfigError> {
    if jobs.is_empty() {
        return Err(ConfigError::NoSources);
    }
    let mut seen = BTreeSet::new();
    for j in jobs {
        let name = j.adapter.name();
        if j.query.limit == 0 {
            return Err(ConfigError::InvalidLimit(name.to_string()));
        }
        if !seen.insert(name) {
            return Err(ConfigError::Load(format!("source {name} scheduled twice")));
        }
    }
    Ok(())
}

/// How a single attempt ended, before retry policy is applied.
enum AttemptError {
    Source(SourceError),
    /// The adapter task panicked or was cancelled; never retried.
    Crashed(String),
}

/// Aborts the wrapped task when dropped, so a timed-out or cancelled attempt
/// does not keep running in the background.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

async fn attempt_once(job: &SourceJob, timeout: Duration) -> Result<Vec<FeedbackItem>, AttemptError> {
    let adapter = Arc::clone(&job.adapter);
    let query = job.query.clone();
    let mut handle = AbortOnDrop(tokio::spawn(async move { adapter.fetch_items(&query).await }));
    match tokio::time::timeout(timeout, &mut handle.0).await {
        Ok(Ok(outcome)) => outcome.map_err(AttemptError::Source),
        Ok(Err(join_err)) => Err(AttemptError::Crashed(format!("adapter task failed: {join_err}"))),
        Err(_) => Err(AttemptError::Source(
            FetchError::Timeout(timeout.as_millis() as u64).into(),
        )),
    }
}

/// Retry loop for one source; always yields a real-provenance result.
async fn collect_source(job: SourceJob, policy: &OrchestratorPolicy) -> SourceResult {
    let name = job.adapter.name().to_string();
    let max_attempts = policy.max_attempts.max(1);
    let timeout = Duration::from_millis(policy.attempt_timeout_ms.max(1));

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        counter!("collector_attempts_total", "source" => name.clone()).increment(1);

        match attempt_once(&job, timeout).await {
            Ok(items) => {
                tracing::debug!(target: "orchestrator", source = %name, attempt, items = items.len(), "fetch ok");
                return SourceResult::from_fetch(name, Ok(items), attempt);
            }
            Err(AttemptError::Crashed(msg)) => {
                counter!("collector_source_errors_total", "source" => name.clone()).increment(1);
                tracing::error!(target: "orchestrator", source = %name, attempt, error = %msg, "adapter crashed");
                return SourceResult::failed(name, msg, attempt);
            }
            Err(AttemptError::Source(e)) if e.is_retryable() && attempt < max_attempts => {
                counter!("collector_retries_total", "source" => name.clone()).increment(1);
                let backoff = policy
                    .backoff_base_ms
                    .saturating_mul(1u64 << (attempt - 1).min(16));
                tracing::warn!(
                    target: "orchestrator",
                    source = %name,
                    attempt,
                    backoff_ms = backoff,
                    error = %e,
                    "fetch failed; retrying"
                );
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            Err(AttemptError::Source(e)) => {
                if !matches!(e, SourceError::Empty) {
                    counter!("collector_source_errors_total", "source" => name.clone()).increment(1);
                }
                tracing::warn!(target: "orchestrator", source = %name, attempt, error = %e, "fetch gave up");
                return SourceResult::from_fetch(name, Err(e), attempt);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Provenance, SourceStatus};

    fn result(source: &str, n: usize, provenance: Provenance) -> SourceResult {
        let ts = chrono::Utc::now();
        let items = (0..n)
            .map(|i| FeedbackItem::new(source, format!("item {i}"), ts, provenance))
            .collect();
        SourceResult {
            source: source.into(),
            items,
            status: if provenance.is_real() { SourceStatus::Ok } else { SourceStatus::Failed },
            provenance,
            error: None,
            attempts: 1,
        }
    }

    #[test]
    fn percentages_round_to_nearest() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(5, 5), 100);
    }

    #[test]
    fn outcome_splits_real_and_mock_sources() {
        let out = CollectionOutcome::from_results(vec![
            result("a", 6, Provenance::Real),
            result("b", 2, Provenance::Synthetic),
            result("c", 0, Provenance::Real),
        ]);
        assert_eq!(out.real_data_sources, vec!["a".to_string()]);
        assert_eq!(out.mock_data_sources, vec!["b".to_string(), "c".to_string()]);
        assert_eq!(out.real_data_percentage, 33);
        assert_eq!(out.real_reviews_percentage, 75);
        assert_eq!(out.source_breakdown()["a"], 6);
    }

    #[test]
    fn default_policy_is_bounded() {
        let p = OrchestratorPolicy::default();
        assert_eq!(p.max_attempts, 3);
        assert_eq!(p.max_concurrency, 4);
        assert!(p.fallback_on_empty);
    }
}
