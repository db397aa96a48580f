//! # Feedback Engine
//! End-to-end run: resolve sources → orchestrate (with fallback) → aggregate →
//! hand the canonical batch to the sink → analyze → build the report.
//!
//! All collaborators (adapters, synthetic generator, archive, sink) are injected
//! handles; nothing here is a global.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::analyze::analyze_feed;
use crate::error::ConfigError;
use crate::ingest::config::{EngineConfig, SourceConfig, SourceKind};
use crate::ingest::orchestrator::{CollectionOutcome, FallbackOrchestrator, SourceJob};
use crate::ingest::providers::build_adapter;
use crate::ingest::sink::{FeedbackSink, FileArchive, RawArchive};
use crate::ingest::synthetic::{SyntheticGenerator, TemplateGenerator};
use crate::ingest::types::{SourceAdapter, DEFAULT_LIMIT};
use crate::ingest::{aggregate, retain_valid};
use crate::model::FeedbackItem;
use crate::report::Report;

/// Inbound query from the CLI/dashboard collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectRequest {
    pub sources: Vec<String>,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub time_range_days: Option<u32>,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl CollectRequest {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            app_id: None,
            company_name: None,
            search_query: None,
            limit: DEFAULT_LIMIT,
            time_range_days: None,
        }
    }

    pub fn with_app_id(mut self, id: impl Into<String>) -> Self {
        self.app_id = Some(id.into());
        self
    }

    pub fn with_search_query(mut self, q: impl Into<String>) -> Self {
        self.search_query = Some(q.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Overlay the request onto a configured source. The app store wants an app id;
    /// the others take a search string (company name as a fallback).
    fn apply_to(&self, mut src: SourceConfig) -> SourceConfig {
        let search = self.search_query.clone().or_else(|| self.company_name.clone());
        match src.kind {
            SourceKind::AppStore => {
                if let Some(id) = &self.app_id {
                    src.app_id = Some(id.clone());
                }
            }
            SourceKind::Reddit | SourceKind::HackerNews | SourceKind::Rss | SourceKind::Static => {
                if let Some(q) = &self.search_query {
                    src.app_id = None;
                    src.company_name = None;
                    src.search_query = Some(q.clone());
                } else if let Some(c) = &self.company_name {
                    src.app_id = None;
                    src.company_name = Some(c.clone());
                }
            }
        }
        if src.identifier().is_none() {
            src.search_query = search.or_else(|| self.app_id.clone());
        }
        src.limit = Some(self.limit);
        if self.time_range_days.is_some() {
            src.time_range_days = self.time_range_days;
        }
        src
    }
}

pub struct FeedbackEngine {
    config: EngineConfig,
    generator: Arc<dyn SyntheticGenerator>,
    archive: Option<Arc<dyn RawArchive>>,
    sink: Option<Arc<dyn FeedbackSink>>,
    /// Adapters registered in code; they take precedence over config-built ones.
    adapters: BTreeMap<String, Arc<dyn SourceAdapter>>,
}

impl FeedbackEngine {
    pub fn new(config: EngineConfig) -> Self {
        let generator = Arc::new(TemplateGenerator::new(
            config.synthetic.seed,
            config.synthetic.items_per_source,
        ));
        let archive: Option<Arc<dyn RawArchive>> = config
            .archive_dir
            .as_ref()
            .map(|dir| Arc::new(FileArchive::new(dir)) as Arc<dyn RawArchive>);
        Self {
            config,
            generator,
            archive,
            sink: None,
            adapters: BTreeMap::new(),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn SyntheticGenerator>) -> Self {
        self.generator = generator;
        self
    }

    pub fn with_archive(mut self, archive: Arc<dyn RawArchive>) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn FeedbackSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_adapter(mut self, adapter: Arc<dyn SourceAdapter>) -> Self {
        self.adapters.insert(adapter.name().to_string(), adapter);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn adapter_for(&self, src: &SourceConfig) -> Result<Arc<dyn SourceAdapter>, ConfigError> {
        if let Some(a) = self.adapters.get(&src.name) {
            return Ok(Arc::clone(a));
        }
        let timeout = Duration::from_millis(self.config.orchestrator.attempt_timeout_ms);
        build_adapter(src, timeout, self.archive.clone())
    }

    /// Entry for `name`: registered adapter, configured source, or built-in kind.
    fn source_config(&self, name: &str) -> Result<SourceConfig, ConfigError> {
        match self.config.source(name) {
            Ok(src) => Ok(src),
            Err(e) if self.adapters.contains_key(name) => {
                tracing::debug!(source = name, error = %e, "using registered adapter without config entry");
                Ok(SourceConfig {
                    name: name.to_string(),
                    kind: SourceKind::Static,
                    app_id: None,
                    company_name: None,
                    search_query: None,
                    limit: None,
                    time_range_days: None,
                    url: None,
                    fixture: None,
                    bearer_token: None,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Jobs for an inbound query.
    pub fn jobs_for(&self, req: &CollectRequest) -> Result<Vec<SourceJob>, ConfigError> {
        if req.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if req.limit == 0 {
            return Err(ConfigError::InvalidLimit("request".into()));
        }
        req.sources
            .iter()
            .map(|name| {
                let src = req.apply_to(self.source_config(name)?);
                Ok(SourceJob::new(self.adapter_for(&src)?, src.query()?))
            })
            .collect()
    }

    /// Jobs for every configured source (used by the scheduler).
    pub fn configured_jobs(&self) -> Result<Vec<SourceJob>, ConfigError> {
        self.config.validate()?;
        self.config
            .sources
            .iter()
            .map(|src| Ok(SourceJob::new(self.adapter_for(src)?, src.query()?)))
            .collect()
    }

    pub async fn collect(&self, req: &CollectRequest) -> Result<Report, ConfigError> {
        let jobs = self.jobs_for(req)?;
        self.run_jobs(jobs).await
    }

    pub async fn run_configured(&self) -> Result<Report, ConfigError> {
        let jobs = self.configured_jobs()?;
        self.run_jobs(jobs).await
    }

    pub async fn run_jobs(&self, jobs: Vec<SourceJob>) -> Result<Report, ConfigError> {
        let orchestrator = FallbackOrchestrator::new(Arc::clone(&self.generator))
            .with_policy(self.config.orchestrator.clone());
        let outcome = orchestrator.run(jobs).await?;

        let merged = aggregate(&outcome.results, self.config.analysis.dedup);
        self.emit(&merged.items).await;

        let analysis = analyze_feed(&merged.items, &self.config.analysis);
        Ok(Report::build(&outcome, analysis))
    }

    /// Analyze items supplied by the caller; no collection, no fallback.
    /// Malformed items are dropped before they count toward any source.
    pub fn analyze_items(&self, items: Vec<FeedbackItem>) -> Report {
        let items = retain_valid(items);
        let outcome = CollectionOutcome::from_feed(&items);
        let merged = aggregate(&outcome.results, self.config.analysis.dedup);
        let analysis = analyze_feed(&merged.items, &self.config.analysis);
        Report::build(&outcome, analysis)
    }

    /// Best-effort hand-off of the canonical batch.
    async fn emit(&self, items: &[FeedbackItem]) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(e) = sink.store_batch(items).await {
            tracing::warn!(error = ?e, items = items.len(), "feedback sink rejected batch");
        }
    }
}
