// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyze::AnalysisConfig;
use crate::error::ConfigError;
use crate::ingest::orchestrator::OrchestratorPolicy;
use crate::ingest::types::{SourceIdentifier, SourceQuery};

const ENV_PATH: &str = "FEEDBACK_CONFIG_PATH";

/// Marker value for `bearer_token`: read `<NAME>_TOKEN` from the environment instead.
const TOKEN_FROM_ENV: &str = "ENV";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    AppStore,
    Reddit,
    HackerNews,
    Rss,
    Static,
}

impl SourceKind {
    /// Built-in kinds that can be used by name alone, without a config entry.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "app_store" | "appstore" => Some(SourceKind::AppStore),
            "reddit" => Some(SourceKind::Reddit),
            "hackernews" | "hacker_news" => Some(SourceKind::HackerNews),
            _ => None,
        }
    }

    /// Source name the built-in adapter of this kind reports.
    pub fn canonical_name(self) -> Option<&'static str> {
        match self {
            SourceKind::AppStore => Some("app_store"),
            SourceKind::Reddit => Some("reddit"),
            SourceKind::HackerNews => Some("hackernews"),
            SourceKind::Rss | SourceKind::Static => None,
        }
    }
}

/// One configured source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub kind: SourceKind,
    #[serde(default)]
    pub app_id: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub search_query: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub time_range_days: Option<u32>,
    /// Base URL override (required for `rss`).
    #[serde(default)]
    pub url: Option<String>,
    /// JSON fixture file (required for `static`).
    #[serde(default)]
    pub fixture: Option<PathBuf>,
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl SourceConfig {
    /// Entry for a built-in kind with nothing but its name set.
    pub fn builtin(name: &str) -> Option<Self> {
        let kind = SourceKind::from_name(name)?;
        Some(Self {
            name: kind.canonical_name().unwrap_or(name).to_string(),
            kind,
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

    /// First identifier set, in app id → company name → search query order.
    pub fn identifier(&self) -> Option<SourceIdentifier> {
        self.app_id
            .clone()
            .map(SourceIdentifier::AppId)
            .or_else(|| self.company_name.clone().map(SourceIdentifier::CompanyName))
            .or_else(|| self.search_query.clone().map(SourceIdentifier::SearchQuery))
    }

    pub fn query(&self) -> Result<SourceQuery, ConfigError> {
        if self.limit == Some(0) {
            return Err(ConfigError::InvalidLimit(self.name.clone()));
        }
        let identifier = match (self.identifier(), self.kind) {
            (Some(id), _) => id,
            // fixtures and feeds are fully described by their file / url
            (None, SourceKind::Static | SourceKind::Rss) => SourceIdentifier::SearchQuery(self.name.clone()),
            (None, _) => {
                return Err(ConfigError::Load(format!(
                    "source {}: one of app_id, company_name, search_query is required",
                    self.name
                )))
            }
        };
        let mut q = SourceQuery::new(identifier, self.limit.unwrap_or(0));
        if let Some(d) = self.time_range_days {
            q = q.with_time_range_days(d);
        }
        Ok(q)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub seed: Option<u64>,
    pub items_per_source: usize,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            seed: None,
            items_per_source: 5,
        }
    }
}

/// Everything a collection + analysis run needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub sources: Vec<SourceConfig>,
    pub orchestrator: OrchestratorPolicy,
    pub analysis: AnalysisConfig,
    pub synthetic: SyntheticConfig,
    pub archive_dir: Option<PathBuf>,
    /// Seconds between scheduled runs; `None` disables the scheduler.
    pub schedule_interval_secs: Option<u64>,
}

impl EngineConfig {
    /// Run-fatal checks: at least one source, unique names, positive limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        let mut seen = BTreeSet::new();
        for s in &self.sources {
            if !seen.insert(s.name.as_str()) {
                return Err(ConfigError::Load(format!("duplicate source name {}", s.name)));
            }
            s.query()?;
        }
        Ok(())
    }

    /// Configured entry by name, else a built-in kind of that name.
    pub fn source(&self, name: &str) -> Result<SourceConfig, ConfigError> {
        self.sources
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name.trim()))
            .cloned()
            .or_else(|| SourceConfig::builtin(name))
            .ok_or_else(|| ConfigError::UnknownSource(name.to_string()))
    }

    /// Replace `"ENV"` bearer tokens with `<NAME>_TOKEN` from the environment.
    pub fn resolve_tokens(&mut self) {
        for s in &mut self.sources {
            if s.bearer_token.as_deref() != Some(TOKEN_FROM_ENV) {
                continue;
            }
            let var = token_var(&s.name);
            match std::env::var(&var) {
                Ok(v) if !v.trim().is_empty() => s.bearer_token = Some(v),
                _ => {
                    tracing::warn!(source = %s.name, var = %var, "bearer token variable not set; calling without auth");
                    s.bearer_token = None;
                }
            }
        }
    }
}

fn token_var(source: &str) -> String {
    let mut out: String = source
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    out.push_str("_TOKEN");
    out
}

/// Load config from an explicit path. Supports TOML or JSON formats.
pub fn load_config_from(path: &Path) -> Result<EngineConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let mut cfg = parse_config(&content, ext.as_str())
        .with_context(|| format!("parsing config {}", path.display()))?;
    cfg.resolve_tokens();
    Ok(cfg)
}

/// Load config using env var + fallbacks:
/// 1) $FEEDBACK_CONFIG_PATH
/// 2) config/feedback.toml
/// 3) config/feedback.json
/// 4) built-in defaults (no sources)
pub fn load_config_default() -> Result<EngineConfig> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/feedback.toml");
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    let json_p = PathBuf::from("config/feedback.json");
    if json_p.exists() {
        return load_config_from(&json_p);
    }
    Ok(EngineConfig::default())
}

fn parse_config(s: &str, hint_ext: &str) -> Result<EngineConfig> {
    if hint_ext == "json" || s.trim_start().starts_with('{') {
        return Ok(serde_json::from_str(s)?);
    }
    Ok(toml::from_str(s)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const SAMPLE: &str = r#"
archive_dir = "data"

[orchestrator]
max_attempts = 2
fallback_on_empty = false

[synthetic]
seed = 42

[[sources]]
name = "app_store"
kind = "app_store"
app_id = "123456"
limit = 50

[[sources]]
name = "reddit"
kind = "reddit"
search_query = "DemoApp"
bearer_token = "ENV"
"#;

    #[test]
    fn toml_sections_and_defaults() {
        let cfg = parse_config(SAMPLE, "toml").unwrap();
        assert_eq!(cfg.sources.len(), 2);
        assert_eq!(cfg.orchestrator.max_attempts, 2);
        assert!(!cfg.orchestrator.fallback_on_empty);
        assert_eq!(cfg.orchestrator.max_concurrency, 4);
        assert_eq!(cfg.synthetic.seed, Some(42));
        assert_eq!(cfg.synthetic.items_per_source, 5);
        assert_eq!(
            cfg.sources[0].query().unwrap().identifier,
            SourceIdentifier::AppId("123456".into())
        );
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_rejects_bad_configs() {
        assert_eq!(EngineConfig::default().validate(), Err(ConfigError::NoSources));

        let mut cfg = parse_config(SAMPLE, "toml").unwrap();
        cfg.sources[0].limit = Some(0);
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidLimit("app_store".into())));

        let mut dup = parse_config(SAMPLE, "toml").unwrap();
        dup.sources[1].name = "app_store".into();
        assert!(matches!(dup.validate(), Err(ConfigError::Load(_))));
    }

    #[test]
    fn lookup_falls_back_to_builtin_kinds() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.source("Reddit").unwrap().kind, SourceKind::Reddit);
        assert_eq!(
            cfg.source("glassdoor"),
            Err(ConfigError::UnknownSource("glassdoor".into()))
        );
    }

    #[serial_test::serial]
    #[test]
    fn env_tokens_are_resolved() {
        env::set_var("REDDIT_TOKEN", "secret");
        let mut cfg = parse_config(SAMPLE, "toml").unwrap();
        cfg.resolve_tokens();
        assert_eq!(cfg.sources[1].bearer_token.as_deref(), Some("secret"));

        env::remove_var("REDDIT_TOKEN");
        let mut cfg = parse_config(SAMPLE, "toml").unwrap();
        cfg.resolve_tokens();
        assert_eq!(cfg.sources[1].bearer_token, None);
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_PATH);

        let cfg = load_config_default().unwrap();
        assert!(cfg.sources.is_empty());

        fs::create_dir_all("config").unwrap();
        fs::write("config/feedback.toml", SAMPLE).unwrap();
        assert_eq!(load_config_default().unwrap().sources.len(), 2);

        let p_json = tmp.path().join("override.json");
        fs::write(
            &p_json,
            r#"{"sources":[{"name":"hn","kind":"hacker_news","search_query":"DemoApp"}]}"#,
        )
        .unwrap();
        env::set_var(ENV_PATH, p_json.display().to_string());
        let cfg = load_config_default().unwrap();
        assert_eq!(cfg.sources[0].kind, SourceKind::HackerNews);

        env::set_var(ENV_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(load_config_default().is_err());
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
