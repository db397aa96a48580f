// src/ingest/sink.rs
//! Outbound collaborators: the raw-payload audit archive and the canonical batch sink.
//! Both are best-effort; callers log failures and carry on.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

use crate::model::FeedbackItem;

#[async_trait::async_trait]
pub trait RawArchive: Send + Sync {
    /// Keep a raw vendor payload for auditing.
    async fn store_raw(&self, source: &str, payload: &str) -> Result<()>;
}

#[async_trait::async_trait]
pub trait FeedbackSink: Send + Sync {
    /// Store one canonical batch produced by a run.
    async fn store_batch(&self, items: &[FeedbackItem]) -> Result<()>;
}

/// Writes `{root}/run{N}/scraped-data/{source}_{timestamp}.json`, one run dir per instance.
pub struct FileArchive {
    run_dir: PathBuf,
}

impl FileArchive {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let run = next_run_number(root);
        Self {
            run_dir: root.join(format!("run{run}")).join("scraped-data"),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    async fn write(&self, prefix: &str, content: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.run_dir)
            .await
            .with_context(|| format!("creating {}", self.run_dir.display()))?;
        let stamp = Utc::now().format("%Y-%m-%dT%H-%M-%S-%3fZ");
        let path = self.run_dir.join(format!("{prefix}_{stamp}.json"));
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(path)
    }
}

/// Next free `runN` number under `root` (1 when the directory is missing or empty).
fn next_run_number(root: &Path) -> u32 {
    let Ok(entries) = std::fs::read_dir(root) else {
        return 1;
    };
    entries
        .flatten()
        .filter(|e| e.path().is_dir())
        .filter_map(|e| {
            e.file_name()
                .to_str()
                .and_then(|n| n.strip_prefix("run"))
                .and_then(|n| n.parse::<u32>().ok())
        })
        .max()
        .map_or(1, |n| n + 1)
}

#[async_trait::async_trait]
impl RawArchive for FileArchive {
    async fn store_raw(&self, source: &str, payload: &str) -> Result<()> {
        let path = self.write(source, payload).await?;
        tracing::debug!(target: "ingest", source, path = %path.display(), "raw payload archived");
        Ok(())
    }
}

#[async_trait::async_trait]
impl FeedbackSink for FileArchive {
    async fn store_batch(&self, items: &[FeedbackItem]) -> Result<()> {
        let body = serde_json::to_string_pretty(items)?;
        self.write("canonical_feed", &body).await?;
        Ok(())
    }
}

// --- Test helper ---
#[derive(Default)]
pub struct MemorySink {
    pub raw: std::sync::Mutex<Vec<(String, String)>>,
    pub batches: std::sync::Mutex<Vec<Vec<FeedbackItem>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RawArchive for MemorySink {
    async fn store_raw(&self, source: &str, payload: &str) -> Result<()> {
        self.raw
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?
            .push((source.to_string(), payload.to_string()));
        Ok(())
    }
}

#[async_trait::async_trait]
impl FeedbackSink for MemorySink {
    async fn store_batch(&self, items: &[FeedbackItem]) -> Result<()> {
        self.batches
            .lock()
            .map_err(|_| anyhow::anyhow!("memory sink poisoned"))?
            .push(items.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn file_archive_numbers_runs_and_writes_payloads() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("run3")).unwrap();

        let archive = FileArchive::new(tmp.path());
        assert!(archive.run_dir().ends_with("run4/scraped-data"));

        archive.store_raw("reddit", r#"{"data":{}}"#).await.unwrap();
        let files: Vec<_> = std::fs::read_dir(archive.run_dir()).unwrap().flatten().collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().to_string_lossy().to_string();
        assert!(name.starts_with("reddit_") && name.ends_with(".json"));
    }
}
