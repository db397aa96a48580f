// src/ingest/providers/http.rs
//! Shared HTTP plumbing for vendor adapters: one client, optional bearer auth,
//! status → `FetchError` mapping, and best-effort raw payload archiving.

use metrics::histogram;
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;

use crate::error::FetchError;
use crate::ingest::sink::RawArchive;

const USER_AGENT: &str = "feedback-correlator/0.1 (+feedback collection bot)";

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
    bearer: Option<String>,
    archive: Option<Arc<dyn RawArchive>>,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            timeout,
            bearer: None,
            archive: None,
        })
    }

    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn with_archive(mut self, archive: Option<Arc<dyn RawArchive>>) -> Self {
        self.archive = archive;
        self
    }

    /// GET `url` with `params`, returning the body text of a 2xx response.
    pub async fn get_text(
        &self,
        source: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<String, FetchError> {
        let t0 = std::time::Instant::now();
        let mut req = self.client.get(url).query(params);
        if let Some(token) = &self.bearer {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await.map_err(|e| self.classify(e))?;
        check_status(resp.status())?;
        let body = resp.text().await.map_err(|e| self.classify(e))?;

        histogram!("collector_fetch_ms", "source" => source.to_string())
            .record(t0.elapsed().as_secs_f64() * 1_000.0);

        if let Some(archive) = &self.archive {
            if let Err(e) = archive.store_raw(source, &body).await {
                tracing::warn!(target: "ingest", error = ?e, source, "raw archive write failed");
            }
        }
        Ok(body)
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout.as_millis() as u64)
        } else if let Some(status) = e.status() {
            check_status(status).err().unwrap_or(FetchError::Status(status.as_u16()))
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

fn check_status(status: StatusCode) -> Result<(), FetchError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FetchError::Auth(status.to_string())),
        s => Err(FetchError::Status(s.as_u16())),
    }
}
