use std::sync::Arc;

use chrono::{DateTime, Utc};
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::engine::{CollectRequest, FeedbackEngine};
use crate::error::ConfigError;
use crate::ingest::normalize_text;
use crate::ingest::scheduler::LatestReport;
use crate::model::{FeedbackItem, Provenance};
use crate::report::Report;

#[derive(Clone)]
pub struct AppState {
    engine: Arc<FeedbackEngine>,
    latest: LatestReport,
}

impl AppState {
    pub fn new(engine: Arc<FeedbackEngine>, latest: LatestReport) -> Self {
        Self { engine, latest }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/collect", post(collect))
        .route("/analyze", post(analyze))
        .route("/report/latest", get(latest_report))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Configuration problems are the caller's fault (bad source list, zero limit).
struct ApiError(ConfigError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (StatusCode::BAD_REQUEST, body).into_response()
    }
}

async fn collect(
    State(state): State<AppState>,
    Json(req): Json<CollectRequest>,
) -> Result<Json<Report>, ApiError> {
    let report = state.engine.collect(&req).await.map_err(ApiError)?;
    Ok(Json(report))
}

/// Minimal item shape accepted by `/analyze`; ids and tags are assigned here.
#[derive(serde::Deserialize)]
struct AnalyzeItem {
    source: String,
    text: String,
    #[serde(default)]
    rating: Option<u8>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    synthetic: bool,
}

impl From<AnalyzeItem> for FeedbackItem {
    fn from(a: AnalyzeItem) -> Self {
        let provenance = if a.synthetic {
            Provenance::Synthetic
        } else {
            Provenance::Real
        };
        let mut it = FeedbackItem::new(
            a.source,
            normalize_text(&a.text),
            a.timestamp.unwrap_or_else(Utc::now),
            provenance,
        );
        if let Some(r) = a.rating {
            it = it.with_rating(r);
        }
        if let Some(author) = a.author {
            it = it.with_author(author);
        }
        it
    }
}

async fn analyze(State(state): State<AppState>, Json(items): Json<Vec<AnalyzeItem>>) -> Json<Report> {
    let items: Vec<FeedbackItem> = items.into_iter().map(Into::into).collect();
    Json(state.engine.analyze_items(items))
}

async fn latest_report(State(state): State<AppState>) -> Response {
    let snapshot = match state.latest.read() {
        Ok(guard) => guard.as_ref().map(Report::without_items),
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "latest report lock poisoned").into_response();
        }
    };
    match snapshot {
        Some(r) => Json(r).into_response(),
        None => (StatusCode::NOT_FOUND, "no scheduled report yet").into_response(),
    }
}
