// src/lib.rs
// Public library surface for the server binary and integration tests.

pub mod analyze;
pub mod api;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod report;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::engine::{CollectRequest, FeedbackEngine};
pub use crate::error::{AggregationError, ConfigError, FetchError, SourceError};
pub use crate::model::{FeedbackItem, Provenance, Sentiment, SourceResult, SourceStatus};
pub use crate::report::Report;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the compact tracing subscriber. `RUST_LOG` wins over the default filter;
/// a second call (or an already installed subscriber) is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("feedback_correlator=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}
