// src/ingest/mod.rs
pub mod config;
pub mod orchestrator;
pub mod providers;
pub mod scheduler;
pub mod sink;
pub mod synthetic;
pub mod types;

use crate::model::{FeedbackItem, SourceResult};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use std::collections::HashSet;

/// One-time metrics registration (so series show up on /metrics).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("collector_attempts_total", "Adapter fetch attempts, per source.");
        describe_counter!("collector_retries_total", "Attempts retried after a transient failure.");
        describe_counter!(
            "collector_fallbacks_total",
            "Sources answered with synthetic data instead of real data."
        );
        describe_counter!(
            "collector_source_errors_total",
            "Sources whose final attempt failed (transport, auth, parse, crash)."
        );
        describe_counter!(
            "collector_items_total",
            "Items collected, labelled by source and provenance."
        );
        describe_counter!(
            "aggregate_duplicates_total",
            "Items dropped as (source, text) duplicates during merge."
        );
        describe_counter!(
            "aggregate_malformed_total",
            "Items skipped during merge because they failed validation."
        );
        describe_histogram!("collector_fetch_ms", "Vendor HTTP fetch time in milliseconds.");
        describe_gauge!("collector_last_run_ts", "Unix ts when a collection run last finished.");
    });
}

const MAX_TEXT_CHARS: usize = 1500;

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").unwrap());

/// Clean vendor text before it is stored on an item.
///
/// Entities are decoded, markup becomes whitespace, typographic quotes fold to
/// ASCII, runs of whitespace collapse to one space and the result is capped at
/// 1500 characters. Punctuation is left alone.
pub fn normalize_text(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let plain = MARKUP.replace_all(&decoded, " ");

    let mut out = String::with_capacity(plain.len());
    for word in plain.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.extend(word.chars().map(fold_quote));
    }
    if let Some((cut, _)) = out.char_indices().nth(MAX_TEXT_CHARS) {
        out.truncate(cut);
    }
    out
}

fn fold_quote(c: char) -> char {
    match c {
        '\u{201C}' | '\u{201D}' | '\u{00AB}' | '\u{00BB}' => '"',
        '\u{2018}' | '\u{2019}' => '\'',
        other => other,
    }
}

/// "Title. Body" as review sites show it; an empty half is dropped.
pub fn headline_with_body(title: &str, body: &str) -> String {
    match (title.trim(), body.trim()) {
        ("", b) => b.to_string(),
        (t, "") => t.to_string(),
        (t, b) => format!("{t}. {b}"),
    }
}

/// Key used to spot the same feedback twice within one source. Case and
/// trailing sentence punctuation do not make two items distinct.
fn dedup_key(item: &FeedbackItem) -> (String, String) {
    let text = normalize_text(item.text()).to_lowercase();
    let text = text.trim_end_matches(['!', '?', '.', ',']).trim_end();
    (item.source().to_string(), text.to_string())
}

fn is_valid(item: &FeedbackItem) -> bool {
    match item.validate() {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(target: "ingest", source = item.source(), error = %e, "skipping malformed item");
            false
        }
    }
}

/// Drop items that fail validation, logging and counting each one.
pub fn retain_valid(items: Vec<FeedbackItem>) -> Vec<FeedbackItem> {
    ensure_metrics_described();
    let before = items.len();
    let kept: Vec<FeedbackItem> = items.into_iter().filter(is_valid).collect();
    counter!("aggregate_malformed_total").increment((before - kept.len()) as u64);
    kept
}

/// The canonical feed of one run plus merge statistics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregated {
    pub items: Vec<FeedbackItem>,
    pub duplicates: usize,
    pub malformed: usize,
}

/// Flatten per-source results into one canonical feed, in result order.
///
/// Invalid items are logged and skipped. With `dedup`, only the first item per
/// (source, normalized text) is kept. Provenance and tags pass through untouched.
pub fn aggregate(results: &[SourceResult], dedup: bool) -> Aggregated {
    ensure_metrics_described();

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut out = Aggregated::default();
    for r in results {
        for it in &r.items {
            if !is_valid(it) {
                out.malformed += 1;
                continue;
            }
            if dedup && !seen.insert(dedup_key(it)) {
                out.duplicates += 1;
                continue;
            }
            out.items.push(it.clone());
        }
    }

    counter!("aggregate_duplicates_total").increment(out.duplicates as u64);
    counter!("aggregate_malformed_total").increment(out.malformed as u64);
    tracing::debug!(
        target: "ingest",
        kept = out.items.len(),
        duplicates = out.duplicates,
        malformed = out.malformed,
        "aggregated"
    );
    out
}
