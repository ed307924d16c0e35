use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Parse results
// ---------------------------------------------------------------------------

/// A line the parser could not interpret. Skipped lines never abort a parse;
/// they are carried alongside the records and reported in aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    /// 1-based line number within the raw output.
    pub line: usize,
    pub content: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub skipped: Vec<SkippedLine>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    pub fn skip(&mut self, line: usize, content: &str, reason: impl Into<String>) {
        let reason = reason.into();
        tracing::debug!(line, content, reason = %reason, "skipped line");
        self.skipped.push(SkippedLine {
            line,
            content: content.to_string(),
            reason,
        });
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

// ---------------------------------------------------------------------------
// Aggregation helpers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedCount {
    pub key: String,
    pub count: usize,
}

/// Order counts by descending count; equal counts fall back to the key's
/// lexical order.
pub fn rank_counts(counts: &BTreeMap<String, usize>) -> Vec<RankedCount> {
    let mut ranked: Vec<RankedCount> = counts
        .iter()
        .map(|(key, count)| RankedCount {
            key: key.clone(),
            count: *count,
        })
        .collect();
    // BTreeMap iteration is already lexical, so a stable sort keeps ties ordered.
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked
}

/// Top-level directory of a repository-relative path, `.` for files at the
/// root.
pub fn directory_of(path: &str) -> String {
    match path.split_once('/') {
        Some((dir, _)) if !dir.is_empty() => dir.to_string(),
        _ => ".".to_string(),
    }
}

/// Whole days elapsed from `earlier` to `later`, truncated toward zero.
pub fn whole_days_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> i64 {
    (later - earlier).num_days()
}

/// Format the tail marker used when a text list is capped.
pub fn more_marker(total: usize, shown: usize) -> Option<String> {
    if total > shown {
        Some(format!("... and {} more", total - shown))
    } else {
        None
    }
}
