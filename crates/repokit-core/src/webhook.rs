use crate::config::WebhookConfig;
use crate::error::Result;
use crate::paths::relative_display;
use crate::stripe::WebhookEndpoint;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A source file that verifies webhook signatures or names Stripe events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookFile {
    pub path: String,
    pub has_signature_verification: bool,
    pub events: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointCoverage {
    pub id: String,
    pub url: String,
    pub status: String,
    pub enabled_events: Vec<String>,
    pub missing_events: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookCheck {
    pub files_scanned: usize,
    pub has_signature_verification: bool,
    pub handler_files: Vec<WebhookFile>,
    pub handled_events: Vec<String>,
    pub critical_events: Vec<String>,
    /// Critical events no handler mentions, in configured order.
    pub unhandled_events: Vec<String>,
    pub unreadable_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<Vec<EndpointCoverage>>,
}

impl WebhookCheck {
    /// Handlers exist but none of them verifies the payload signature.
    pub fn failed(&self) -> bool {
        !self.handler_files.is_empty() && !self.has_signature_verification
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

static EVENT_RE: OnceLock<Regex> = OnceLock::new();

fn event_re() -> &'static Regex {
    EVENT_RE.get_or_init(|| {
        Regex::new(r#"["'`]([a-z][a-z_]*(?:\.[a-z][a-z_]*)+)["'`]"#).unwrap()
    })
}

/// Quoted dotted names whose first segment is a known Stripe resource.
/// Returned sorted and de-duplicated.
pub fn extract_events(content: &str, config: &WebhookConfig) -> Vec<String> {
    let mut events = BTreeSet::new();
    for caps in event_re().captures_iter(content) {
        let name = &caps[1];
        let prefix = name.split('.').next().unwrap_or_default();
        if config.event_prefixes.iter().any(|p| p == prefix) {
            events.insert(name.to_string());
        }
    }
    events.into_iter().collect()
}

pub fn has_signature_verification(content: &str, config: &WebhookConfig) -> bool {
    config
        .signature_markers
        .iter()
        .any(|marker| content.contains(marker.as_str()))
}

/// Any configured context marker appears in the file, ignoring case.
pub fn has_webhook_context(content: &str, config: &WebhookConfig) -> bool {
    let lower = content.to_lowercase();
    config
        .context_markers
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}

/// Classify one file's content. `None` when the file has nothing to do
/// with webhooks. Event-like strings without webhook context do not count.
pub fn analyze_source(path: &str, content: &str, config: &WebhookConfig) -> Option<WebhookFile> {
    let verified = has_signature_verification(content, config);
    if !verified && !has_webhook_context(content, config) {
        return None;
    }
    let events = extract_events(content, config);
    if !verified && events.is_empty() {
        return None;
    }
    Some(WebhookFile {
        path: path.to_string(),
        has_signature_verification: verified,
        events,
    })
}

// ---------------------------------------------------------------------------
// Scanning
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ScanResult {
    pub files_scanned: usize,
    pub handler_files: Vec<WebhookFile>,
    pub unreadable_files: Vec<String>,
}

fn is_source_file(path: &Path, config: &WebhookConfig) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| config.extensions.iter().any(|x| x == ext))
}

/// Walk `targets` (files or directories) in sorted order and analyze each
/// source file. Paths are reported relative to `root`.
pub fn scan(root: &Path, targets: &[PathBuf], config: &WebhookConfig) -> Result<ScanResult> {
    let mut result = ScanResult::default();
    let mut seen = BTreeSet::new();

    for target in targets {
        let walker = WalkDir::new(target)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !e.file_type().is_dir()
                    || !config
                        .ignore_dirs
                        .iter()
                        .any(|d| e.file_name().to_str() == Some(d.as_str()))
            });

        for entry in walker {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("walking {}: {e}", target.display()))
            })?;
            if !entry.file_type().is_file() || !is_source_file(entry.path(), config) {
                continue;
            }
            let shown = relative_display(root, entry.path());
            if !seen.insert(shown.clone()) {
                continue;
            }
            result.files_scanned += 1;

            let content = match std::fs::read_to_string(entry.path()) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(path = %shown, error = %e, "skipping unreadable file");
                    result.unreadable_files.push(shown);
                    continue;
                }
            };
            if let Some(file) = analyze_source(&shown, &content, config) {
                tracing::debug!(path = %file.path, events = file.events.len(), "webhook handler");
                result.handler_files.push(file);
            }
        }
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

pub fn endpoint_coverage(endpoint: &WebhookEndpoint, critical: &[String]) -> EndpointCoverage {
    let wildcard = endpoint.enabled_events.iter().any(|e| e == "*");
    let missing = if wildcard {
        Vec::new()
    } else {
        critical
            .iter()
            .filter(|c| !endpoint.enabled_events.contains(c))
            .cloned()
            .collect()
    };
    EndpointCoverage {
        id: endpoint.id.clone(),
        url: endpoint.url.clone(),
        status: endpoint.status.clone(),
        enabled_events: endpoint.enabled_events.clone(),
        missing_events: missing,
    }
}

pub fn aggregate(
    scan: ScanResult,
    config: &WebhookConfig,
    endpoints: Option<Vec<WebhookEndpoint>>,
) -> WebhookCheck {
    let handled: BTreeSet<String> = scan
        .handler_files
        .iter()
        .flat_map(|f| f.events.iter().cloned())
        .collect();

    let unhandled = config
        .critical_events
        .iter()
        .filter(|e| !handled.contains(*e))
        .cloned()
        .collect();

    let endpoints = endpoints.map(|list| {
        list.iter()
            .map(|ep| endpoint_coverage(ep, &config.critical_events))
            .collect()
    });

    WebhookCheck {
        files_scanned: scan.files_scanned,
        has_signature_verification: scan
            .handler_files
            .iter()
            .any(|f| f.has_signature_verification),
        handler_files: scan.handler_files,
        handled_events: handled.into_iter().collect(),
        critical_events: config.critical_events.clone(),
        unhandled_events: unhandled,
        unreadable_files: scan.unreadable_files,
        endpoints,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
