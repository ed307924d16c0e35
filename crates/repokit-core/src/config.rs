use crate::error::{RepokitError, Result};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// WebhookConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Events every payment webhook handler is expected to cover.
    #[serde(default = "default_critical_events")]
    pub critical_events: Vec<String>,
    /// Substrings that indicate the handler verifies the payload signature.
    #[serde(default = "default_signature_markers")]
    pub signature_markers: Vec<String>,
    /// Substrings (case-insensitive) that mark a file as webhook code. A file
    /// naming events without any of these is not a handler.
    #[serde(default = "default_context_markers")]
    pub context_markers: Vec<String>,
    /// First segment of a quoted string that makes it a Stripe event name.
    #[serde(default = "default_event_prefixes")]
    pub event_prefixes: Vec<String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
}

fn default_critical_events() -> Vec<String> {
    [
        "checkout.session.completed",
        "customer.subscription.created",
        "customer.subscription.updated",
        "customer.subscription.deleted",
        "invoice.paid",
        "invoice.payment_failed",
        "payment_intent.succeeded",
        "payment_intent.payment_failed",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_signature_markers() -> Vec<String> {
    [
        "webhooks.constructEvent",
        "webhooks.constructEventAsync",
        "Webhook.construct_event",
        "webhook.ConstructEvent",
        "Webhook::construct_event",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_context_markers() -> Vec<String> {
    ["webhook", "stripe-signature", "event.type", "event['type']", "event[\"type\"]"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_event_prefixes() -> Vec<String> {
    [
        "account",
        "balance",
        "billing_portal",
        "charge",
        "checkout",
        "coupon",
        "customer",
        "invoice",
        "invoiceitem",
        "payment_intent",
        "payment_method",
        "payout",
        "price",
        "product",
        "promotion_code",
        "refund",
        "setup_intent",
        "subscription_schedule",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_extensions() -> Vec<String> {
    ["ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "rb", "go", "rs"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignore_dirs() -> Vec<String> {
    [".git", "node_modules", "target", "dist", "build", ".next", "vendor"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            critical_events: default_critical_events(),
            signature_markers: default_signature_markers(),
            context_markers: default_context_markers(),
            event_prefixes: default_event_prefixes(),
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
        }
    }
}

// ---------------------------------------------------------------------------
// StripeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StripeConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
}

fn default_api_base() -> String {
    "https://api.stripe.com".to_string()
}

fn default_page_limit() -> u32 {
    100
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            page_limit: default_page_limit(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Effective configuration for one invocation. Built once at startup and
/// handed to each tool; nothing reads configuration from ambient state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_main_branch")]
    pub main_branch: String,
    #[serde(default = "default_stale_days")]
    pub stale_days: i64,
    /// Cap for ranked lists in text output. JSON output is never capped.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub stripe: StripeConfig,
}

fn default_main_branch() -> String {
    "main".to_string()
}

fn default_stale_days() -> i64 {
    30
}

fn default_top_n() -> usize {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            main_branch: default_main_branch(),
            stale_days: default_stale_days(),
            top_n: default_top_n(),
            webhook: WebhookConfig::default(),
            stripe: StripeConfig::default(),
        }
    }
}

impl Config {
    /// Load `.repokit.yaml` from `root`, falling back to defaults when the
    /// file does not exist.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(&path)?;
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(&data)
            .map_err(|e| RepokitError::InvalidConfig(format!("{}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.main_branch.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "main_branch must not be empty".to_string(),
            });
        }

        if self.stale_days <= 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!("stale_days must be positive (got {})", self.stale_days),
            });
        }

        if self.top_n == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "top_n is 0; text reports will list no entries".to_string(),
            });
        }

        if self.webhook.critical_events.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "webhook.critical_events is empty; webhook-check will never report unhandled events"
                    .to_string(),
            });
        }

        for event in &self.webhook.critical_events {
            if !event.contains('.') {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("critical event '{event}' is not a dotted event name"),
                });
            }
        }

        if self.webhook.signature_markers.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "webhook.signature_markers is empty; signature verification can never be detected"
                    .to_string(),
            });
        }

        if !self.stripe.api_base.starts_with("http://")
            && !self.stripe.api_base.starts_with("https://")
        {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "stripe.api_base '{}' must be an http(s) URL",
                    self.stripe.api_base
                ),
            });
        }

        if self.stripe.page_limit == 0 || self.stripe.page_limit > 100 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "stripe.page_limit must be between 1 and 100 (got {})",
                    self.stripe.page_limit
                ),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_have_eight_critical_events() {
        let config = Config::default();
        assert_eq!(config.webhook.critical_events.len(), 8);
        assert_eq!(config.main_branch, "main");
        assert_eq!(config.stale_days, 30);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.top_n, 10);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".repokit.yaml"),
            "main_branch: trunk\nwebhook:\n  critical_events:\n    - invoice.paid\n",
        )
        .unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.main_branch, "trunk");
        assert_eq!(config.stale_days, 30);
        assert_eq!(config.webhook.critical_events, vec!["invoice.paid"]);
        assert!(!config.webhook.signature_markers.is_empty());
    }

    #[test]
    fn malformed_file_is_invalid_config() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".repokit.yaml"), "stale_days: [nope").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, RepokitError::InvalidConfig(_)));
    }

    #[test]
    fn validate_flags_bad_values() {
        let config = Config {
            stale_days: 0,
            stripe: StripeConfig {
                api_base: "ftp://example".to_string(),
                page_limit: 500,
            },
            ..Config::default()
        };
        let errors = config
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .count();
        assert_eq!(errors, 3);
    }
}
