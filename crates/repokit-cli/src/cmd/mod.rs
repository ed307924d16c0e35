pub mod branch_diff;
pub mod config;
pub mod status_report;
pub mod stripe_products;
pub mod verify_marketplace;
pub mod webhook_check;
pub mod worktrees;
pub mod xcode_targets;

use clap::Args;
use repokit_core::config::Config;
use repokit_core::stripe::StripeClient;
use std::path::{Path, PathBuf};

/// Everything a subcommand needs besides its own arguments.
pub struct Context {
    pub root: PathBuf,
    pub config: Config,
    pub json: bool,
    pub verbose: bool,
}

impl Context {
    /// Resolve a user-supplied path against the repository root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    pub fn repository_name(&self) -> String {
        let canonical = std::fs::canonicalize(&self.root).unwrap_or_else(|_| self.root.clone());
        canonical
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "repository".to_string())
    }
}

#[derive(Args, Debug, Clone)]
pub struct StripeArgs {
    /// Stripe secret key
    #[arg(long = "secret-key", env = "STRIPE_SECRET_KEY", hide_env_values = true)]
    pub secret_key: Option<String>,

    /// Stripe API base URL (default: stripe.api_base from config)
    #[arg(long, env = "STRIPE_API_BASE")]
    pub api_base: Option<String>,
}

impl StripeArgs {
    pub fn client(&self, config: &Config) -> anyhow::Result<StripeClient> {
        let mut stripe = config.stripe.clone();
        if let Some(base) = &self.api_base {
            stripe.api_base = base.clone();
        }
        let secret = self.secret_key.as_deref().unwrap_or_default();
        Ok(StripeClient::new(&stripe, secret)?)
    }
}
