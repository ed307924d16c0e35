mod cmd;
mod output;
mod root;

use anyhow::Context as _;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, Context, StripeArgs};
use repokit_core::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "repokit",
    about = "Read-only repository state reporters: branch diffs, worktrees, status reports, integration checks",
    version,
    propagate_version = true
)]
struct Cli {
    /// Repository root (default: auto-detect from .repokit.yaml or .git)
    #[arg(long, global = true, env = "REPOKIT_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Debug logging on stderr; list skipped lines individually
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize how a branch differs from the base branch
    BranchDiff {
        /// Branch to compare (default: the current branch)
        target: Option<String>,

        /// Base branch (default: main_branch from config)
        #[arg(long)]
        base: Option<String>,
    },

    /// List worktrees flagged as merged, stale, dirty, detached, locked or prunable
    Worktrees {
        /// Branch that merged worktrees are measured against
        #[arg(long)]
        main_branch: Option<String>,

        /// Days without commits before a worktree counts as stale
        #[arg(long)]
        stale_days: Option<i64>,
    },

    /// Commit and contributor report for a date window
    StatusReport {
        /// Report the last N days (1 to 36500)
        #[arg(long, conflicts_with = "since", value_parser = clap::value_parser!(u32).range(1..=36500))]
        days: Option<u32>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<NaiveDate>,

        /// End date, inclusive (YYYY-MM-DD)
        #[arg(long)]
        until: Option<NaiveDate>,

        /// Include merged pull requests (requires the gh CLI)
        #[arg(long)]
        prs: bool,

        /// Write the report to FILE instead of stdout
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Check webhook handlers for signature verification and critical events
    WebhookCheck {
        /// Files or directories to scan, relative to the root (default: the root)
        paths: Vec<PathBuf>,

        /// Also compare against endpoints configured in the Stripe account
        #[arg(long)]
        remote: bool,

        #[command(flatten)]
        stripe: StripeArgs,
    },

    /// List Stripe products with their prices
    StripeProducts {
        /// Include inactive products and prices
        #[arg(long)]
        all: bool,

        #[command(flatten)]
        stripe: StripeArgs,
    },

    /// Verify marketplace.json and the skills it registers
    VerifyMarketplace {
        /// Path to marketplace.json (default: .claude-plugin/marketplace.json)
        path: Option<PathBuf>,

        /// Remove missing skill paths and empty plugins, then rewrite the file
        #[arg(long)]
        fix: bool,
    },

    /// List native targets in an Xcode project
    XcodeTargets {
        /// Project bundle or project.pbxproj (default: first *.xcodeproj found)
        project: Option<PathBuf>,
    },

    /// Show or validate the effective configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version go to stdout and are not failures.
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let root = root::resolve_root(cli.root.as_deref());
    tracing::debug!(root = %root.display(), "resolved root");

    let config = Config::load(&root).context("failed to load config")?;
    let ctx = Context {
        root,
        config,
        json: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::BranchDiff { target, base } => {
            cmd::branch_diff::run(&ctx, target.as_deref(), base.as_deref())
        }
        Commands::Worktrees {
            main_branch,
            stale_days,
        } => cmd::worktrees::run(&ctx, main_branch, stale_days),
        Commands::StatusReport {
            days,
            since,
            until,
            prs,
            output,
        } => cmd::status_report::run(
            &ctx,
            cmd::status_report::ReportArgs {
                days,
                since,
                until,
                prs,
                output,
            },
        ),
        Commands::WebhookCheck {
            paths,
            remote,
            stripe,
        } => cmd::webhook_check::run(&ctx, &paths, remote, &stripe),
        Commands::StripeProducts { all, stripe } => cmd::stripe_products::run(&ctx, all, &stripe),
        Commands::VerifyMarketplace { path, fix } => {
            cmd::verify_marketplace::run(&ctx, path.as_deref(), fix)
        }
        Commands::XcodeTargets { project } => cmd::xcode_targets::run(&ctx, project.as_deref()),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    }
}
