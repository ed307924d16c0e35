use super::Context;
use crate::output::{print_json, print_skipped, print_table};
use anyhow::Context as _;
use repokit_core::parse::more_marker;
use repokit_core::source::SystemRunner;
use repokit_core::worktree::{self, WorktreeOptions, WorktreeStatus};

pub fn run(
    ctx: &Context,
    main_branch: Option<String>,
    stale_days: Option<i64>,
) -> anyhow::Result<()> {
    let stale_days = stale_days.unwrap_or(ctx.config.stale_days);
    if stale_days < 0 {
        anyhow::bail!("--stale-days must not be negative, got {stale_days}");
    }
    let opts = WorktreeOptions {
        main_branch: main_branch.unwrap_or_else(|| ctx.config.main_branch.clone()),
        stale_days,
        now: chrono::Utc::now(),
    };

    let runner = SystemRunner::new(&ctx.root);
    let status = worktree::collect(&runner, &opts).context("failed to inspect worktrees")?;

    if ctx.json {
        return print_json(&status);
    }
    print_text(&status, ctx.config.top_n, ctx.verbose);
    Ok(())
}

fn print_text(status: &WorktreeStatus, top_n: usize, verbose: bool) {
    if status.worktrees.is_empty() {
        println!("No worktrees.");
        print_skipped(&status.skipped, verbose);
        return;
    }

    let rows: Vec<Vec<String>> = status
        .worktrees
        .iter()
        .take(top_n)
        .map(|wt| {
            let branch = wt
                .entry
                .branch
                .clone()
                .or_else(|| wt.entry.head.as_deref().map(|h| h.chars().take(8).collect()))
                .unwrap_or_else(|| "-".to_string());
            let age = wt
                .age_days
                .map(|d| format!("{d}d"))
                .unwrap_or_else(|| "-".to_string());
            let changes = wt
                .changed_files
                .map(|n| n.to_string())
                .unwrap_or_else(|| "-".to_string());
            let flags: Vec<&str> = wt.flags.iter().map(|f| f.as_str()).collect();
            vec![
                wt.entry.path.clone(),
                branch,
                age,
                changes,
                flags.join(","),
            ]
        })
        .collect();
    print_table(&["PATH", "BRANCH", "AGE", "CHANGES", "FLAGS"], rows);
    if let Some(more) = more_marker(status.worktrees.len(), top_n) {
        println!("{more}");
    }

    println!();
    let counts: Vec<String> = status
        .flag_counts
        .iter()
        .map(|(flag, n)| format!("{flag} {n}"))
        .collect();
    if counts.is_empty() {
        println!("{} worktrees, none flagged", status.total);
    } else {
        println!("{} worktrees: {}", status.total, counts.join(", "));
    }

    print_skipped(&status.skipped, verbose);
}
