use super::Context;
use crate::output::{print_capped, print_json, print_skipped};
use anyhow::Context as _;
use repokit_core::branch_diff::{self, BranchDiff};
use repokit_core::source::SystemRunner;

pub fn run(ctx: &Context, target: Option<&str>, base: Option<&str>) -> anyhow::Result<()> {
    let runner = SystemRunner::new(&ctx.root);
    let base = base.unwrap_or(ctx.config.main_branch.as_str());
    let target = match target {
        Some(t) => t.to_string(),
        None => branch_diff::current_branch(&runner).context("failed to read current branch")?,
    };

    let diff = branch_diff::collect(&runner, base, &target)
        .with_context(|| format!("failed to diff {base}...{target}"))?;

    if ctx.json {
        return print_json(&diff);
    }
    print_text(&diff, ctx.config.top_n, ctx.verbose);
    Ok(())
}

fn print_text(diff: &BranchDiff, top_n: usize, verbose: bool) {
    println!(
        "{} vs {}: {} ahead, {} behind",
        diff.target, diff.base, diff.ahead, diff.behind
    );

    let breakdown: Vec<String> = diff
        .status_counts
        .iter()
        .map(|(status, count)| format!("{status} {count}"))
        .collect();
    if breakdown.is_empty() {
        println!("{} files changed", diff.files_changed);
    } else {
        println!(
            "{} files changed ({})",
            diff.files_changed,
            breakdown.join(", ")
        );
    }

    if !diff.ahead_commits.is_empty() {
        println!();
        println!("Ahead commits:");
        print_capped(&diff.ahead_commits, top_n, "  ", |c| {
            format!("{}  {}  ({})", c.hash, c.subject, c.author)
        });
    }

    if !diff.behind_commits.is_empty() {
        println!();
        println!("Behind commits:");
        print_capped(&diff.behind_commits, top_n, "  ", |c| {
            format!("{}  {}  ({})", c.hash, c.subject, c.author)
        });
    }

    if !diff.directories.is_empty() {
        println!();
        println!("Top directories:");
        print_capped(&diff.directories, top_n, "  ", |d| {
            format!("{:<32} {}", d.key, d.count)
        });
    }

    if !diff.changes.is_empty() {
        println!();
        println!("Changes:");
        print_capped(&diff.changes, top_n, "  ", |c| match &c.old_path {
            Some(old) => format!("{:<9} {old} -> {}", c.status.as_str(), c.path),
            None => format!("{:<9} {}", c.status.as_str(), c.path),
        });
    }

    print_skipped(&diff.skipped, verbose);
}
