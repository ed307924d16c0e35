use crate::error::{RepokitError, Result};
use crate::git::{self, FileChange, LogCommit, Side};
use crate::parse::{directory_of, rank_counts, RankedCount, SkippedLine};
use crate::source::CommandRunner;
use serde::Serialize;
use std::collections::BTreeMap;

/// Commits and file changes between a base branch and a target branch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchDiff {
    pub base: String,
    pub target: String,
    pub ahead: usize,
    pub behind: usize,
    pub ahead_commits: Vec<LogCommit>,
    pub behind_commits: Vec<LogCommit>,
    pub files_changed: usize,
    /// Only statuses that occur are present; values sum to `files_changed`.
    pub status_counts: BTreeMap<String, usize>,
    /// Changed files per top-level directory, most changes first.
    pub directories: Vec<RankedCount>,
    pub changes: Vec<FileChange>,
    pub skipped: Vec<SkippedLine>,
}

/// Resolve the checked-out branch name.
pub fn current_branch(runner: &dyn CommandRunner) -> Result<String> {
    let name = runner.run("git", &["rev-parse", "--abbrev-ref", "HEAD"])?;
    let name = name.trim();
    if name.is_empty() || name == "HEAD" {
        return Err(RepokitError::Usage(
            "HEAD is detached; pass a target branch explicitly".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Read and aggregate `base...target`.
pub fn collect(runner: &dyn CommandRunner, base: &str, target: &str) -> Result<BranchDiff> {
    let range = format!("{base}...{target}");
    tracing::debug!(range = %range, "collecting branch diff");

    let log_raw = runner.run(
        "git",
        &["log", "--left-right", git::LEFT_RIGHT_FORMAT, &range],
    )?;
    let diff_raw = runner.run("git", &["diff", "--name-status", "-M", &range])?;

    let log = git::parse_left_right_log(&log_raw);
    let diff = git::parse_name_status(&diff_raw);

    let mut skipped = log.skipped;
    skipped.extend(diff.skipped);

    Ok(aggregate(base, target, log.records, diff.records, skipped))
}

pub fn aggregate(
    base: &str,
    target: &str,
    commits: Vec<LogCommit>,
    changes: Vec<FileChange>,
    skipped: Vec<SkippedLine>,
) -> BranchDiff {
    let (ahead_commits, behind_commits): (Vec<_>, Vec<_>) =
        commits.into_iter().partition(|c| c.side == Side::Ahead);

    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut dir_counts: BTreeMap<String, usize> = BTreeMap::new();
    for change in &changes {
        *status_counts
            .entry(change.status.as_str().to_string())
            .or_insert(0) += 1;
        *dir_counts.entry(directory_of(&change.path)).or_insert(0) += 1;
    }

    BranchDiff {
        base: base.to_string(),
        target: target.to_string(),
        ahead: ahead_commits.len(),
        behind: behind_commits.len(),
        ahead_commits,
        behind_commits,
        files_changed: changes.len(),
        status_counts,
        directories: rank_counts(&dir_counts),
        changes,
        skipped,
    }
}
