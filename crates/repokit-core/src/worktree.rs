use crate::error::Result;
use crate::git::{self, WorktreeEntry};
use crate::parse::{whole_days_between, SkippedLine};
use crate::source::CommandRunner;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorktreeFlag {
    Merged,
    Stale,
    Dirty,
    Detached,
    Locked,
    Prunable,
    Bare,
}

impl WorktreeFlag {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorktreeFlag::Merged => "merged",
            WorktreeFlag::Stale => "stale",
            WorktreeFlag::Dirty => "dirty",
            WorktreeFlag::Detached => "detached",
            WorktreeFlag::Locked => "locked",
            WorktreeFlag::Prunable => "prunable",
            WorktreeFlag::Bare => "bare",
        }
    }
}

impl fmt::Display for WorktreeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Worktree {
    #[serde(flatten)]
    pub entry: WorktreeEntry,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_days: Option<i64>,
    /// Entries in `git status --porcelain`; absent when the path is missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changed_files: Option<usize>,
    pub flags: Vec<WorktreeFlag>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeStatus {
    pub main_branch: String,
    pub stale_days: i64,
    pub total: usize,
    pub flag_counts: BTreeMap<String, usize>,
    pub worktrees: Vec<Worktree>,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Clone)]
pub struct WorktreeOptions {
    pub main_branch: String,
    pub stale_days: i64,
    pub now: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

pub fn collect(runner: &dyn CommandRunner, opts: &WorktreeOptions) -> Result<WorktreeStatus> {
    let raw = runner.run("git", &["worktree", "list", "--porcelain"])?;
    let parsed = git::parse_worktree_porcelain(&raw);

    let merged_raw = runner.run(
        "git",
        &[
            "branch",
            "--format=%(refname:short)",
            "--merged",
            &opts.main_branch,
        ],
    )?;
    let merged: BTreeSet<String> = git::parse_branch_list(&merged_raw).into_iter().collect();

    let mut worktrees = Vec::with_capacity(parsed.records.len());
    for entry in parsed.records {
        let last_commit = if entry.bare {
            None
        } else {
            last_commit_time(runner, &entry)?
        };
        let changed_files = if entry.bare || entry.prunable || !Path::new(&entry.path).is_dir() {
            None
        } else {
            let status = runner.run("git", &["-C", &entry.path, "status", "--porcelain"])?;
            Some(status.lines().filter(|l| !l.trim().is_empty()).count())
        };
        worktrees.push(classify(entry, last_commit, changed_files, &merged, opts));
    }

    Ok(aggregate(worktrees, parsed.skipped, opts))
}

fn last_commit_time(
    runner: &dyn CommandRunner,
    entry: &WorktreeEntry,
) -> Result<Option<DateTime<Utc>>> {
    let Some(rev) = entry.branch.as_deref().or(entry.head.as_deref()) else {
        return Ok(None);
    };
    let raw = runner.run("git", &["log", "-1", "--format=%ct", rev, "--"])?;
    let parsed = git::parse_commit_time(&raw);
    if parsed.is_none() && !raw.trim().is_empty() {
        tracing::warn!(rev, output = %raw, "unparseable commit time");
    }
    Ok(parsed)
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

pub fn classify(
    entry: WorktreeEntry,
    last_commit: Option<DateTime<Utc>>,
    changed_files: Option<usize>,
    merged: &BTreeSet<String>,
    opts: &WorktreeOptions,
) -> Worktree {
    let age_days = last_commit.map(|t| whole_days_between(t, opts.now));
    let mut flags = Vec::new();

    if let Some(branch) = entry.branch.as_deref() {
        if branch != opts.main_branch && merged.contains(branch) {
            flags.push(WorktreeFlag::Merged);
        }
    }
    if age_days.is_some_and(|d| d > opts.stale_days) {
        flags.push(WorktreeFlag::Stale);
    }
    if changed_files.is_some_and(|n| n > 0) {
        flags.push(WorktreeFlag::Dirty);
    }
    if entry.detached {
        flags.push(WorktreeFlag::Detached);
    }
    if entry.locked {
        flags.push(WorktreeFlag::Locked);
    }
    if entry.prunable {
        flags.push(WorktreeFlag::Prunable);
    }
    if entry.bare {
        flags.push(WorktreeFlag::Bare);
    }

    Worktree {
        entry,
        last_commit,
        age_days,
        changed_files,
        flags,
    }
}

pub fn aggregate(
    worktrees: Vec<Worktree>,
    skipped: Vec<SkippedLine>,
    opts: &WorktreeOptions,
) -> WorktreeStatus {
    let mut flag_counts: BTreeMap<String, usize> = BTreeMap::new();
    for wt in &worktrees {
        for flag in &wt.flags {
            *flag_counts.entry(flag.as_str().to_string()).or_insert(0) += 1;
        }
    }
    WorktreeStatus {
        main_branch: opts.main_branch.clone(),
        stale_days: opts.stale_days,
        total: worktrees.len(),
        flag_counts,
        worktrees,
        skipped,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::scripted::ScriptedRunner;
    use chrono::{Duration, TimeZone};

    fn opts() -> WorktreeOptions {
        WorktreeOptions {
            main_branch: "main".to_string(),
            stale_days: 30,
            now: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn merged_and_stale_worktree() {
        let now = opts().now;
        let old = (now - Duration::days(45)).timestamp();
        let fresh = (now - Duration::days(1)).timestamp();

        // Paths do not exist on disk, so no status probe is issued.
        let runner = ScriptedRunner::new()
            .ok(
                "git worktree list --porcelain",
                "worktree /nonexistent/repo\nHEAD aaaa\nbranch refs/heads/main\n\nworktree /nonexistent/repo-old\nHEAD bbbb\nbranch refs/heads/feature/done\n",
            )
            .ok(
                "git branch --format=%(refname:short) --merged main",
                "main\nfeature/done\n",
            )
            .ok("git log -1 --format=%ct main --", &fresh.to_string())
            .ok("git log -1 --format=%ct feature/done --", &old.to_string());

        let status = collect(&runner, &opts()).unwrap();
        assert_eq!(status.total, 2);

        let main = &status.worktrees[0];
        assert!(main.flags.is_empty(), "main should carry no flags: {:?}", main.flags);

        let done = &status.worktrees[1];
        assert_eq!(done.age_days, Some(45));
        assert!(done.flags.contains(&WorktreeFlag::Merged));
        assert!(done.flags.contains(&WorktreeFlag::Stale));
        assert_eq!(status.flag_counts.get("merged"), Some(&1));
        assert_eq!(status.flag_counts.get("stale"), Some(&1));

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["worktrees"][1]["branch"], "feature/done");
        assert_eq!(json["worktrees"][1]["flags"][0], "merged");
        assert_eq!(json["worktrees"][1]["flags"][1], "stale");
    }

    #[test]
    fn stale_threshold_is_exclusive() {
        let o = opts();
        let entry = WorktreeEntry {
            path: "/x".to_string(),
            branch: Some("topic".to_string()),
            ..WorktreeEntry::default()
        };
        let exactly = classify(
            entry.clone(),
            Some(o.now - Duration::days(30)),
            None,
            &BTreeSet::new(),
            &o,
        );
        assert!(!exactly.flags.contains(&WorktreeFlag::Stale));
        let older = classify(
            entry,
            Some(o.now - Duration::days(31)),
            None,
            &BTreeSet::new(),
            &o,
        );
        assert!(older.flags.contains(&WorktreeFlag::Stale));
    }

    #[test]
    fn dirty_detached_and_locked_flags() {
        let entry = WorktreeEntry {
            path: "/x".to_string(),
            head: Some("cccc".to_string()),
            detached: true,
            locked: true,
            ..WorktreeEntry::default()
        };
        let wt = classify(entry, None, Some(3), &BTreeSet::new(), &opts());
        assert_eq!(
            wt.flags,
            vec![
                WorktreeFlag::Dirty,
                WorktreeFlag::Detached,
                WorktreeFlag::Locked
            ]
        );
    }

    #[test]
    fn dirty_probe_runs_for_existing_paths() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        let now = opts().now.timestamp();
        let runner = ScriptedRunner::new()
            .ok(
                "git worktree list --porcelain",
                &format!("worktree {path}\nHEAD aaaa\nbranch refs/heads/topic\n"),
            )
            .ok("git branch --format=%(refname:short) --merged main", "main\n")
            .ok("git log -1 --format=%ct topic --", &now.to_string())
            .ok(
                &crate::source::render_command("git", &["-C", &path, "status", "--porcelain"]),
                " M src/lib.rs\n?? notes.txt\n",
            );
        let status = collect(&runner, &opts()).unwrap();
        assert_eq!(status.worktrees[0].changed_files, Some(2));
        assert_eq!(status.worktrees[0].flags, vec![WorktreeFlag::Dirty]);
    }

    #[test]
    fn empty_listing_yields_zero_counts() {
        let runner = ScriptedRunner::new()
            .ok("git worktree list --porcelain", "")
            .ok("git branch --format=%(refname:short) --merged main", "");
        let status = collect(&runner, &opts()).unwrap();
        assert_eq!(status.total, 0);
        assert!(status.flag_counts.is_empty());
    }
}
