//! Extraction functions for `git` porcelain and formatted output.
//!
//! Each function owns exactly one output format. Upstream format drift is
//! the main regression risk, so every function has a fixture test built
//! from real command output.

use crate::parse::Parsed;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// git diff --name-status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
    Copied,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Added => "added",
            ChangeStatus::Modified => "modified",
            ChangeStatus::Deleted => "deleted",
            ChangeStatus::Renamed => "renamed",
            ChangeStatus::Copied => "copied",
        }
    }

    /// Map a `--name-status` code (`A`, `M`, `R100`, ...) to a status. A type
    /// change (`T`) counts as a modification.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.chars().next()? {
            'A' => Some(ChangeStatus::Added),
            'M' | 'T' => Some(ChangeStatus::Modified),
            'D' => Some(ChangeStatus::Deleted),
            'R' => Some(ChangeStatus::Renamed),
            'C' => Some(ChangeStatus::Copied),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileChange {
    pub status: ChangeStatus,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<u8>,
}

/// Parse `git diff --name-status` output. One record per non-empty line;
/// lines with an unknown status code or a missing path are skipped.
pub fn parse_name_status(raw: &str) -> Parsed<FileChange> {
    let mut parsed = Parsed::default();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let code = fields[0].trim();
        let Some(status) = ChangeStatus::from_code(code) else {
            parsed.skip(line_no, line, format!("unknown status code '{code}'"));
            continue;
        };

        let change = match status {
            ChangeStatus::Renamed | ChangeStatus::Copied => {
                let (Some(old), Some(new)) = (fields.get(1), fields.get(2)) else {
                    parsed.skip(line_no, line, "rename/copy without both paths");
                    continue;
                };
                FileChange {
                    status,
                    path: (*new).to_string(),
                    old_path: Some((*old).to_string()),
                    similarity: code[1..].parse().ok(),
                }
            }
            _ => {
                let Some(path) = fields.get(1).filter(|p| !p.is_empty()) else {
                    parsed.skip(line_no, line, "missing path");
                    continue;
                };
                FileChange {
                    status,
                    path: (*path).to_string(),
                    old_path: None,
                    similarity: None,
                }
            }
        };
        parsed.records.push(change);
    }
    parsed
}

// ---------------------------------------------------------------------------
// git log --left-right
// ---------------------------------------------------------------------------

/// The `--format` string paired with [`parse_left_right_log`].
pub const LEFT_RIGHT_FORMAT: &str = "--format=%m%x09%h%x09%an%x09%s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Reachable only from the target (`>` marker).
    Ahead,
    /// Reachable only from the base (`<` marker).
    Behind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogCommit {
    #[serde(skip)]
    pub side: Side,
    pub hash: String,
    pub author: String,
    pub subject: String,
}

pub fn parse_left_right_log(raw: &str) -> Parsed<LogCommit> {
    let mut parsed = Parsed::default();
    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = line.splitn(4, '\t');
        let marker = fields.next().unwrap_or_default();
        let side = match marker {
            ">" => Side::Ahead,
            "<" => Side::Behind,
            _ => {
                parsed.skip(line_no, line, format!("unknown side marker '{marker}'"));
                continue;
            }
        };
        let Some(hash) = fields.next().filter(|h| !h.is_empty()) else {
            parsed.skip(line_no, line, "missing commit hash");
            continue;
        };
        parsed.records.push(LogCommit {
            side,
            hash: hash.to_string(),
            author: fields.next().unwrap_or_default().to_string(),
            subject: fields.next().unwrap_or_default().to_string(),
        });
    }
    parsed
}

// ---------------------------------------------------------------------------
// git worktree list --porcelain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorktreeEntry {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<String>,
    /// Short branch name (`refs/heads/` stripped).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub bare: bool,
    pub detached: bool,
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_reason: Option<String>,
    pub prunable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prunable_reason: Option<String>,
}

/// Parse `git worktree list --porcelain`. Blocks are separated by blank
/// lines and must open with a `worktree <path>` line.
pub fn parse_worktree_porcelain(raw: &str) -> Parsed<WorktreeEntry> {
    let mut parsed = Parsed::default();
    let mut current: Option<WorktreeEntry> = None;
    // True while skipping the remainder of a block that had no `worktree` line.
    let mut orphan_block = false;

    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            if let Some(entry) = current.take() {
                parsed.records.push(entry);
            }
            orphan_block = false;
            continue;
        }

        let (key, value) = match line.split_once(' ') {
            Some((k, v)) => (k, Some(v)),
            None => (line, None),
        };

        if key == "worktree" {
            if let Some(entry) = current.take() {
                parsed.records.push(entry);
            }
            match value.filter(|v| !v.is_empty()) {
                Some(path) => {
                    current = Some(WorktreeEntry {
                        path: path.to_string(),
                        ..WorktreeEntry::default()
                    });
                    orphan_block = false;
                }
                None => {
                    parsed.skip(line_no, line, "worktree line without a path");
                    orphan_block = true;
                }
            }
            continue;
        }

        let Some(entry) = current.as_mut() else {
            if !orphan_block {
                parsed.skip(line_no, line, "attribute outside a worktree block");
                orphan_block = true;
            }
            continue;
        };

        match key {
            "HEAD" => entry.head = value.map(str::to_string),
            "branch" => {
                entry.branch = value.map(|b| b.strip_prefix("refs/heads/").unwrap_or(b).to_string())
            }
            "bare" => entry.bare = true,
            "detached" => entry.detached = true,
            "locked" => {
                entry.locked = true;
                entry.locked_reason = value.map(str::to_string);
            }
            "prunable" => {
                entry.prunable = true;
                entry.prunable_reason = value.map(str::to_string);
            }
            _ => parsed.skip(line_no, line, format!("unknown attribute '{key}'")),
        }
    }

    if let Some(entry) = current.take() {
        parsed.records.push(entry);
    }
    parsed
}

// ---------------------------------------------------------------------------
// git branch --format=%(refname:short)
// ---------------------------------------------------------------------------

/// Parse a branch listing, tolerating the default `* ` / `+ ` decorations.
/// Detached-HEAD pseudo entries are dropped.
pub fn parse_branch_list(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|l| {
            let l = l.trim();
            l.strip_prefix("* ")
                .or_else(|| l.strip_prefix("+ "))
                .unwrap_or(l)
                .trim()
        })
        .filter(|l| !l.is_empty() && !l.starts_with('('))
        .map(str::to_string)
        .collect()
}

// ---------------------------------------------------------------------------
// git log --shortstat with record separators
// ---------------------------------------------------------------------------

/// The `--format` string paired with [`parse_log_with_shortstat`]: a record
/// separator (0x1e) then unit-separated (0x1f) fields.
pub const SHORTSTAT_FORMAT: &str = "--format=%x1e%H%x1f%h%x1f%an%x1f%ae%x1f%ct%x1f%s";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub hash: String,
    pub short_hash: String,
    pub author: String,
    pub email: String,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Shortstat {
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
}

static SHORTSTAT_RE: OnceLock<Regex> = OnceLock::new();

fn shortstat_re() -> &'static Regex {
    SHORTSTAT_RE.get_or_init(|| {
        Regex::new(
            r"^\s*(\d+) files? changed(?:, (\d+) insertions?\(\+\))?(?:, (\d+) deletions?\(-\))?\s*$",
        )
        .unwrap()
    })
}

/// Extract counts from a `--shortstat` summary line.
pub fn parse_shortstat_line(line: &str) -> Option<Shortstat> {
    let caps = shortstat_re().captures(line)?;
    let num = |i: usize| -> u64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse().ok())
            .unwrap_or(0)
    };
    Some(Shortstat {
        files_changed: num(1),
        insertions: num(2),
        deletions: num(3),
    })
}

pub fn parse_log_with_shortstat(raw: &str) -> Parsed<LogEntry> {
    let mut parsed = Parsed::default();
    let mut current: Option<LogEntry> = None;

    for (idx, line) in raw.lines().enumerate() {
        let line_no = idx + 1;
        if let Some(header) = line.strip_prefix('\u{1e}') {
            if let Some(entry) = current.take() {
                parsed.records.push(entry);
            }
            match parse_log_header(header) {
                Ok(entry) => current = Some(entry),
                Err(reason) => parsed.skip(line_no, line, reason),
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        match (parse_shortstat_line(line), current.as_mut()) {
            (Some(stat), Some(entry)) => {
                entry.files_changed = stat.files_changed;
                entry.insertions = stat.insertions;
                entry.deletions = stat.deletions;
            }
            (Some(_), None) => parsed.skip(line_no, line, "shortstat without a commit header"),
            (None, _) => parsed.skip(line_no, line, "unrecognized line"),
        }
    }

    if let Some(entry) = current.take() {
        parsed.records.push(entry);
    }
    parsed
}

fn parse_log_header(header: &str) -> std::result::Result<LogEntry, String> {
    let fields: Vec<&str> = header.splitn(6, '\u{1f}').collect();
    if fields.len() < 6 {
        return Err(format!("expected 6 fields, found {}", fields.len()));
    }
    let secs: i64 = fields[4]
        .trim()
        .parse()
        .map_err(|_| format!("invalid commit timestamp '{}'", fields[4]))?;
    let timestamp = DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| format!("commit timestamp out of range: {secs}"))?;
    Ok(LogEntry {
        hash: fields[0].to_string(),
        short_hash: fields[1].to_string(),
        author: fields[2].to_string(),
        email: fields[3].to_string(),
        timestamp,
        subject: fields[5].to_string(),
        files_changed: 0,
        insertions: 0,
        deletions: 0,
    })
}

/// Parse a single `%ct` value.
pub fn parse_commit_time(raw: &str) -> Option<DateTime<Utc>> {
    let secs: i64 = raw.trim().parse().ok()?;
    DateTime::from_timestamp(secs, 0)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const NAME_STATUS: &str = "A\tsrc/new.rs\nM\tREADME.md\nD\tdocs/old.md\nR087\tsrc/a.rs\tsrc/b.rs\nC100\tlib/x.rs\tlib/y.rs\nT\tscripts/run\n";

    #[test]
    fn name_status_fixture() {
        let parsed = parse_name_status(NAME_STATUS);
        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.records.len(), 6);
        assert_eq!(parsed.records[0].status, ChangeStatus::Added);
        assert_eq!(parsed.records[3].status, ChangeStatus::Renamed);
        assert_eq!(parsed.records[3].path, "src/b.rs");
        assert_eq!(parsed.records[3].old_path.as_deref(), Some("src/a.rs"));
        assert_eq!(parsed.records[3].similarity, Some(87));
        assert_eq!(parsed.records[5].status, ChangeStatus::Modified);
    }

    #[test]
    fn name_status_skips_unknown_codes() {
        let parsed = parse_name_status("U\tconflicted.rs\nM\tok.rs\nX\n\nR100\tonly-old.rs\n");
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.skipped.len(), 3);
        assert_eq!(parsed.skipped[0].line, 1);
        assert_eq!(parsed.skipped[2].line, 5);
    }

    #[test]
    fn name_status_keeps_quoted_path_literal() {
        let parsed = parse_name_status("M\t\"dir/with\\ttab.txt\"\n");
        assert_eq!(parsed.records[0].path, "\"dir/with\\ttab.txt\"");
    }

    #[test]
    fn left_right_fixture() {
        let raw = ">\tabc1234\tAlice\tAdd feature\n>\tdef5678\tBob\tFix: handle\ttabs\n<\t0123abc\tCarol\tHotfix on main\n";
        let parsed = parse_left_right_log(raw);
        assert_eq!(parsed.records.len(), 3);
        assert_eq!(parsed.records[0].side, Side::Ahead);
        assert_eq!(parsed.records[1].subject, "Fix: handle\ttabs");
        assert_eq!(parsed.records[2].side, Side::Behind);
    }

    #[test]
    fn left_right_skips_unknown_marker() {
        let parsed = parse_left_right_log("=\tabc\tA\ts\n>\t\tA\ts\n");
        assert!(parsed.records.is_empty());
        assert_eq!(parsed.skipped.len(), 2);
    }

    const WORKTREES: &str = "worktree /home/dev/repo\nHEAD 1111111111111111111111111111111111111111\nbranch refs/heads/main\n\nworktree /home/dev/repo-feature\nHEAD 2222222222222222222222222222222222222222\nbranch refs/heads/feature/login\nlocked needs review\n\nworktree /home/dev/repo-detached\nHEAD 3333333333333333333333333333333333333333\ndetached\nprunable gitdir file points to non-existent location\n\nworktree /home/dev/repo.git\nbare\n";

    #[test]
    fn worktree_porcelain_fixture() {
        let parsed = parse_worktree_porcelain(WORKTREES);
        assert!(parsed.skipped.is_empty(), "{:?}", parsed.skipped);
        assert_eq!(parsed.records.len(), 4);
        assert_eq!(parsed.records[0].branch.as_deref(), Some("main"));
        assert_eq!(parsed.records[1].branch.as_deref(), Some("feature/login"));
        assert!(parsed.records[1].locked);
        assert_eq!(
            parsed.records[1].locked_reason.as_deref(),
            Some("needs review")
        );
        assert!(parsed.records[2].detached);
        assert!(parsed.records[2].prunable);
        assert!(parsed.records[3].bare);
        assert_eq!(parsed.records[3].head, None);
    }

    #[test]
    fn worktree_block_without_header_is_skipped_once() {
        let raw = "HEAD abc\nbranch refs/heads/x\n\nworktree /ok\nHEAD def\nfuture-key 1\n";
        let parsed = parse_worktree_porcelain(raw);
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].path, "/ok");
        assert_eq!(parsed.skipped.len(), 2);
        assert_eq!(parsed.skipped[0].line, 1);
        assert_eq!(parsed.skipped[1].line, 6);
    }

    #[test]
    fn branch_list_strips_decorations() {
        let raw = "* main\n  feature/a\n+ wt-branch\n(HEAD detached at abc123)\n\n";
        assert_eq!(
            parse_branch_list(raw),
            vec!["main", "feature/a", "wt-branch"]
        );
    }

    #[test]
    fn shortstat_line_variants() {
        assert_eq!(
            parse_shortstat_line(" 3 files changed, 10 insertions(+), 2 deletions(-)"),
            Some(Shortstat {
                files_changed: 3,
                insertions: 10,
                deletions: 2
            })
        );
        assert_eq!(
            parse_shortstat_line(" 1 file changed, 1 insertion(+)"),
            Some(Shortstat {
                files_changed: 1,
                insertions: 1,
                deletions: 0
            })
        );
        assert_eq!(
            parse_shortstat_line(" 2 files changed, 5 deletions(-)"),
            Some(Shortstat {
                files_changed: 2,
                insertions: 0,
                deletions: 5
            })
        );
        assert_eq!(parse_shortstat_line("not a stat"), None);
    }

    #[test]
    fn log_with_shortstat_fixture() {
        let raw = "\u{1e}aaaa\u{1f}aaa\u{1f}Alice\u{1f}alice@example.com\u{1f}1760000000\u{1f}Add login\n\n 2 files changed, 30 insertions(+), 4 deletions(-)\n\u{1e}bbbb\u{1f}bbb\u{1f}Bob\u{1f}bob@example.com\u{1f}1760003600\u{1f}Empty commit\n\u{1e}broken\u{1f}header\n";
        let parsed = parse_log_with_shortstat(raw);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].author, "Alice");
        assert_eq!(parsed.records[0].insertions, 30);
        assert_eq!(parsed.records[0].timestamp.timestamp(), 1_760_000_000);
        assert_eq!(parsed.records[1].files_changed, 0);
        assert_eq!(parsed.skipped.len(), 1);
        assert_eq!(parsed.skipped[0].line, 5);
    }

    #[test]
    fn commit_time_parses_epoch_seconds() {
        assert_eq!(
            parse_commit_time("1760000000\n").map(|t| t.timestamp()),
            Some(1_760_000_000)
        );
        assert_eq!(parse_commit_time("yesterday"), None);
    }
}
