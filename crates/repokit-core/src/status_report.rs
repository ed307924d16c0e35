//! Periodic status report: commits, contributors and merged pull requests
//! for a date window, rendered as Markdown or JSON.

use crate::error::{RepokitError, Result};
use crate::git::{self, LogEntry};
use crate::parse::{more_marker, SkippedLine};
use crate::source::CommandRunner;
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub since: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDate>,
}

impl Period {
    /// The `days` days ending `today` (a local calendar date).
    pub fn last_days(days: i64, today: NaiveDate) -> Result<Self> {
        let since = Duration::try_days(days)
            .and_then(|span| today.checked_sub_signed(span))
            .ok_or_else(|| {
                RepokitError::Usage(format!("--days {days} reaches past the supported date range"))
            })?;
        Ok(Self { since, until: None })
    }

    /// `at` falls on a local calendar day inside the period.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let day = at.with_timezone(&Local).date_naive();
        day >= self.since && self.until.map_or(true, |until| day <= until)
    }

    fn label(&self) -> String {
        match self.until {
            Some(until) => format!("{} to {}", self.since, until),
            None => format!("{} to now", self.since),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    pub name: String,
    pub email: String,
    pub commits: usize,
    pub insertions: u64,
    pub deletions: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportCounts {
    pub commits: usize,
    pub contributors: usize,
    pub files_changed: u64,
    pub insertions: u64,
    pub deletions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_prs: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub repository: String,
    pub period: Period,
    pub counts: ReportCounts,
    pub commits: Vec<LogEntry>,
    /// Most commits first; equal counts keep first-seen order.
    pub contributors: Vec<Contributor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_requests: Option<Vec<PullRequest>>,
    pub skipped: Vec<SkippedLine>,
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

pub fn collect(
    runner: &dyn CommandRunner,
    repository: &str,
    period: Period,
    include_prs: bool,
) -> Result<StatusReport> {
    if let Some(until) = period.until {
        if until < period.since {
            return Err(RepokitError::Usage(format!(
                "--until {until} is before --since {}",
                period.since
            )));
        }
    }

    if period.since > Local::now().date_naive() {
        tracing::debug!(since = %period.since, "period starts in the future; skipping git");
        let pull_requests = include_prs.then(Vec::new);
        return Ok(aggregate(repository, period, Vec::new(), pull_requests, Vec::new()));
    }

    let since_arg = format!("--since={} 00:00:00", period.since);
    let until_arg = period.until.map(|u| format!("--until={u} 23:59:59"));
    let mut args = vec!["log", "--no-merges", since_arg.as_str()];
    if let Some(until) = until_arg.as_deref() {
        args.push(until);
    }
    args.push(git::SHORTSTAT_FORMAT);
    args.push("--shortstat");

    let raw = runner.run("git", &args)?;
    let parsed = git::parse_log_with_shortstat(&raw);
    // git ignores --since dates it cannot represent.
    let commits: Vec<LogEntry> = parsed
        .records
        .into_iter()
        .filter(|c| period.contains(c.timestamp))
        .collect();

    let pull_requests = if include_prs {
        Some(merged_pull_requests(runner, &period)?)
    } else {
        None
    };

    Ok(aggregate(
        repository,
        period,
        commits,
        pull_requests,
        parsed.skipped,
    ))
}

#[derive(Debug, Deserialize)]
struct GhAuthor {
    login: String,
}

#[derive(Debug, Deserialize)]
struct GhPullRequest {
    number: u64,
    title: String,
    #[serde(default)]
    author: Option<GhAuthor>,
    #[serde(rename = "mergedAt", default)]
    merged_at: Option<DateTime<Utc>>,
}

fn merged_pull_requests(runner: &dyn CommandRunner, period: &Period) -> Result<Vec<PullRequest>> {
    let search = match period.until {
        Some(until) => format!("merged:{}..{}", period.since, until),
        None => format!("merged:>={}", period.since),
    };
    let raw = runner.run(
        "gh",
        &[
            "pr",
            "list",
            "--state",
            "merged",
            "--search",
            &search,
            "--json",
            "number,title,author,mergedAt",
            "--limit",
            "100",
        ],
    )?;
    parse_gh_pull_requests(&raw)
}

/// Parse `gh pr list --json number,title,author,mergedAt`.
pub fn parse_gh_pull_requests(raw: &str) -> Result<Vec<PullRequest>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let items: Vec<GhPullRequest> = serde_json::from_str(raw)?;
    let mut prs: Vec<PullRequest> = items
        .into_iter()
        .map(|p| PullRequest {
            number: p.number,
            title: p.title,
            author: p
                .author
                .map(|a| a.login)
                .unwrap_or_else(|| "ghost".to_string()),
            merged_at: p.merged_at,
        })
        .collect();
    prs.sort_by(|a, b| b.merged_at.cmp(&a.merged_at).then(b.number.cmp(&a.number)));
    Ok(prs)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

pub fn aggregate(
    repository: &str,
    period: Period,
    commits: Vec<LogEntry>,
    pull_requests: Option<Vec<PullRequest>>,
    skipped: Vec<SkippedLine>,
) -> StatusReport {
    let mut contributors: Vec<Contributor> = Vec::new();
    let mut counts = ReportCounts::default();

    for commit in &commits {
        counts.files_changed += commit.files_changed;
        counts.insertions += commit.insertions;
        counts.deletions += commit.deletions;

        match contributors.iter_mut().find(|c| c.name == commit.author) {
            Some(c) => {
                c.commits += 1;
                c.insertions += commit.insertions;
                c.deletions += commit.deletions;
            }
            None => contributors.push(Contributor {
                name: commit.author.clone(),
                email: commit.email.clone(),
                commits: 1,
                insertions: commit.insertions,
                deletions: commit.deletions,
            }),
        }
    }
    // Stable sort: ties stay in first-seen order.
    contributors.sort_by(|a, b| b.commits.cmp(&a.commits));

    counts.commits = commits.len();
    counts.contributors = contributors.len();
    counts.merged_prs = pull_requests.as_ref().map(Vec::len);

    StatusReport {
        repository: repository.to_string(),
        period,
        counts,
        commits,
        contributors,
        pull_requests,
        skipped,
    }
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

impl StatusReport {
    pub fn summary_line(&self) -> String {
        let c = &self.counts;
        format!(
            "{} commits by {} contributor(s), {} files changed (+{} / -{})",
            c.commits, c.contributors, c.files_changed, c.insertions, c.deletions
        )
    }

    /// Render the report as Markdown. Lists are capped at `top_n` entries;
    /// counts are never capped.
    pub fn to_markdown(&self, top_n: usize) -> String {
        let mut out = String::new();
        let c = &self.counts;

        let _ = writeln!(out, "# Status Report: {}", self.repository);
        let _ = writeln!(out);
        let _ = writeln!(out, "Period: {}", self.period.label());
        let _ = writeln!(out);

        let _ = writeln!(out, "## Summary");
        let _ = writeln!(out);
        let _ = writeln!(out, "{}.", self.summary_line());
        let _ = writeln!(out);

        let _ = writeln!(out, "## Metrics");
        let _ = writeln!(out);
        let _ = writeln!(out, "| Metric | Value |");
        let _ = writeln!(out, "|--------|-------|");
        let _ = writeln!(out, "| Commits | {} |", c.commits);
        let _ = writeln!(out, "| Contributors | {} |", c.contributors);
        let _ = writeln!(out, "| Files changed | {} |", c.files_changed);
        let _ = writeln!(out, "| Insertions | {} |", c.insertions);
        let _ = writeln!(out, "| Deletions | {} |", c.deletions);
        if let Some(prs) = c.merged_prs {
            let _ = writeln!(out, "| Merged PRs | {prs} |");
        }
        let _ = writeln!(out);

        if !self.contributors.is_empty() {
            let _ = writeln!(out, "## Contributors");
            let _ = writeln!(out);
            let _ = writeln!(out, "| Contributor | Commits | Lines |");
            let _ = writeln!(out, "|-------------|---------|-------|");
            for contributor in self.contributors.iter().take(top_n) {
                let _ = writeln!(
                    out,
                    "| {} | {} | +{} / -{} |",
                    escape_cell(&contributor.name),
                    contributor.commits,
                    contributor.insertions,
                    contributor.deletions
                );
            }
            if let Some(more) = more_marker(self.contributors.len(), top_n) {
                let _ = writeln!(out);
                let _ = writeln!(out, "{more}");
            }
            let _ = writeln!(out);
        }

        if !self.commits.is_empty() {
            let _ = writeln!(out, "## Recent Commits");
            let _ = writeln!(out);
            for commit in self.commits.iter().take(top_n) {
                let _ = writeln!(
                    out,
                    "- `{}` {} ({})",
                    commit.short_hash, commit.subject, commit.author
                );
            }
            if let Some(more) = more_marker(self.commits.len(), top_n) {
                let _ = writeln!(out, "- {more}");
            }
            let _ = writeln!(out);
        }

        if let Some(prs) = &self.pull_requests {
            let _ = writeln!(out, "## Merged Pull Requests");
            let _ = writeln!(out);
            if prs.is_empty() {
                let _ = writeln!(out, "No pull requests merged in this period.");
            }
            for pr in prs.iter().take(top_n) {
                let _ = writeln!(out, "- #{} {} (@{})", pr.number, pr.title, pr.author);
            }
            if let Some(more) = more_marker(prs.len(), top_n) {
                let _ = writeln!(out, "- {more}");
            }
            let _ = writeln!(out);
        }

        if !self.skipped.is_empty() {
            let _ = writeln!(out, "_{} lines skipped while parsing git output._", self.skipped.len());
        }

        out.trim_end().to_string() + "\n"
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
