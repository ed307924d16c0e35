use super::Context;
use crate::output::{print_json, print_skipped};
use anyhow::Context as _;
use chrono::NaiveDate;
use repokit_core::io::atomic_write;
use repokit_core::source::SystemRunner;
use repokit_core::status_report::{self, Period};
use std::path::PathBuf;

const DEFAULT_DAYS: u32 = 7;

pub struct ReportArgs {
    pub days: Option<u32>,
    pub since: Option<NaiveDate>,
    pub until: Option<NaiveDate>,
    pub prs: bool,
    pub output: Option<PathBuf>,
}

pub fn run(ctx: &Context, args: ReportArgs) -> anyhow::Result<()> {
    let period = match args.since {
        Some(since) => Period {
            since,
            until: args.until,
        },
        None => {
            let days = args.days.unwrap_or(DEFAULT_DAYS);
            Period {
                until: args.until,
                ..Period::last_days(i64::from(days), chrono::Local::now().date_naive())?
            }
        }
    };

    let runner = SystemRunner::new(&ctx.root);
    let report = status_report::collect(&runner, &ctx.repository_name(), period, args.prs)
        .context("failed to build status report")?;

    let document = if ctx.json {
        let mut json = serde_json::to_string_pretty(&report)?;
        json.push('\n');
        json
    } else {
        report.to_markdown(ctx.config.top_n)
    };

    match args.output {
        Some(path) => {
            atomic_write(&path, document.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            if ctx.json {
                print_json(&serde_json::json!({
                    "output": path.display().to_string(),
                    "summary": report.summary_line(),
                }))?;
            } else {
                println!("Wrote {}: {}", path.display(), report.summary_line());
            }
        }
        None => print!("{document}"),
    }

    if !ctx.json {
        print_skipped(&report.skipped, ctx.verbose);
    }
    Ok(())
}
