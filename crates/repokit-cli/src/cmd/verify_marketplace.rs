use super::Context;
use crate::output::print_json;
use anyhow::Context as _;
use repokit_core::marketplace::{self, Finding, MarketplaceReport, MarketplaceRules};
use repokit_core::paths;
use std::path::Path;

pub fn run(ctx: &Context, path: Option<&Path>, fix: bool) -> anyhow::Result<()> {
    let manifest = match path {
        Some(p) => ctx.resolve(p),
        None => paths::marketplace_path(&ctx.root),
    };

    let report = marketplace::verify(&manifest, &MarketplaceRules::default(), fix)
        .with_context(|| format!("failed to verify {}", manifest.display()))?;

    if ctx.json {
        print_json(&report)?;
    } else {
        print_text(&report);
    }

    if !report.passed() {
        anyhow::bail!(
            "marketplace verification failed with {} error(s)",
            report.errors.len()
        );
    }
    Ok(())
}

fn finding_line(f: &Finding) -> String {
    let path = f.path.as_deref().map(|p| format!(" {p}")).unwrap_or_default();
    let fix = f
        .fix
        .as_deref()
        .map(|x| format!("\n  Fix: {x}"))
        .unwrap_or_default();
    format!("- [{}]{path} - {}{fix}", f.rule, f.message)
}

fn print_text(report: &MarketplaceReport) {
    let status = if report.passed() { "PASS" } else { "FAIL" };
    println!("## Marketplace Validation Report");
    println!();
    println!("Status: {status}");
    println!();

    if !report.errors.is_empty() {
        println!("### Errors ({})", report.errors.len());
        for e in &report.errors {
            println!("{}", finding_line(e));
        }
        println!();
    }

    if !report.warnings.is_empty() {
        println!("### Warnings ({})", report.warnings.len());
        for w in &report.warnings {
            println!("{}", finding_line(w));
        }
        println!();
    }

    if !report.fixes.is_empty() {
        println!("### Fixes applied");
        for f in &report.fixes {
            println!("- {f}");
        }
        println!();
    }

    let s = &report.stats;
    println!("### Summary");
    println!("- Plugins checked: {}", s.plugins_checked);
    println!("- Skills checked: {}", s.skills_checked);
    println!("- Skills missing: {}", s.skills_missing);
    println!("- Orphans found: {}", s.orphans_found);
    println!("- Errors: {}", report.errors.len());
    println!("- Warnings: {}", report.warnings.len());
}
