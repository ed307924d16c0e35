use super::Context;
use crate::output::{print_json, print_skipped, print_table};
use anyhow::Context as _;
use repokit_core::xcode::{self, TargetSource};
use std::path::Path;

pub fn run(ctx: &Context, project: Option<&Path>) -> anyhow::Result<()> {
    let result = xcode::collect(&ctx.root, project).context("failed to read Xcode targets")?;

    if ctx.json {
        return print_json(&result);
    }

    println!("{}: {} native target(s)", result.project, result.count);
    if result.source == TargetSource::Fallback {
        println!("(recovered with the fallback pattern; product types unavailable)");
    }
    println!();

    let rows = result
        .targets
        .iter()
        .map(|t| {
            vec![
                t.name.clone(),
                t.product_type.clone().unwrap_or_else(|| "-".to_string()),
                t.id.clone(),
            ]
        })
        .collect();
    print_table(&["TARGET", "PRODUCT TYPE", "ID"], rows);
    print_skipped(&result.skipped, ctx.verbose);
    Ok(())
}
