use super::{Context, StripeArgs};
use crate::output::{print_capped, print_json};
use anyhow::Context as _;
use repokit_core::webhook::{self, WebhookCheck};
use std::path::PathBuf;

pub fn run(
    ctx: &Context,
    paths: &[PathBuf],
    remote: bool,
    stripe: &StripeArgs,
) -> anyhow::Result<()> {
    let targets: Vec<PathBuf> = if paths.is_empty() {
        vec![ctx.root.clone()]
    } else {
        paths.iter().map(|p| ctx.resolve(p)).collect()
    };
    for target in &targets {
        if !target.exists() {
            anyhow::bail!("{} does not exist", target.display());
        }
    }

    let scan = webhook::scan(&ctx.root, &targets, &ctx.config.webhook)
        .context("failed to scan source files")?;

    let endpoints = if remote {
        let client = stripe.client(&ctx.config)?;
        Some(
            client
                .list_webhook_endpoints()
                .context("failed to list webhook endpoints")?,
        )
    } else {
        None
    };

    let check = webhook::aggregate(scan, &ctx.config.webhook, endpoints);

    if ctx.json {
        print_json(&check)?;
    } else {
        print_text(&check, ctx.config.top_n);
    }

    if check.failed() {
        anyhow::bail!(
            "{} webhook handler file(s) found but none verifies the signature",
            check.handler_files.len()
        );
    }
    Ok(())
}

fn print_text(check: &WebhookCheck, top_n: usize) {
    println!(
        "Scanned {} files, {} webhook handler file(s)",
        check.files_scanned,
        check.handler_files.len()
    );
    if check.handler_files.is_empty() {
        println!("No webhook handlers found.");
    } else {
        let verified = if check.has_signature_verification {
            "yes"
        } else {
            "NO"
        };
        println!("Signature verification: {verified}");
        println!();
        println!("Handler files:");
        print_capped(&check.handler_files, top_n, "  ", |f| {
            let mark = if f.has_signature_verification {
                "verified"
            } else {
                "unverified"
            };
            format!("{}  [{mark}]  {} event(s)", f.path, f.events.len())
        });
    }

    if !check.handled_events.is_empty() {
        println!();
        println!("Handled events ({}):", check.handled_events.len());
        print_capped(&check.handled_events, top_n, "  ", |e| e.clone());
    }

    println!();
    if check.unhandled_events.is_empty() {
        println!("All {} critical events handled.", check.critical_events.len());
    } else {
        println!(
            "Unhandled critical events ({} of {}):",
            check.unhandled_events.len(),
            check.critical_events.len()
        );
        print_capped(&check.unhandled_events, top_n, "  - ", |e| e.clone());
    }

    if let Some(endpoints) = &check.endpoints {
        println!();
        println!("Stripe endpoints ({}):", endpoints.len());
        print_capped(endpoints, top_n, "  ", |ep| {
            if ep.missing_events.is_empty() {
                format!("{}  {}  {}  all critical events enabled", ep.id, ep.url, ep.status)
            } else {
                format!(
                    "{}  {}  {}  missing: {}",
                    ep.id,
                    ep.url,
                    ep.status,
                    ep.missing_events.join(", ")
                )
            }
        });
    }

    if !check.unreadable_files.is_empty() {
        println!();
        println!("{} file(s) could not be read", check.unreadable_files.len());
    }
}
