use super::{Context, StripeArgs};
use crate::output::{print_capped, print_json};
use anyhow::Context as _;
use repokit_core::stripe::{build_catalog, format_price, ProductCatalog, StripePrice};

pub fn run(ctx: &Context, include_inactive: bool, stripe: &StripeArgs) -> anyhow::Result<()> {
    let client = stripe.client(&ctx.config)?;
    let products = client
        .list_products(include_inactive)
        .context("failed to list products")?;
    let prices = client
        .list_prices(include_inactive)
        .context("failed to list prices")?;

    let catalog = build_catalog(products, prices);

    if ctx.json {
        return print_json(&catalog);
    }
    print_text(&catalog, ctx.config.top_n);
    Ok(())
}

fn price_line(price: &StripePrice) -> String {
    let mut line = format!("{}  {}", price.id, format_price(price));
    if let Some(nick) = &price.nickname {
        line.push_str(&format!("  \"{nick}\""));
    }
    if !price.active {
        line.push_str("  (inactive)");
    }
    line
}

fn print_text(catalog: &ProductCatalog, top_n: usize) {
    println!(
        "{} products, {} prices",
        catalog.product_count, catalog.price_count
    );
    if catalog.products.is_empty() {
        println!("No products.");
    }

    print_capped(&catalog.products, top_n, "", |entry| {
        let p = &entry.product;
        let mut out = format!("\n{}  {}", p.id, p.name);
        if !p.active {
            out.push_str("  (inactive)");
        }
        if entry.prices.is_empty() {
            out.push_str("\n    no prices");
        }
        for price in &entry.prices {
            out.push_str("\n    ");
            out.push_str(&price_line(price));
        }
        out
    });

    if !catalog.unmatched_prices.is_empty() {
        println!();
        println!(
            "Prices without a listed product ({}):",
            catalog.unmatched_prices.len()
        );
        print_capped(&catalog.unmatched_prices, top_n, "    ", |price| {
            format!("{}  (product {})", price_line(price), price.product)
        });
    }
}
