use repokit_core::parse::{more_marker, SkippedLine};
use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }
    }

    let header_row: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| format!("{:width$}", h, width = widths[i]))
        .collect();
    println!("{}", header_row.join("  ").trim_end());

    let sep: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep.join("  "));

    for row in &rows {
        let cells: Vec<String> = row
            .iter()
            .enumerate()
            .map(|(i, cell)| {
                let w = widths.get(i).copied().unwrap_or(0);
                format!("{:width$}", cell, width = w)
            })
            .collect();
        println!("{}", cells.join("  ").trim_end());
    }
}

/// Print at most `top_n` items, then the `... and N more` marker.
pub fn print_capped<T>(items: &[T], top_n: usize, indent: &str, render: impl Fn(&T) -> String) {
    for item in items.iter().take(top_n) {
        println!("{indent}{}", render(item));
    }
    if let Some(more) = more_marker(items.len(), top_n) {
        println!("{indent}{more}");
    }
}

/// Report unparseable lines as a count; list them individually when
/// `verbose` is set.
pub fn print_skipped(skipped: &[SkippedLine], verbose: bool) {
    if skipped.is_empty() {
        return;
    }
    let noun = if skipped.len() == 1 { "line" } else { "lines" };
    println!();
    println!("{} {noun} skipped", skipped.len());
    if verbose {
        for s in skipped {
            println!("  line {}: {} ({})", s.line, s.content, s.reason);
        }
    }
}
