use super::Context;
use crate::output::print_json;
use clap::Subcommand;
use repokit_core::config::WarnLevel;
use repokit_core::paths;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration (file values merged over defaults)
    Show,

    /// Validate the config for common mistakes
    Validate,
}

pub fn run(ctx: &Context, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
    }
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(ctx: &Context) -> anyhow::Result<()> {
    if ctx.json {
        return print_json(&ctx.config);
    }
    let path = paths::config_path(&ctx.root);
    if path.exists() {
        println!("# {}", path.display());
    } else {
        println!("# defaults ({} not found)", paths::CONFIG_FILE);
    }
    print!("{}", serde_yaml::to_string(&ctx.config)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

fn validate(ctx: &Context) -> anyhow::Result<()> {
    let warnings = ctx.config.validate();

    if ctx.json {
        let value = serde_json::json!({
            "warnings": warnings,
        });
        print_json(&value)?;
    } else if warnings.is_empty() {
        println!("Config is valid. No warnings.");
    } else {
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("[{prefix}] {}", w.message);
        }
    }

    let has_errors = warnings.iter().any(|w| w.level == WarnLevel::Error);
    if has_errors {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
