//! `dpiprobe config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
        ConfigCommands::Init { force } => init_config(&ctx, force),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Pretty => {
            println!("{}", "Current Configuration:".bold());
            println!("{}", ctx.config_path.display().to_string().dimmed());
            println!();

            println!("  {}", "providers:".bold());
            for provider in &config.probe.providers {
                println!("    {} {}", format!("{}:", provider.name).cyan(), provider.url);
            }
            println!("  {} {} ms", "dns_timeout:".bold(), config.probe.dns_timeout_ms);
            println!("  {} {} ms", "http_timeout:".bold(), config.probe.http_timeout_ms);
            println!("  {} {} ms", "blackhole_timeout:".bold(), config.probe.blackhole_timeout_ms);
            println!("  {} {:?}", "inspection:".bold(), config.probe.inspection);
            println!("  {} {}", "concurrency:".bold(), config.batch.concurrency);
            println!("  {} {} ms", "batch_delay:".bold(), config.batch.inter_batch_delay_ms);
            println!(
                "  {} {}",
                "output_format:".bold(),
                config.output_format.unwrap_or_default()
            );
        }
    }

    Ok(())
}

fn init_config(ctx: &Context, force: bool) -> Result<()> {
    let path = &ctx.config_path;
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists: {}\n\nUse --force to overwrite it.",
            path.display()
        );
    }

    Config::default().save_to(path)?;
    println!("{} wrote {}", "Success:".green().bold(), path.display());

    Ok(())
}
