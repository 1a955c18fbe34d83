//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands, ConfigCommands};
use clap::Parser;
use dpi_probe::InspectionMode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration, then let flags and env vars override it
    let config_path = Config::resolve_path(cli.config.as_deref())?;
    let mut config = match &cli.command {
        // `config path` and `config init` never read the file
        Commands::Config(args) if !matches!(args.command, ConfigCommands::Show) => Config::default(),
        _ => Config::load(Some(&config_path))?,
    };
    apply_overrides(&mut config, &cli);
    if !matches!(cli.command, Commands::Config(_)) {
        config.validate()?;
    }
    debug!(path = %config_path.display(), ?config, "configuration loaded");

    let output_format = cli
        .output
        .or(config.output_format)
        .unwrap_or(OutputFormat::Pretty);

    let ctx = commands::Context {
        output_format,
        config_path,
        config,
    };

    match cli.command {
        Commands::Check(args) => commands::check::execute(ctx, args).await,
        Commands::Batch(args) => commands::batch::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args).await,
    }
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(ms) = cli.dns_timeout {
        config.probe.dns_timeout_ms = ms;
    }
    if let Some(ms) = cli.http_timeout {
        config.probe.http_timeout_ms = ms;
    }
    if let Some(ms) = cli.blackhole_timeout {
        config.probe.blackhole_timeout_ms = ms;
    }
    if cli.opaque {
        config.probe.inspection = InspectionMode::Opaque;
    }
}

/// Logs go to stderr so they never mix with JSON output.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
