//! `dpiprobe check` - Probe a single target.

use anyhow::Result;
use dpi_probe::ProbeTarget;

use super::Context;
use crate::cli::args::CheckArgs;
use crate::output::{self, OutputFormat};

pub async fn execute(ctx: Context, args: CheckArgs) -> Result<()> {
    let orchestrator = ctx.orchestrator(ctx.config.batch)?;

    let run = orchestrator
        .run_one(&ProbeTarget::new("check", args.target.as_str()))
        .await?;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&run)?);
        }
        OutputFormat::Pretty => {
            output::print_run(&run);
        }
    }

    Ok(())
}
