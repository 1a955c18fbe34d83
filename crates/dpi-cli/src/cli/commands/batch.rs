//! `dpiprobe batch` - Probe many targets in paced groups.

use anyhow::{Context as _, Result};
use colored::Colorize;
use dpi_probe::engine::{BatchEvent, BatchSummary};
use dpi_probe::{Level, ProbeTarget};
use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use super::Context;
use crate::cli::args::BatchArgs;
use crate::output::{self, OutputFormat};

/// Verdict counts by level
#[derive(Debug, Default)]
struct Tally {
    clear: usize,
    warning: usize,
    blocked: usize,
    failed: usize,
}

impl Tally {
    fn record(&mut self, level: Level) {
        match level {
            Level::Clear => self.clear += 1,
            Level::Warning => self.warning += 1,
            Level::Blocked => self.blocked += 1,
        }
    }
}

pub async fn execute(ctx: Context, args: BatchArgs) -> Result<()> {
    let mut addresses = args.targets;
    if let Some(path) = &args.file {
        addresses.extend(read_targets(path)?);
    }
    if addresses.is_empty() {
        anyhow::bail!("No targets given.\n\nPass them as arguments or with --file <PATH>.");
    }

    let mut batch = ctx.config.batch;
    if let Some(concurrency) = args.concurrency {
        batch = batch.concurrency(concurrency);
    }
    if let Some(delay) = args.delay {
        batch = batch.inter_batch_delay(Duration::from_millis(delay));
    }

    let targets: Vec<ProbeTarget> = addresses
        .iter()
        .enumerate()
        .map(|(index, address)| ProbeTarget::new((index + 1).to_string(), address.as_str()))
        .collect();

    let orchestrator = ctx.orchestrator(batch)?;
    let (mut events, handle) = orchestrator.stream_batch(targets);

    let progress = match ctx.output_format {
        OutputFormat::Pretty => create_progressbar(addresses.len() as u64)?,
        OutputFormat::Json => ProgressBar::hidden(),
    };

    let mut tally = Tally::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(event) => handle_event(&ctx, &progress, &mut tally, event)?,
                None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                orchestrator.cancel_all();
                progress.println(format!("{} finishing the current group", "Interrupted:".yellow().bold()));
            }
        }
    }
    progress.finish_and_clear();

    let summary = handle.await.context("batch task failed")?;
    print_summary(&ctx, &summary, &tally)?;

    Ok(())
}

fn handle_event(ctx: &Context, progress: &ProgressBar, tally: &mut Tally, event: BatchEvent) -> Result<()> {
    match event {
        BatchEvent::Completed { id, run } => {
            tally.record(run.verdict.level);
            match ctx.output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "id": id, "run": run }));
                }
                OutputFormat::Pretty => progress.println(output::result_line(&id, &run)),
            }
        }
        BatchEvent::Failed { id, error } => {
            tally.failed += 1;
            match ctx.output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "id": id, "error": error.to_string() }));
                }
                OutputFormat::Pretty => {
                    progress.println(format!("[{id}] {} {error}", "Error:".red().bold()));
                }
            }
        }
        BatchEvent::Progress { completed, total } => {
            progress.set_length(total as u64);
            progress.set_position(completed as u64);
        }
    }
    Ok(())
}

fn print_summary(ctx: &Context, summary: &BatchSummary, tally: &Tally) -> Result<()> {
    if ctx.output_format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "summary": summary }));
        return Ok(());
    }

    println!();
    match summary {
        BatchSummary::NothingToRun { skipped } => {
            println!("{} nothing to run ({skipped} already in progress)", "Batch:".bold());
        }
        BatchSummary::Completed { total, groups, .. } => {
            println!("{} probed {total} targets in {groups} groups", "Batch:".bold());
        }
        BatchSummary::Cancelled { completed, total } => {
            println!("{} cancelled after {completed} of {total} targets", "Batch:".bold().yellow());
        }
    }
    println!(
        "  {} {}  {} {}  {} {}  {} {}",
        "clear:".green(),
        tally.clear,
        "warning:".yellow(),
        tally.warning,
        "blocked:".red(),
        tally.blocked,
        "errors:".dimmed(),
        tally.failed
    );

    Ok(())
}

fn create_progressbar(len: u64) -> Result<ProgressBar> {
    let progress_bar = ProgressBar::new(len);
    progress_bar.enable_steady_tick(Duration::from_millis(100));
    progress_bar.set_style(
        ProgressStyle::with_template("{spinner:.blue} {elapsed_precise} {bar:36.cyan/blue} {pos:>4}/{len:4} {msg}")?
            .progress_chars("■■□"),
    );
    Ok(progress_bar)
}

/// Targets from a file, one per line. Blank lines and `#` comments are
/// ignored.
fn read_targets(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read targets from {}", path.display()))?;
    Ok(parse_targets(&content))
}

fn parse_targets(content: &str) -> Vec<String> {
    content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_file_skips_comments_and_blanks() {
        let content = "# blocklist\nexample.com\n\n  192.0.2.1  # lab host\n#2001:db8::1\n";
        assert_eq!(parse_targets(content), vec!["example.com", "192.0.2.1"]);
    }

    #[test]
    fn tally_counts_levels() {
        let mut tally = Tally::default();
        tally.record(Level::Blocked);
        tally.record(Level::Blocked);
        tally.record(Level::Clear);
        assert_eq!((tally.clear, tally.warning, tally.blocked), (1, 0, 2));
    }
}
