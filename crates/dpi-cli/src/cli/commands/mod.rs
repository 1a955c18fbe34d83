//! Command implementations.

pub mod batch;
pub mod check;
pub mod config;

use dpi_probe::engine::{BatchConfig, Orchestrator};
use dpi_probe::NetworkProber;
use std::path::PathBuf;

use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output format
    pub output_format: OutputFormat,

    /// Config file in use
    pub config_path: PathBuf,

    /// Loaded configuration with command-line overrides applied
    pub config: Config,
}

impl Context {
    /// Create an orchestrator over the network prober, with `batch`
    /// overriding the configured pacing.
    pub fn orchestrator(&self, batch: BatchConfig) -> anyhow::Result<Orchestrator> {
        let prober = NetworkProber::new(self.config.probe.clone())?;
        Ok(Orchestrator::new(prober, batch))
    }
}
