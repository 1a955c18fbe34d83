//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Check whether sites are reachable from this network, and if not, how
/// they are being blocked.
///
/// Each target is probed over DNS (two DoH providers, with reverse lookups
/// to spot spoofed answers), plain HTTP and TLS, and given a verdict.
#[derive(Parser, Debug)]
#[command(name = "dpiprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Log probe details to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "DPIPROBE_CONFIG", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Deadline for each DoH query, in milliseconds
    #[arg(long, global = true, env = "DPIPROBE_DNS_TIMEOUT", value_name = "MS")]
    pub dns_timeout: Option<u64>,

    /// Deadline for the HTTP probe, in milliseconds
    #[arg(long, global = true, env = "DPIPROBE_HTTP_TIMEOUT", value_name = "MS")]
    pub http_timeout: Option<u64>,

    /// A TLS attempt pending longer than this is reported as blackholed
    #[arg(long, global = true, env = "DPIPROBE_BLACKHOLE_TIMEOUT", value_name = "MS")]
    pub blackhole_timeout: Option<u64>,

    /// Only record whether requests complete; skip status codes and
    /// certificate checks
    #[arg(long, global = true)]
    pub opaque: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe a single domain or IP address
    Check(CheckArgs),

    /// Probe several targets in paced groups
    Batch(BatchArgs),

    /// Show or create the configuration file
    Config(ConfigArgs),
}

// ============================================================================
// Check command
// ============================================================================

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Domain, URL or IP address (e.g., example.com, 192.0.2.1, 2001:db8::1)
    pub target: String,
}

// ============================================================================
// Batch command
// ============================================================================

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Targets to probe
    pub targets: Vec<String>,

    /// Read additional targets from a file, one per line (`#` starts a comment)
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Targets probed at the same time
    #[arg(short, long, env = "DPIPROBE_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Pause between groups, in milliseconds
    #[arg(long, value_name = "MS")]
    pub delay: Option<u64>,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Print the config file path
    Path,

    /// Write a config file with default settings
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
