//! # dpi-cli
//!
//! Command-line front end for the dpi-probe engine.
//!
//! ## Features
//!
//! - **Single checks**: `dpiprobe check <target>` with per-layer details
//! - **Batches**: paced groups with a progress bar and Ctrl-C cancellation
//! - **Config file**: providers, timeouts and pacing in `config.toml`
//! - **Output formats**: Pretty (colored) and JSON

pub mod cli;
pub mod config;
pub mod output;

pub use cli::run;
