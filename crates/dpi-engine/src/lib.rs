//! Probe orchestration for dpi-probe.
//!
//! [`Orchestrator`] wraps a [`TargetProber`] and adds what a caller
//! managing many targets needs: one run per id at a time, batches paced in
//! groups with progress events, and cancellation.

mod config;
mod orchestrator;
mod prober;

pub use config::BatchConfig;
pub use orchestrator::{BatchEvent, BatchSummary, Orchestrator};
pub use prober::TargetProber;
