//! Censorship probe engine.
//!
//! Checks whether a domain or IP is reachable from the current network and,
//! if not, where it is being blocked: DNS (including spoofed answers), IP
//! or SNI filtering, TLS blackholing, or certificate substitution.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use dpi_probe::{NetworkProber, ProbeConfig};
//!
//! #[tokio::main]
//! async fn main() -> dpi_probe::Result<()> {
//!     let prober = NetworkProber::new(ProbeConfig::default())?;
//!
//!     let run = prober.probe(&dpi_probe::normalize("example.com")).await;
//!     println!("{}: {} ({})", run.display_name(), run.verdict, run.verdict.reason.description());
//!     println!("TLS: {}", run.tls.tls_status());
//!
//!     Ok(())
//! }
//! ```
//!
//! # Batches
//!
//! ```rust,no_run
//! use dpi_probe::engine::{BatchConfig, BatchEvent, Orchestrator};
//! use dpi_probe::{NetworkProber, ProbeConfig, ProbeTarget};
//! use tokio_stream::StreamExt;
//!
//! # async fn example() -> dpi_probe::Result<()> {
//! let prober = NetworkProber::new(ProbeConfig::default())?;
//! let orchestrator = Orchestrator::new(prober, BatchConfig::default());
//!
//! let targets = vec![
//!     ProbeTarget::new("1", "example.com"),
//!     ProbeTarget::new("2", "192.0.2.1"),
//! ];
//! let (mut events, summary) = orchestrator.stream_batch(targets);
//! while let Some(event) = events.next().await {
//!     if let BatchEvent::Completed { id, run } = event {
//!         println!("{id}: {}", run.verdict);
//!     }
//! }
//! println!("{:?}", summary.await);
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! - `default` - rustls and the batch engine
//! - `rustls` - Use rustls for TLS (recommended)
//! - `native-tls` - Use system native TLS
//! - `engine` - Batch orchestration ([`engine::Orchestrator`])

// Re-export core types
pub use dpi_core::*;

// Re-export probers
pub use dpi_client::{
    DnsProber, DohClient, DohClientBuilder, DohProvider, InspectionMode, NetworkProber,
    ProbeConfig, TransportProber,
};

// Re-export orchestration if enabled
#[cfg(feature = "engine")]
pub use dpi_engine as engine;

// Re-export runtime for convenience
pub use serde;
pub use serde_json;
pub use tokio;
