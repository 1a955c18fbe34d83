//! Network probers for dpi-probe.
//!
//! [`DohClient`] talks to JSON DNS-over-HTTPS resolvers. [`DnsProber`] and
//! [`TransportProber`] build on it and on `reqwest` to test each layer, and
//! [`NetworkProber`] runs them together to produce a classified
//! [`ProbeRun`](dpi_core::ProbeRun).

mod client;
mod config;
pub mod probe;

pub use client::{DohAnswer, DohClient, DohClientBuilder, DohResponse};
pub use config::*;
pub use dpi_core::{ProbeError, Result};
pub use probe::{DnsProber, NetworkProber, TransportProber};
