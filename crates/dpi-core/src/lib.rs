//! Core types and classification logic for dpi-probe.
//!
//! Everything in this crate is pure: no sockets, no clocks beyond the run
//! timestamp.
//!
//! - **Targets**: [`normalize`] raw input into a typed [`Target`]
//! - **Reverse names**: [`reverse::ptr_query_name`] for `in-addr.arpa` / `ip6.arpa`
//! - **Spoofing**: [`spoofing::detect_spoofing`] from reverse-DNS consensus
//! - **Verdicts**: [`classify`] probe signals with the ordered [`RULES`] table
//! - **Errors**: [`ProbeError`]
//!
//! # Example
//!
//! ```rust
//! use dpi_core::{normalize, TargetKind};
//!
//! let target = normalize("2001:db8::1");
//! assert_eq!(target.kind(), TargetKind::Ipv6);
//! assert_eq!(target.address(), "http://[2001:db8::1]");
//! ```

#![doc(html_root_url = "https://docs.rs/dpi-core/0.3.0")]

mod error;
pub mod reverse;
pub mod spoofing;
pub mod target;
pub mod types;
pub mod verdict;

pub use error::{ProbeError, Result};
pub use target::{is_valid, normalize, target_type, Target, TargetKind};
pub use types::*;
pub use verdict::{classify, Level, ReasonCode, Rule, Verdict, VerdictInput, RULES};
