//! Prober configuration types.

use dpi_core::{ProbeError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Google's JSON DoH endpoint
pub const GOOGLE_DOH_URL: &str = "https://dns.google/resolve";

/// Cloudflare's JSON DoH endpoint
pub const CLOUDFLARE_DOH_URL: &str = "https://cloudflare-dns.com/dns-query";

/// A DNS-over-HTTPS resolver speaking the `application/dns-json` API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DohProvider {
    /// Short name used as the key in results
    pub name: String,
    /// Endpoint URL without query string
    pub url: String,
}

impl DohProvider {
    /// Create a provider
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// `dns.google`
    #[must_use]
    pub fn google() -> Self {
        Self::new("google", GOOGLE_DOH_URL)
    }

    /// `cloudflare-dns.com`
    #[must_use]
    pub fn cloudflare() -> Self {
        Self::new("cloudflare", CLOUDFLARE_DOH_URL)
    }
}

/// How much of an HTTP/TLS response the transport prober looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectionMode {
    /// Record status codes and tell certificate failures from other
    /// handshake failures
    #[default]
    Full,
    /// Only record whether a request completed, as a browser `no-cors`
    /// fetch would
    Opaque,
}

/// Configuration shared by the DNS and transport probers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// DoH providers, queried concurrently for forward lookups and in
    /// order for reverse lookups
    #[serde(default = "default_providers")]
    pub providers: Vec<DohProvider>,

    /// Deadline for a single DoH query
    #[serde(default = "default_dns_timeout_ms")]
    pub dns_timeout_ms: u64,

    /// Deadline for the HTTP availability probe
    #[serde(default = "default_http_timeout_ms")]
    pub http_timeout_ms: u64,

    /// A TLS attempt still pending after this long is considered blackholed
    #[serde(default = "default_blackhole_timeout_ms")]
    pub blackhole_timeout_ms: u64,

    /// Response inspection depth
    #[serde(default)]
    pub inspection: InspectionMode,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            dns_timeout_ms: default_dns_timeout_ms(),
            http_timeout_ms: default_http_timeout_ms(),
            blackhole_timeout_ms: default_blackhole_timeout_ms(),
            inspection: InspectionMode::default(),
            user_agent: default_user_agent(),
        }
    }
}

impl ProbeConfig {
    /// Create a configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the provider list
    #[must_use]
    pub fn providers(mut self, providers: Vec<DohProvider>) -> Self {
        self.providers = providers;
        self
    }

    /// Set the DoH query deadline
    #[must_use]
    pub fn dns_timeout(mut self, timeout: Duration) -> Self {
        self.dns_timeout_ms = millis(timeout);
        self
    }

    /// Set the HTTP probe deadline
    #[must_use]
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout_ms = millis(timeout);
        self
    }

    /// Set the blackhole threshold
    #[must_use]
    pub fn blackhole_timeout(mut self, timeout: Duration) -> Self {
        self.blackhole_timeout_ms = millis(timeout);
        self
    }

    /// Set the inspection mode
    #[must_use]
    pub fn inspection(mut self, mode: InspectionMode) -> Self {
        self.inspection = mode;
        self
    }

    /// DoH query deadline
    #[must_use]
    pub const fn dns_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.dns_timeout_ms)
    }

    /// HTTP probe deadline
    #[must_use]
    pub const fn http_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    /// Blackhole threshold
    #[must_use]
    pub const fn blackhole_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.blackhole_timeout_ms)
    }

    /// Check the configuration before building probers
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(ProbeError::Config("at least one DoH provider is required".into()));
        }
        for provider in &self.providers {
            url::Url::parse(&provider.url).map_err(|e| {
                ProbeError::Config(format!("provider {} has invalid URL {}: {e}", provider.name, provider.url))
            })?;
        }
        if self.dns_timeout_ms == 0 || self.http_timeout_ms == 0 || self.blackhole_timeout_ms == 0 {
            return Err(ProbeError::Config("timeouts must be greater than zero".into()));
        }
        Ok(())
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// Default value functions for serde.

/// Cloudflare first: reverse lookups stop at the first PTR answer.
fn default_providers() -> Vec<DohProvider> {
    vec![DohProvider::cloudflare(), DohProvider::google()]
}

const fn default_dns_timeout_ms() -> u64 {
    5_000
}

const fn default_http_timeout_ms() -> u64 {
    8_000
}

const fn default_blackhole_timeout_ms() -> u64 {
    15_000
}

fn default_user_agent() -> String {
    format!("dpi-probe/{}", env!("CARGO_PKG_VERSION"))
}
