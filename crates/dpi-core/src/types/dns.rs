use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

/// DNS record type requested from providers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address record
    A,
    /// Reverse pointer record
    Ptr,
}

impl RecordType {
    /// Query parameter value for DoH JSON APIs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Ptr => "PTR",
        }
    }

    /// Numeric RR type carried in JSON answers
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::A => 1,
            Self::Ptr => 12,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a provider did not resolve a name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DnsFailure {
    /// The provider answered but returned no matching records
    NoRecords,
    /// The provider returned a non-success HTTP status
    Status(u16),
    /// The query exceeded its deadline
    Timeout,
    /// The request could not be sent or completed
    Request(String),
    /// The response body was not valid DoH JSON
    Decode(String),
}

impl fmt::Display for DnsFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRecords => f.write_str("no records"),
            Self::Status(code) => write!(f, "HTTP status {code}"),
            Self::Timeout => f.write_str("timed out"),
            Self::Request(msg) => write!(f, "request failed: {msg}"),
            Self::Decode(msg) => write!(f, "bad response: {msg}"),
        }
    }
}

/// Outcome of a forward lookup against one provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsProviderResult {
    /// Provider name (e.g. `google`)
    pub provider: String,

    /// Addresses returned by this provider
    #[serde(default)]
    pub addresses: BTreeSet<IpAddr>,

    /// True if at least one address came back
    pub resolved: bool,

    /// Failure reason when not resolved
    #[serde(default)]
    pub error: Option<DnsFailure>,

    /// Time spent on this provider
    pub latency_ms: u64,
}

impl DnsProviderResult {
    /// Successful lookup
    #[must_use]
    pub fn resolved(provider: impl Into<String>, addresses: BTreeSet<IpAddr>, latency_ms: u64) -> Self {
        if addresses.is_empty() {
            return Self::failed(provider, DnsFailure::NoRecords, latency_ms);
        }
        Self {
            provider: provider.into(),
            addresses,
            resolved: true,
            error: None,
            latency_ms,
        }
    }

    /// Failed lookup
    #[must_use]
    pub fn failed(provider: impl Into<String>, error: DnsFailure, latency_ms: u64) -> Self {
        Self {
            provider: provider.into(),
            addresses: BTreeSet::new(),
            resolved: false,
            error: Some(error),
            latency_ms,
        }
    }
}

/// Reverse lookup outcome for one address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtrRecord {
    /// Address that was reverse-resolved
    pub address: IpAddr,

    /// The `in-addr.arpa` / `ip6.arpa` name that was queried
    pub query_name: String,

    /// Host name from the PTR answer, trailing dot stripped
    #[serde(default)]
    pub reverse_domain: Option<String>,

    /// Provider that answered
    #[serde(default)]
    pub provider: Option<String>,

    /// Time spent across all providers tried
    pub latency_ms: u64,
}

impl PtrRecord {
    /// Returns true if a PTR answer was found
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.reverse_domain.is_some()
    }
}

/// Aggregate DNS probe result for one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsProbeResult {
    /// `A` for domain targets, `PTR` for IP literals
    pub record_type: RecordType,

    /// True if any provider resolved the name (or a PTR answer was found)
    pub resolved: bool,

    /// Union of resolved addresses
    #[serde(default)]
    pub addresses: BTreeSet<IpAddr>,

    /// Per-provider forward lookup outcomes
    #[serde(default)]
    pub per_provider: BTreeMap<String, DnsProviderResult>,

    /// Reverse lookup per resolved address
    #[serde(default)]
    pub ptr_by_address: BTreeMap<IpAddr, PtrRecord>,

    /// Providers disagree in a way that suggests a forged answer
    pub spoofed: bool,

    /// Total time for the DNS probe
    pub latency_ms: u64,
}

impl DnsProbeResult {
    /// Result for an IP literal: a single reverse lookup
    #[must_use]
    pub fn from_reverse(ptr: PtrRecord) -> Self {
        let latency_ms = ptr.latency_ms;
        let address = ptr.address;
        Self {
            record_type: RecordType::Ptr,
            resolved: ptr.is_resolved(),
            addresses: BTreeSet::from([address]),
            per_provider: BTreeMap::new(),
            ptr_by_address: BTreeMap::from([(address, ptr)]),
            spoofed: false,
            latency_ms,
        }
    }

    /// Get a provider's forward lookup result
    #[must_use]
    pub fn provider(&self, name: &str) -> Option<&DnsProviderResult> {
        self.per_provider.get(name)
    }

    /// PTR host name for an address, if any
    #[must_use]
    pub fn reverse_domain_of(&self, address: &IpAddr) -> Option<&str> {
        self.ptr_by_address
            .get(address)
            .and_then(|ptr| ptr.reverse_domain.as_deref())
    }

    /// First PTR host name found, used to label IP targets
    #[must_use]
    pub fn reverse_domain(&self) -> Option<&str> {
        self.ptr_by_address
            .values()
            .find_map(|ptr| ptr.reverse_domain.as_deref())
    }

    /// Number of providers that resolved the name
    #[must_use]
    pub fn resolved_provider_count(&self) -> usize {
        self.per_provider.values().filter(|p| p.resolved).count()
    }
}
