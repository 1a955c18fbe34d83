//! Verdict classification.
//!
//! Probe signals are matched against [`RULES`] top-down and the first rule
//! that applies decides. Active tampering signals sit above generic
//! unreachability so they are never masked by it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::target::TargetKind;
use crate::types::{DnsProbeResult, TransportProbeResult};

/// Severity of a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Level {
    /// No interference observed
    Clear = 0,
    /// Unreachable, cause uncertain
    Warning = 1,
    /// Interference detected
    Blocked = 2,
}

impl From<Level> for u8 {
    fn from(level: Level) -> Self {
        level as Self
    }
}

impl TryFrom<u8> for Level {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Clear),
            1 => Ok(Self::Warning),
            2 => Ok(Self::Blocked),
            other => Err(format!("unknown verdict level {other}")),
        }
    }
}

/// Why a verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Providers returned answers that do not belong together
    DnsSpoofing,
    /// The TLS attempt hung until the long timeout
    Blackhole,
    /// Name resolves but neither HTTP nor TLS get through
    IpSniBlock,
    /// TLS works but HTTP inside it does not
    HttpTlsBlock,
    /// HTTP works but the TLS layer fails
    CertSubstitution,
    /// IPv6 target unreachable over HTTP; not a reliable signal
    Ipv6Unclear,
    /// Name resolves but the host is unreachable
    IpBlock,
    /// Name does not resolve and the host is unreachable
    DnsBlock,
    /// Nothing suspicious
    Clear,
}

impl ReasonCode {
    /// Stable snake_case code
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DnsSpoofing => "dns_spoofing",
            Self::Blackhole => "blackhole",
            Self::IpSniBlock => "ip_sni_block",
            Self::HttpTlsBlock => "http_tls_block",
            Self::CertSubstitution => "cert_substitution",
            Self::Ipv6Unclear => "ipv6_unclear",
            Self::IpBlock => "ip_block",
            Self::DnsBlock => "dns_block",
            Self::Clear => "clear",
        }
    }

    /// One-line English explanation
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::DnsSpoofing => "DNS answers differ between providers (possible DNS spoofing)",
            Self::Blackhole => "connection silently dropped (blackholed)",
            Self::IpSniBlock => "blocked at IP or SNI level",
            Self::HttpTlsBlock => "HTTP blocked inside a working TLS session",
            Self::CertSubstitution => "TLS certificate substituted or invalid",
            Self::Ipv6Unclear => "IPv6 target unreachable, status unclear",
            Self::IpBlock => "host unreachable (possible IP block)",
            Self::DnsBlock => "name does not resolve and host is unreachable",
            Self::Clear => "no interference detected",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ranked classification of one probe run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Verdict {
    /// Severity
    pub level: Level,
    /// Reason code
    pub reason: ReasonCode,
}

impl Verdict {
    /// The verdict when no rule applies
    pub const CLEAR: Self = Self::new(Level::Clear, ReasonCode::Clear);

    /// Create a verdict
    #[must_use]
    pub const fn new(level: Level, reason: ReasonCode) -> Self {
        Self { level, reason }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.reason, u8::from(self.level))
    }
}

/// Signals the classifier looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct VerdictInput {
    pub dns_resolved: bool,
    pub dns_spoofed: bool,
    pub http_connected: bool,
    pub tls_attempted: bool,
    pub tls_succeeded: bool,
    pub tls_blackholed: bool,
    pub target_kind: TargetKind,
}

impl VerdictInput {
    /// Collect signals from sub-probe results
    #[must_use]
    pub const fn from_results(
        target_kind: TargetKind,
        dns: &DnsProbeResult,
        http: &TransportProbeResult,
        tls: &TransportProbeResult,
    ) -> Self {
        Self {
            dns_resolved: dns.resolved,
            dns_spoofed: dns.spoofed,
            http_connected: http.succeeded,
            tls_attempted: tls.attempted,
            tls_succeeded: tls.succeeded,
            tls_blackholed: tls.blackholed,
            target_kind,
        }
    }
}

/// One entry of the rule table
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    /// Predicate over the probe signals
    pub applies: fn(&VerdictInput) -> bool,
    /// Verdict when the predicate holds
    pub verdict: Verdict,
}

const fn rule(applies: fn(&VerdictInput) -> bool, level: Level, reason: ReasonCode) -> Rule {
    Rule {
        applies,
        verdict: Verdict::new(level, reason),
    }
}

const fn spoofed(i: &VerdictInput) -> bool {
    i.dns_spoofed
}

const fn blackholed(i: &VerdictInput) -> bool {
    i.tls_blackholed
}

const fn ip_sni_block(i: &VerdictInput) -> bool {
    i.dns_resolved && !i.http_connected && i.tls_attempted && !i.tls_succeeded
}

const fn http_tls_block(i: &VerdictInput) -> bool {
    i.dns_resolved && !i.http_connected && i.tls_succeeded
}

const fn cert_substitution(i: &VerdictInput) -> bool {
    i.dns_resolved && i.http_connected && i.tls_attempted && !i.tls_succeeded
}

const fn ipv6_unclear(i: &VerdictInput) -> bool {
    matches!(i.target_kind, TargetKind::Ipv6) && !i.http_connected
}

const fn ip_block(i: &VerdictInput) -> bool {
    i.dns_resolved && !i.http_connected
}

const fn dns_block(i: &VerdictInput) -> bool {
    !i.dns_resolved && !i.http_connected
}

/// Classification rules in priority order. Anything unmatched is [`Verdict::CLEAR`].
pub const RULES: [Rule; 8] = [
    rule(spoofed, Level::Blocked, ReasonCode::DnsSpoofing),
    rule(blackholed, Level::Blocked, ReasonCode::Blackhole),
    rule(ip_sni_block, Level::Blocked, ReasonCode::IpSniBlock),
    rule(http_tls_block, Level::Blocked, ReasonCode::HttpTlsBlock),
    rule(cert_substitution, Level::Blocked, ReasonCode::CertSubstitution),
    rule(ipv6_unclear, Level::Warning, ReasonCode::Ipv6Unclear),
    rule(ip_block, Level::Warning, ReasonCode::IpBlock),
    rule(dns_block, Level::Warning, ReasonCode::DnsBlock),
];

/// Classify probe signals. First matching rule wins.
#[must_use]
pub fn classify(input: &VerdictInput) -> Verdict {
    RULES
        .iter()
        .find(|rule| (rule.applies)(input))
        .map_or(Verdict::CLEAR, |rule| rule.verdict)
}
