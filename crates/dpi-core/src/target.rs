//! Target classification: turn user input into a normalized, typed address.
//!
//! IP literals are probed over plain HTTP, anything else gets `https://`
//! prepended when no scheme is given. Classification never fails; callers
//! check [`is_valid`] before probing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use url::Url;

/// Scheme used for domain targets without an explicit scheme
const SECURE_SCHEME: &str = "https";

/// Scheme used for bare IP literals
const PLAIN_SCHEME: &str = "http";

/// What kind of address a target is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    /// Host name, resolved through DNS
    Domain,
    /// IPv4 literal
    Ipv4,
    /// IPv6 literal
    Ipv6,
}

impl TargetKind {
    /// Returns true for IP literals (reverse DNS applies, forward DNS does not)
    #[must_use]
    pub const fn is_ip(self) -> bool {
        matches!(self, Self::Ipv4 | Self::Ipv6)
    }

    /// Short lowercase label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Ipv4 => "ipv4",
            Self::Ipv6 => "ipv6",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified probe target
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    address: String,
    kind: TargetKind,
}

impl Target {
    /// Classify a raw input string. See [`normalize`].
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        normalize(raw)
    }

    /// Normalized URL form of the target
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Kind of address
    #[must_use]
    pub const fn kind(&self) -> TargetKind {
        self.kind
    }

    /// Host portion without scheme, port or IPv6 brackets
    #[must_use]
    pub fn host(&self) -> String {
        host_of(&self.address)
    }

    /// The IP literal, if the target is one
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        self.host().parse().ok()
    }

    /// Returns true if the target is reached over TLS
    #[must_use]
    pub fn is_secure(&self) -> bool {
        Url::parse(&self.address).map_or_else(
            |_| self.address.starts_with("https://"),
            |url| url.scheme() == SECURE_SCHEME,
        )
    }

    /// Returns true if the normalized address is usable. See [`is_valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid(&self.address)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Normalize a raw input string into a [`Target`].
///
/// - `2001:db8::1` or `[2001:db8::1]` becomes `http://[2001:db8::1]` (ipv6)
/// - `192.0.2.1` becomes `http://192.0.2.1` (ipv4)
/// - `example.com` becomes `https://example.com` (domain)
/// - input that already carries a scheme is kept as is, its kind taken from the host
#[must_use]
pub fn normalize(raw: &str) -> Target {
    let trimmed = raw.trim();

    if let Some(v6) = parse_ipv6_literal(trimmed) {
        return Target {
            address: format!("{PLAIN_SCHEME}://[{v6}]"),
            kind: TargetKind::Ipv6,
        };
    }

    if let Ok(v4) = trimmed.parse::<Ipv4Addr>() {
        return Target {
            address: format!("{PLAIN_SCHEME}://{v4}"),
            kind: TargetKind::Ipv4,
        };
    }

    let address = if trimmed.is_empty() || has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("{SECURE_SCHEME}://{trimmed}")
    };
    let kind = target_type(&address);

    Target { address, kind }
}

/// Returns true if a normalized address can be probed.
///
/// Accepts anything that parses as a URL with a host, plus bare IPv4/IPv6
/// literals behind an optional scheme.
#[must_use]
pub fn is_valid(address: &str) -> bool {
    let stripped = strip_scheme(address);
    if parse_ipv6_literal(stripped).is_some() {
        return true;
    }

    if Url::parse(address).is_ok_and(|url| url.host().is_some()) {
        return true;
    }

    stripped.parse::<IpAddr>().is_ok()
}

/// Re-derive the target kind from the host portion of an address
#[must_use]
pub fn target_type(address: &str) -> TargetKind {
    match host_of(address).parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => TargetKind::Ipv4,
        Ok(IpAddr::V6(_)) => TargetKind::Ipv6,
        Err(_) => TargetKind::Domain,
    }
}

/// Extract the host of an address, falling back to string slicing when the
/// address is not a well-formed URL.
fn host_of(address: &str) -> String {
    let host = Url::parse(address)
        .ok()
        .and_then(|url| url.host_str().map(str::to_owned))
        .unwrap_or_else(|| {
            strip_scheme(address)
                .split('/')
                .next()
                .unwrap_or_default()
                .to_owned()
        });

    host.trim_start_matches('[').trim_end_matches(']').to_owned()
}

/// Parse a bare or bracketed IPv6 literal
fn parse_ipv6_literal(s: &str) -> Option<Ipv6Addr> {
    let inner = s
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(s);
    inner.parse().ok()
}

/// Returns true if the string starts with `<scheme>://`
fn has_scheme(s: &str) -> bool {
    s.split_once("://").is_some_and(|(scheme, _)| {
        let mut chars = scheme.chars();
        chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn strip_scheme(address: &str) -> &str {
    if has_scheme(address) {
        address.split_once("://").map_or(address, |(_, rest)| rest)
    } else {
        address
    }
}
