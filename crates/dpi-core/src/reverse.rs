//! Reverse DNS query names.
//!
//! IPv4: reverse the octets and query under `in-addr.arpa`.
//! Example: `192.0.2.1` queries `1.2.0.192.in-addr.arpa`
//!
//! IPv6: expand to 32 hex nibbles, reverse them and query under `ip6.arpa`.
//! Example: `2001:db8::1` queries `1.0.0.0. ... .8.b.d.0.1.0.0.2.ip6.arpa`

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Reverse zone for IPv4 addresses.
pub const IPV4_REVERSE_ZONE: &str = "in-addr.arpa";

/// Reverse zone for IPv6 addresses.
pub const IPV6_REVERSE_ZONE: &str = "ip6.arpa";

/// Reverse an IPv4 address.
///
/// Converts `1.2.3.4` into `4.3.2.1` (without zone suffix).
#[must_use]
pub fn reverse_ipv4(ip: &Ipv4Addr) -> String {
    let octets = ip.octets();
    format!("{}.{}.{}.{}", octets[3], octets[2], octets[1], octets[0])
}

/// Fully expanded IPv6 form: eight groups of four lowercase hex digits.
///
/// `2001:db8::1` -> `2001:0db8:0000:0000:0000:0000:0000:0001`
#[must_use]
pub fn expand_ipv6(ip: &Ipv6Addr) -> String {
    ip.segments()
        .iter()
        .map(|group| format!("{group:04x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Reverse the 32 nibbles of an IPv6 address, dot-joined (without zone suffix).
#[must_use]
pub fn reverse_ipv6(ip: &Ipv6Addr) -> String {
    let nibbles: String = ip
        .segments()
        .iter()
        .map(|group| format!("{group:04x}"))
        .collect();

    nibbles
        .chars()
        .rev()
        .map(String::from)
        .collect::<Vec<_>>()
        .join(".")
}

/// Build the PTR query name for an address.
#[must_use]
pub fn ptr_query_name(ip: &IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => format!("{}.{IPV4_REVERSE_ZONE}", reverse_ipv4(v4)),
        IpAddr::V6(v6) => format!("{}.{IPV6_REVERSE_ZONE}", reverse_ipv6(v6)),
    }
}
