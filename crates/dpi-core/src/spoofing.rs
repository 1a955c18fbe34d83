//! DNS spoofing heuristic based on reverse-DNS consensus.
//!
//! Each provider's answers are reverse-resolved and reduced to base domains
//! (last two labels). Providers that agree on who owns the addresses share
//! base domains; a forged answer usually points somewhere unrelated.
//!
//! Known false positives: CDN-fronted names whose addresses lack clean PTR
//! records, or where each provider is steered to a different CDN.

use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use crate::types::{DnsProviderResult, PtrRecord};

/// Last two dot-separated labels of a host name, lowercased.
///
/// `edge-1.cdn.example.com.` -> `example.com`
#[must_use]
pub fn base_domain(hostname: &str) -> Option<String> {
    let trimmed = hostname.trim().trim_end_matches('.');
    if trimmed.is_empty() {
        return None;
    }

    let labels: Vec<&str> = trimmed.split('.').collect();
    let base = if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        trimmed.to_string()
    };
    Some(base.to_ascii_lowercase())
}

/// Decide whether a forward lookup looks spoofed.
///
/// Returns false whenever the question is undecidable: fewer than two
/// providers, any provider that failed to resolve, or any provider without
/// PTR evidence for its addresses.
#[must_use]
pub fn detect_spoofing(
    per_provider: &BTreeMap<String, DnsProviderResult>,
    ptr_by_address: &BTreeMap<IpAddr, PtrRecord>,
    queried_domain: &str,
) -> bool {
    if per_provider.len() < 2 || per_provider.values().any(|p| !p.resolved) {
        return false;
    }

    let sets: Vec<BTreeSet<String>> = per_provider
        .values()
        .map(|provider| {
            provider
                .addresses
                .iter()
                .filter_map(|addr| ptr_by_address.get(addr))
                .filter_map(|ptr| ptr.reverse_domain.as_deref())
                .filter_map(base_domain)
                .collect()
        })
        .collect();

    spoofed_by_base_domains(&sets, queried_domain)
}

/// Core decision over per-provider base-domain sets.
#[must_use]
pub fn spoofed_by_base_domains(sets: &[BTreeSet<String>], queried_domain: &str) -> bool {
    if sets.len() < 2 || sets.iter().any(BTreeSet::is_empty) {
        return false;
    }

    let mut intersection = sets[0].clone();
    for set in &sets[1..] {
        intersection.retain(|d| set.contains(d));
    }

    if intersection.is_empty() {
        return true;
    }

    // Legitimate CDN indirection: some PTR name belongs to the queried domain.
    let union: BTreeSet<&String> = sets.iter().flatten().collect();
    if base_domain(queried_domain).is_some_and(|base| union.contains(&base)) {
        return false;
    }

    // No anchor either way; fall back to the overlap itself.
    intersection.is_empty()
}
