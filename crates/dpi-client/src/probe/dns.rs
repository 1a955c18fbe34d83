//! DNS prober: dual-provider forward lookups, reverse lookups and the
//! spoofing signal.

use dpi_core::reverse::ptr_query_name;
use dpi_core::spoofing::detect_spoofing;
use dpi_core::{
    DnsFailure, DnsProbeResult, DnsProviderResult, ProbeError, PtrRecord, RecordType, Target,
};
use futures_util::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::elapsed_ms;
use crate::client::{DohClient, DohResponse};
use crate::config::{DohProvider, ProbeConfig};

/// Resolves targets through every configured DoH provider
#[derive(Clone)]
pub struct DnsProber {
    client: DohClient,
    providers: Arc<[DohProvider]>,
    timeout: Duration,
}

impl DnsProber {
    /// Create a prober over `client` using the providers in `config`
    #[must_use]
    pub fn new(client: DohClient, config: &ProbeConfig) -> Self {
        Self {
            client,
            providers: config.providers.clone().into(),
            timeout: config.dns_timeout_duration(),
        }
    }

    /// Configured providers, in query order
    #[must_use]
    pub fn providers(&self) -> &[DohProvider] {
        &self.providers
    }

    /// Forward lookup for domains, reverse lookup for IP literals
    pub async fn probe(&self, target: &Target) -> DnsProbeResult {
        match target.ip() {
            Some(ip) if target.kind().is_ip() => DnsProbeResult::from_reverse(self.resolve_reverse(ip).await),
            _ => self.resolve_forward(&target.host()).await,
        }
    }

    /// Resolve `domain` through all providers concurrently, reverse-resolve
    /// every address found and compare the providers' answers.
    pub async fn resolve_forward(&self, domain: &str) -> DnsProbeResult {
        let start = Instant::now();

        let lookups = self.providers.iter().map(|p| self.lookup_a(p, domain));
        let results = join_all(lookups).await;

        let addresses: BTreeSet<IpAddr> = results
            .iter()
            .flat_map(|r| r.addresses.iter().copied())
            .collect();
        let resolved = results.iter().any(|r| r.resolved);
        let per_provider: BTreeMap<String, DnsProviderResult> = results
            .into_iter()
            .map(|r| (r.provider.clone(), r))
            .collect();

        let ptrs = join_all(addresses.iter().map(|addr| self.resolve_reverse(*addr))).await;
        let ptr_by_address: BTreeMap<IpAddr, PtrRecord> =
            ptrs.into_iter().map(|ptr| (ptr.address, ptr)).collect();

        let spoofed = detect_spoofing(&per_provider, &ptr_by_address, domain);
        if spoofed {
            warn!(domain, "providers disagree on reverse DNS, possible spoofing");
        }

        DnsProbeResult {
            record_type: RecordType::A,
            resolved,
            addresses,
            per_provider,
            ptr_by_address,
            spoofed,
            latency_ms: elapsed_ms(start),
        }
    }

    /// Reverse-resolve `address`, asking providers in order until one
    /// returns a PTR answer. No answer is a normal negative result.
    pub async fn resolve_reverse(&self, address: IpAddr) -> PtrRecord {
        let start = Instant::now();
        let query_name = ptr_query_name(&address);

        for provider in self.providers.iter() {
            match self.query(provider, &query_name, RecordType::Ptr).await {
                Ok(response) => {
                    if let Some(host) = response.records(RecordType::Ptr).next() {
                        debug!(%address, host, provider = %provider.name, "PTR found");
                        return PtrRecord {
                            address,
                            query_name,
                            reverse_domain: Some(host.to_string()),
                            provider: Some(provider.name.clone()),
                            latency_ms: elapsed_ms(start),
                        };
                    }
                }
                Err(failure) => {
                    debug!(%address, provider = %provider.name, %failure, "PTR lookup failed");
                }
            }
        }

        PtrRecord {
            address,
            query_name,
            reverse_domain: None,
            provider: None,
            latency_ms: elapsed_ms(start),
        }
    }

    /// One provider's A lookup; failures stay local to this provider
    async fn lookup_a(&self, provider: &DohProvider, domain: &str) -> DnsProviderResult {
        let start = Instant::now();

        match self.query(provider, domain, RecordType::A).await {
            Ok(response) => {
                let addresses: BTreeSet<IpAddr> = response
                    .records(RecordType::A)
                    .filter_map(|data| data.parse().ok())
                    .collect();
                debug!(provider = %provider.name, domain, count = addresses.len(), "A lookup");
                DnsProviderResult::resolved(provider.name.clone(), addresses, elapsed_ms(start))
            }
            Err(failure) => {
                warn!(provider = %provider.name, domain, %failure, "A lookup failed");
                DnsProviderResult::failed(provider.name.clone(), failure, elapsed_ms(start))
            }
        }
    }

    /// Run one DoH query under this prober's deadline
    async fn query(
        &self,
        provider: &DohProvider,
        name: &str,
        record_type: RecordType,
    ) -> Result<DohResponse, DnsFailure> {
        match tokio::time::timeout(self.timeout, self.client.query(provider, name, record_type)).await {
            Err(_) => Err(DnsFailure::Timeout),
            Ok(result) => result.map_err(failure_from),
        }
    }
}

fn failure_from(err: ProbeError) -> DnsFailure {
    match err {
        ProbeError::Provider { code, .. } => DnsFailure::Status(code),
        ProbeError::Timeout(_) => DnsFailure::Timeout,
        ProbeError::Json(e) => DnsFailure::Decode(e.to_string()),
        other => DnsFailure::Request(other.to_string()),
    }
}
