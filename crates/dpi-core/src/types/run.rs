use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DnsProbeResult, TransportProbeResult};
use crate::target::{Target, TargetKind};
use crate::verdict::{classify, Verdict, VerdictInput};

/// A target submitted by a caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeTarget {
    /// Caller-chosen identifier (row id, list index, ...)
    pub id: String,
    /// Raw address as entered
    pub address: String,
}

impl ProbeTarget {
    /// Create a probe target
    #[must_use]
    pub fn new(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            address: address.into(),
        }
    }
}

/// Everything learned about one target in one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeRun {
    /// Classified target
    pub target: Target,

    /// Forward or reverse DNS probe
    pub dns: DnsProbeResult,

    /// HTTP availability probe
    pub http: TransportProbeResult,

    /// TLS reachability probe
    pub tls: TransportProbeResult,

    /// Derived verdict
    pub verdict: Verdict,

    /// When the run finished
    pub checked_at: DateTime<Utc>,

    /// Wall time of the whole run
    pub total_ms: u64,
}

impl ProbeRun {
    /// Assemble a run from its sub-probe results and classify it
    #[must_use]
    pub fn new(
        target: Target,
        dns: DnsProbeResult,
        http: TransportProbeResult,
        tls: TransportProbeResult,
        total_ms: u64,
    ) -> Self {
        let verdict = classify(&VerdictInput::from_results(target.kind(), &dns, &http, &tls));
        Self {
            target,
            dns,
            http,
            tls,
            verdict,
            checked_at: Utc::now(),
            total_ms,
        }
    }

    /// Name to show for this target: the PTR host for IP literals when
    /// available, otherwise the host itself
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.target.kind() != TargetKind::Domain {
            if let Some(name) = self.dns.reverse_domain() {
                return name.to_string();
            }
        }
        self.target.host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Layer, PtrRecord, SkipReason, TransportErrorKind};
    use crate::verdict::ReasonCode;

    #[test]
    fn ip_target_named_after_ptr() {
        let target = Target::normalize("192.0.2.1");
        let address = target.ip().unwrap();
        let dns = DnsProbeResult::from_reverse(PtrRecord {
            address,
            query_name: "1.2.0.192.in-addr.arpa".into(),
            reverse_domain: Some("host.example.net".into()),
            provider: Some("cloudflare".into()),
            latency_ms: 30,
        });
        let http = TransportProbeResult::failure(Layer::Http, 8000, TransportErrorKind::Timeout);
        let tls = TransportProbeResult::skipped(Layer::Tls, SkipReason::NoTlsLayer);

        let run = ProbeRun::new(target, dns, http, tls, 8000);
        assert_eq!(run.display_name(), "host.example.net");
        assert_eq!(run.verdict.reason, ReasonCode::IpBlock);
    }
}
