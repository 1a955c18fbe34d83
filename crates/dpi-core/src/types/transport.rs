use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol layer a transport probe exercised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// Plain availability check
    Http,
    /// Secure connection check with blackhole detection
    Tls,
}

/// Classified cause of a failed transport attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportErrorKind {
    /// Deadline exceeded
    Timeout,
    /// Host name did not resolve
    Resolve,
    /// TCP connection refused, reset or unreachable
    Connect,
    /// TLS handshake failed
    Handshake,
    /// Server reachable but its certificate is not trusted
    Certificate,
    /// Redirect loop or limit
    Redirect,
    /// Any other request-phase failure
    Request,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Timeout => "timeout",
            Self::Resolve => "resolve",
            Self::Connect => "connect",
            Self::Handshake => "handshake",
            Self::Certificate => "certificate",
            Self::Redirect => "redirect",
            Self::Request => "request",
        };
        f.write_str(label)
    }
}

/// Why a layer was not attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Target uses plain HTTP, there is no TLS layer to test
    NoTlsLayer,
}

/// Summary of the TLS layer, as shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TlsStatus {
    /// Handshake completed with a trusted certificate
    Valid,
    /// Handshake or certificate failed, or the connection hung
    Invalid,
    /// Plain HTTP target
    NoTls,
}

impl fmt::Display for TlsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::NoTls => "no_tls",
        })
    }
}

/// Outcome of one transport probe (HTTP or TLS)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportProbeResult {
    /// Which layer this result describes
    pub layer: Layer,

    /// False when the layer does not apply to the target
    pub attempted: bool,

    /// True if the request completed
    pub succeeded: bool,

    /// Time until completion or abort
    pub latency_ms: u64,

    /// HTTP status code, when inspected
    #[serde(default)]
    pub status_code: Option<u16>,

    /// Failure classification
    #[serde(default)]
    pub error_kind: Option<TransportErrorKind>,

    /// The attempt hung until the long timeout (TLS only)
    #[serde(default)]
    pub blackholed: bool,

    /// Why the layer was not attempted
    #[serde(default)]
    pub skipped: Option<SkipReason>,
}

impl TransportProbeResult {
    /// Completed request
    #[must_use]
    pub const fn success(layer: Layer, latency_ms: u64, status_code: Option<u16>) -> Self {
        Self {
            layer,
            attempted: true,
            succeeded: true,
            latency_ms,
            status_code,
            error_kind: None,
            blackholed: false,
            skipped: None,
        }
    }

    /// Failed request
    #[must_use]
    pub const fn failure(layer: Layer, latency_ms: u64, kind: TransportErrorKind) -> Self {
        Self {
            layer,
            attempted: true,
            succeeded: false,
            latency_ms,
            status_code: None,
            error_kind: Some(kind),
            blackholed: false,
            skipped: None,
        }
    }

    /// TLS attempt that hung until the blackhole threshold
    #[must_use]
    pub const fn blackholed(latency_ms: u64) -> Self {
        Self {
            layer: Layer::Tls,
            attempted: true,
            succeeded: false,
            latency_ms,
            status_code: None,
            error_kind: Some(TransportErrorKind::Timeout),
            blackholed: true,
            skipped: None,
        }
    }

    /// Layer not applicable
    #[must_use]
    pub const fn skipped(layer: Layer, reason: SkipReason) -> Self {
        Self {
            layer,
            attempted: false,
            succeeded: false,
            latency_ms: 0,
            status_code: None,
            error_kind: None,
            blackholed: false,
            skipped: Some(reason),
        }
    }

    /// TLS summary for display
    #[must_use]
    pub const fn tls_status(&self) -> TlsStatus {
        if !self.attempted {
            TlsStatus::NoTls
        } else if self.succeeded {
            TlsStatus::Valid
        } else {
            TlsStatus::Invalid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tls_status_summary() {
        let skipped = TransportProbeResult::skipped(Layer::Tls, SkipReason::NoTlsLayer);
        assert_eq!(skipped.tls_status(), TlsStatus::NoTls);
        assert!(skipped.error_kind.is_none());

        let ok = TransportProbeResult::success(Layer::Tls, 40, Some(200));
        assert_eq!(ok.tls_status(), TlsStatus::Valid);

        let hung = TransportProbeResult::blackholed(15_000);
        assert_eq!(hung.tls_status(), TlsStatus::Invalid);
        assert!(hung.blackholed);
    }

    #[test]
    fn serializes_snake_case() {
        let failed = TransportProbeResult::failure(Layer::Http, 12, TransportErrorKind::Connect);
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["layer"], "http");
        assert_eq!(json["error_kind"], "connect");
        assert_eq!(json["blackholed"], false);
    }
}
