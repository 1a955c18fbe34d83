//! Transport prober: HTTP availability and TLS reachability with blackhole
//! detection.

use dpi_core::{Layer, ProbeError, Result, SkipReason, Target, TransportErrorKind, TransportProbeResult};
use reqwest::redirect::Policy;
use reqwest::Client as HttpClient;
use std::error::Error as StdError;
use std::io;
use std::time::{Duration, Instant};
use tracing::debug;

use super::elapsed_ms;
use crate::config::{InspectionMode, ProbeConfig};

/// Redirect hops followed by the HTTP probe
const MAX_REDIRECTS: usize = 10;

/// Label hyper-util's HTTP connector puts on resolver failures
const RESOLVE_ERROR_LABEL: &str = "dns error";

/// Attempts HTTP and TLS connections to a target
#[derive(Clone)]
pub struct TransportProber {
    strict: HttpClient,
    lenient: HttpClient,
    http_timeout: Duration,
    blackhole_timeout: Duration,
    inspection: InspectionMode,
}

impl TransportProber {
    /// Create a prober from configuration
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let strict = build_client(config, false)?;
        let lenient = build_client(config, true)?;

        Ok(Self {
            strict,
            lenient,
            http_timeout: config.http_timeout_duration(),
            blackhole_timeout: config.blackhole_timeout_duration(),
            inspection: config.inspection,
        })
    }

    /// Run the HTTP and TLS probes concurrently
    pub async fn probe(&self, target: &Target) -> (TransportProbeResult, TransportProbeResult) {
        tokio::join!(self.probe_http(target), self.probe_tls(target))
    }

    /// GET the target, following redirects. Any completed response counts
    /// as connected, whatever its status code.
    pub async fn probe_http(&self, target: &Target) -> TransportProbeResult {
        let start = Instant::now();

        let outcome = self
            .strict
            .get(target.address())
            .timeout(self.http_timeout)
            .send()
            .await;

        match outcome {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(url = %target, status, "HTTP probe connected");
                TransportProbeResult::success(Layer::Http, elapsed_ms(start), self.visible_status(status))
            }
            Err(err) => {
                let kind = classify_error(&err);
                debug!(url = %target, %kind, error = %err, "HTTP probe failed");
                TransportProbeResult::failure(Layer::Http, elapsed_ms(start), kind)
            }
        }
    }

    /// Attempt a TLS connection. Completion before the blackhole threshold,
    /// successful or not, is conclusive; hanging past it is blackholing.
    pub async fn probe_tls(&self, target: &Target) -> TransportProbeResult {
        if !target.is_secure() {
            return TransportProbeResult::skipped(Layer::Tls, SkipReason::NoTlsLayer);
        }

        let start = Instant::now();
        let attempt = self.strict.get(target.address()).send();

        match tokio::time::timeout(self.blackhole_timeout, attempt).await {
            Err(_) => {
                debug!(url = %target, threshold = ?self.blackhole_timeout, "TLS probe blackholed");
                TransportProbeResult::blackholed(elapsed_ms(start))
            }
            Ok(Ok(response)) => {
                let status = response.status().as_u16();
                debug!(url = %target, status, "TLS probe connected");
                TransportProbeResult::success(Layer::Tls, elapsed_ms(start), self.visible_status(status))
            }
            Ok(Err(err)) => {
                let mut kind = classify_error(&err);
                let latency_ms = elapsed_ms(start);

                if self.inspection == InspectionMode::Full
                    && kind == TransportErrorKind::Handshake
                    && self.reachable_without_verification(target).await
                {
                    kind = TransportErrorKind::Certificate;
                }

                debug!(url = %target, %kind, error = %err, "TLS probe failed");
                tls_error_result(kind, latency_ms)
            }
        }
    }

    /// Retry with certificate verification off. Success means the TLS
    /// session itself works and only the certificate was rejected.
    async fn reachable_without_verification(&self, target: &Target) -> bool {
        self.lenient
            .get(target.address())
            .timeout(self.http_timeout)
            .send()
            .await
            .is_ok()
    }

    const fn visible_status(&self, status: u16) -> Option<u16> {
        match self.inspection {
            InspectionMode::Full => Some(status),
            InspectionMode::Opaque => None,
        }
    }
}

fn build_client(config: &ProbeConfig, accept_invalid_certs: bool) -> Result<HttpClient> {
    HttpClient::builder()
        .user_agent(&config.user_agent)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .build()
        .map_err(|e| ProbeError::Config(format!("failed to build transport client: {e}")))
}

/// A TLS attempt that errored before the blackhole threshold. A timeout
/// reported by the error itself is an ordinary failure, never a blackhole.
const fn tls_error_result(kind: TransportErrorKind, latency_ms: u64) -> TransportProbeResult {
    TransportProbeResult::failure(Layer::Tls, latency_ms, kind)
}

/// Map a request error onto a transport failure kind
pub(crate) fn classify_error(err: &reqwest::Error) -> TransportErrorKind {
    if err.is_timeout() {
        return TransportErrorKind::Timeout;
    }
    if err.is_redirect() {
        return TransportErrorKind::Redirect;
    }
    classify_chain(err, err.is_connect())
}

/// Classify by the error's source chain
fn classify_chain(err: &(dyn StdError + 'static), is_connect: bool) -> TransportErrorKind {
    // hyper-util's connector reports resolver failures as a plain
    // `ConnectError` labelled "dns error"; no public type marks them.
    if mentions(err, RESOLVE_ERROR_LABEL) {
        return TransportErrorKind::Resolve;
    }

    if let Some(io_err) = io_source(err) {
        match io_err.kind() {
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::AddrNotAvailable
            | io::ErrorKind::NotConnected => return TransportErrorKind::Connect,
            io::ErrorKind::TimedOut => return TransportErrorKind::Timeout,
            _ => {}
        }
    }

    if is_connect {
        TransportErrorKind::Handshake
    } else {
        TransportErrorKind::Request
    }
}

/// First `io::Error` in the source chain
fn io_source<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a io::Error> {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            return Some(io_err);
        }
        source = cause.source();
    }
    None
}

/// Does any error in the chain mention `needle`
fn mentions(err: &(dyn StdError + 'static), needle: &str) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(cause) = current {
        if cause.to_string().contains(needle) {
            return true;
        }
        current = cause.source();
    }
    false
}
