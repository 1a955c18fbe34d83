//! Network probes run against a single target.

pub mod dns;
pub mod transport;

use dpi_core::{ProbeRun, Result, Target};
use std::time::Instant;
use tracing::{debug, instrument};

pub use dns::DnsProber;
pub use transport::TransportProber;

use crate::client::DohClient;
use crate::config::ProbeConfig;

/// Milliseconds since `start`, saturating
pub(crate) fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Runs the DNS, HTTP and TLS probes for a target and classifies the
/// outcome.
///
/// # Example
///
/// ```rust,no_run
/// use dpi_client::{NetworkProber, ProbeConfig};
/// use dpi_core::Target;
///
/// # async fn example() -> dpi_client::Result<()> {
/// let prober = NetworkProber::new(ProbeConfig::default())?;
/// let run = prober.probe(&Target::normalize("example.com")).await;
/// println!("{}: {}", run.display_name(), run.verdict);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NetworkProber {
    dns: DnsProber,
    transport: TransportProber,
}

impl NetworkProber {
    /// Validate `config` and build both probers
    pub fn new(config: ProbeConfig) -> Result<Self> {
        config.validate()?;

        let client = DohClient::builder()
            .timeout(config.dns_timeout_duration())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self {
            dns: DnsProber::new(client, &config),
            transport: TransportProber::new(&config)?,
        })
    }

    /// Probe `target` on every layer concurrently. Sub-probe failures are
    /// recorded in the run; this never fails.
    #[instrument(skip_all, fields(url = %target))]
    pub async fn probe(&self, target: &Target) -> ProbeRun {
        let start = Instant::now();

        let (dns, (http, tls)) = tokio::join!(self.dns.probe(target), self.transport.probe(target));

        let run = ProbeRun::new(target.clone(), dns, http, tls, elapsed_ms(start));
        debug!(verdict = %run.verdict, total_ms = run.total_ms, "probe finished");
        run
    }

    /// DNS prober
    #[must_use]
    pub const fn dns(&self) -> &DnsProber {
        &self.dns
    }

    /// Transport prober
    #[must_use]
    pub const fn transport(&self) -> &TransportProber {
        &self.transport
    }
}
