use async_trait::async_trait;
use dpi_client::NetworkProber;
use dpi_core::{ProbeRun, Target};

/// Something that can run all probes for a target.
///
/// The orchestrator only needs this seam; [`NetworkProber`] is the real
/// implementation.
#[async_trait]
pub trait TargetProber: Send + Sync {
    /// Probe `target` and return its classified run
    async fn probe(&self, target: &Target) -> ProbeRun;
}

#[async_trait]
impl TargetProber for NetworkProber {
    async fn probe(&self, target: &Target) -> ProbeRun {
        Self::probe(self, target).await
    }
}
