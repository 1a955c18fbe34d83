//! Probe orchestration: in-flight tracking, single runs and paced batches.

use dpi_core::{ProbeError, ProbeRun, ProbeTarget, Result, Target};
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::config::BatchConfig;
use crate::prober::TargetProber;

/// Capacity of the event channel behind [`Orchestrator::stream_batch`]
const EVENT_BUFFER: usize = 64;

/// Something that happened during a batch
#[derive(Debug)]
pub enum BatchEvent {
    /// A target finished probing
    Completed {
        /// Caller id of the target
        id: String,
        /// The classified run
        run: Box<ProbeRun>,
    },
    /// A target could not be probed
    Failed {
        /// Caller id of the target
        id: String,
        /// Why
        error: ProbeError,
    },
    /// Emitted after every `Completed` or `Failed`
    Progress {
        /// Targets finished so far
        completed: usize,
        /// Targets scheduled in this batch
        total: usize,
    },
}

/// How a batch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchSummary {
    /// Every submitted target was already in flight, or none were given
    NothingToRun {
        /// Targets skipped because they were in flight
        skipped: usize,
    },
    /// All groups ran
    Completed {
        /// Targets scheduled
        total: usize,
        /// Targets that produced a `Completed` or `Failed` event
        completed: usize,
        /// Groups run
        groups: usize,
        /// Targets skipped because they were in flight
        skipped: usize,
    },
    /// [`Orchestrator::cancel_all`] stopped the batch early
    Cancelled {
        /// Targets finished before cancellation
        completed: usize,
        /// Targets scheduled
        total: usize,
    },
}

/// Runs probes, tracking which target ids are in flight.
///
/// Cheap to clone; clones share the in-flight map.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    prober: Arc<dyn TargetProber>,
    config: BatchConfig,
    /// id -> generation that claimed it
    in_flight: Mutex<HashMap<String, u64>>,
    generation: AtomicU64,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}

/// Holds an id in the in-flight map until dropped
struct Claim<'a> {
    inner: &'a Inner,
    id: String,
    generation: u64,
}

impl Claim<'_> {
    /// Returns false once [`Orchestrator::cancel_all`] ran after the claim
    fn is_current(&self) -> bool {
        self.inner.generation() == self.generation
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        let mut map = self.inner.in_flight();
        if map.get(&self.id) == Some(&self.generation) {
            map.remove(&self.id);
        }
    }
}

impl Orchestrator {
    /// Create an orchestrator over `prober`
    pub fn new(prober: impl TargetProber + 'static, config: BatchConfig) -> Self {
        Self::with_shared(Arc::new(prober), config)
    }

    /// Create an orchestrator over an already shared prober
    pub fn with_shared(prober: Arc<dyn TargetProber>, config: BatchConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                prober,
                config,
                in_flight: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Batch configuration
    pub fn config(&self) -> &BatchConfig {
        &self.inner.config
    }

    /// Returns true if a run for `id` is in progress
    pub fn is_in_flight(&self, id: &str) -> bool {
        self.inner.in_flight().contains_key(id)
    }

    /// Number of runs in progress
    pub fn in_flight_count(&self) -> usize {
        self.inner.in_flight().len()
    }

    /// Drop all in-flight claims. Runs still executing finish, but their
    /// results are discarded and running batches schedule no more groups.
    pub fn cancel_all(&self) {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let dropped = {
            let mut map = self.inner.in_flight();
            let count = map.len();
            map.clear();
            count
        };
        info!(generation, dropped, "cancelled in-flight probes");
    }

    /// Probe one target.
    ///
    /// Fails with [`ProbeError::InvalidTarget`] before starting if the
    /// address is unusable, [`ProbeError::InFlight`] if the id is already
    /// being probed, and [`ProbeError::Cancelled`] if [`Self::cancel_all`]
    /// ran while probing.
    pub async fn run_one(&self, target: &ProbeTarget) -> Result<ProbeRun> {
        let normalized = Target::normalize(&target.address);
        if !normalized.is_valid() {
            return Err(ProbeError::InvalidTarget(target.address.clone()));
        }

        let claim = self.claim(&target.id)?;
        debug!(id = %target.id, url = %normalized, "probe started");

        let run = self.inner.prober.probe(&normalized).await;

        if !claim.is_current() {
            debug!(id = %target.id, "discarding result of cancelled probe");
            return Err(ProbeError::Cancelled {
                id: target.id.clone(),
            });
        }
        Ok(run)
    }

    /// Probe `targets` in groups, sending events to `events` in completion
    /// order.
    ///
    /// Ids already in flight are skipped. Groups run one after another,
    /// separated by the configured delay. A closed receiver does not stop
    /// the batch.
    pub async fn run_batch(
        &self,
        targets: Vec<ProbeTarget>,
        events: mpsc::Sender<BatchEvent>,
    ) -> BatchSummary {
        let generation = self.inner.generation();

        let submitted = targets.len();
        let eligible: Vec<ProbeTarget> = targets
            .into_iter()
            .filter(|t| !self.is_in_flight(&t.id))
            .collect();
        let skipped = submitted - eligible.len();

        if eligible.is_empty() {
            debug!(skipped, "nothing to run");
            return BatchSummary::NothingToRun { skipped };
        }

        let total = eligible.len();
        let group_size = self.inner.config.group_size();
        info!(total, skipped, group_size, "batch started");

        let mut completed = 0;
        let mut groups = 0;

        for (index, group) in eligible.chunks(group_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.inner.config.delay()).await;
            }
            if self.inner.generation() != generation {
                info!(completed, total, "batch cancelled");
                return BatchSummary::Cancelled { completed, total };
            }
            groups += 1;

            let mut pending: FuturesUnordered<_> = group
                .iter()
                .map(|target| async move { (target.id.clone(), self.run_one(target).await) })
                .collect();

            while let Some((id, outcome)) = pending.next().await {
                let event = match outcome {
                    Ok(run) => BatchEvent::Completed {
                        id,
                        run: Box::new(run),
                    },
                    Err(ProbeError::Cancelled { .. }) => continue,
                    Err(error) => {
                        warn!(%id, %error, "probe failed");
                        BatchEvent::Failed { id, error }
                    }
                };
                completed += 1;

                emit(&events, event).await;
                emit(&events, BatchEvent::Progress { completed, total }).await;
            }
        }

        if self.inner.generation() != generation {
            info!(completed, total, "batch cancelled");
            return BatchSummary::Cancelled { completed, total };
        }

        info!(total, completed, groups, "batch finished");
        BatchSummary::Completed {
            total,
            completed,
            groups,
            skipped,
        }
    }

    /// Run a batch on a background task, returning its event stream and a
    /// handle resolving to the summary.
    pub fn stream_batch(
        &self,
        targets: Vec<ProbeTarget>,
    ) -> (ReceiverStream<BatchEvent>, JoinHandle<BatchSummary>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let orchestrator = self.clone();
        let handle = tokio::spawn(async move { orchestrator.run_batch(targets, tx).await });
        (ReceiverStream::new(rx), handle)
    }

    fn claim(&self, id: &str) -> Result<Claim<'_>> {
        let generation = self.inner.generation();
        let mut map = self.inner.in_flight();
        if map.contains_key(id) {
            debug!(id, "already in flight");
            return Err(ProbeError::InFlight { id: id.to_string() });
        }
        map.insert(id.to_string(), generation);

        Ok(Claim {
            inner: &self.inner,
            id: id.to_string(),
            generation,
        })
    }
}

async fn emit(events: &mpsc::Sender<BatchEvent>, event: BatchEvent) {
    if events.send(event).await.is_err() {
        debug!("batch event receiver dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dpi_core::reverse::ptr_query_name;
    use dpi_core::{DnsProbeResult, Layer, PtrRecord, SkipReason, TransportProbeResult};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::time::Instant;

    /// Sleeps per host, records when each probe started
    struct FakeProber {
        delays: HashMap<String, Duration>,
        default_delay: Duration,
        starts: Mutex<Vec<(String, Instant)>>,
    }

    impl FakeProber {
        fn new(default_delay: Duration) -> Self {
            Self {
                delays: HashMap::new(),
                default_delay,
                starts: Mutex::new(Vec::new()),
            }
        }

        fn with_delay(mut self, host: &str, delay: Duration) -> Self {
            self.delays.insert(host.to_string(), delay);
            self
        }

        fn group_sizes(&self) -> Vec<usize> {
            let starts = self.starts.lock().unwrap();
            let mut sizes: Vec<usize> = Vec::new();
            let mut last: Option<Instant> = None;
            for (_, at) in starts.iter() {
                if last == Some(*at) {
                    *sizes.last_mut().unwrap() += 1;
                } else {
                    sizes.push(1);
                    last = Some(*at);
                }
            }
            sizes
        }
    }

    #[async_trait]
    impl TargetProber for FakeProber {
        async fn probe(&self, target: &Target) -> ProbeRun {
            let host = target.host();
            self.starts.lock().unwrap().push((host.clone(), Instant::now()));
            let delay = self.delays.get(&host).copied().unwrap_or(self.default_delay);
            tokio::time::sleep(delay).await;
            fake_run(target)
        }
    }

    fn fake_run(target: &Target) -> ProbeRun {
        let address = target.ip().unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        let dns = DnsProbeResult::from_reverse(PtrRecord {
            address,
            query_name: ptr_query_name(&address),
            reverse_domain: Some("host.example.net".into()),
            provider: Some("fake".into()),
            latency_ms: 1,
        });
        ProbeRun::new(
            target.clone(),
            dns,
            TransportProbeResult::success(Layer::Http, 1, Some(200)),
            TransportProbeResult::skipped(Layer::Tls, SkipReason::NoTlsLayer),
            1,
        )
    }

    fn targets(count: u8) -> Vec<ProbeTarget> {
        (1..=count)
            .map(|n| ProbeTarget::new(format!("t{n}"), format!("192.0.2.{n}")))
            .collect()
    }

    fn orchestrator(prober: &Arc<FakeProber>) -> Orchestrator {
        let shared: Arc<dyn TargetProber> = prober.clone();
        Orchestrator::with_shared(shared, BatchConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn batch_runs_in_groups_with_progress() {
        let prober = Arc::new(FakeProber::new(Duration::from_millis(100)));
        let orchestrator = orchestrator(&prober);

        let (stream, handle) = orchestrator.stream_batch(targets(7));
        let events: Vec<BatchEvent> = stream.collect().await;
        let summary = handle.await.unwrap();

        assert_eq!(
            summary,
            BatchSummary::Completed {
                total: 7,
                completed: 7,
                groups: 3,
                skipped: 0
            }
        );
        assert_eq!(prober.group_sizes(), vec![3, 3, 1]);

        let progress: Vec<(usize, usize)> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Progress { completed, total } => Some((*completed, *total)),
                _ => None,
            })
            .collect();
        assert_eq!(progress, (1..=7).map(|c| (c, 7)).collect::<Vec<_>>());

        let completed = events
            .iter()
            .filter(|e| matches!(e, BatchEvent::Completed { .. }))
            .count();
        assert_eq!(completed, 7);
        assert_eq!(orchestrator.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn groups_are_separated_by_delay() {
        let prober = Arc::new(FakeProber::new(Duration::from_millis(100)));
        let orchestrator = orchestrator(&prober);

        let (stream, handle) = orchestrator.stream_batch(targets(4));
        let _: Vec<BatchEvent> = stream.collect().await;
        handle.await.unwrap();

        let starts = prober.starts.lock().unwrap();
        let gap = starts[3].1 - starts[0].1;
        assert!(gap >= Duration::from_millis(600), "gap was {gap:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn results_arrive_in_completion_order() {
        let prober = Arc::new(
            FakeProber::new(Duration::from_millis(100))
                .with_delay("192.0.2.1", Duration::from_millis(300))
                .with_delay("192.0.2.3", Duration::from_millis(200)),
        );
        let orchestrator = orchestrator(&prober);

        let (stream, handle) = orchestrator.stream_batch(targets(3));
        let events: Vec<BatchEvent> = stream.collect().await;
        handle.await.unwrap();

        let order: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                BatchEvent::Completed { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec!["t2", "t3", "t1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_submission_is_rejected() {
        let prober = Arc::new(FakeProber::new(Duration::from_secs(1)));
        let orchestrator = orchestrator(&prober);
        let target = ProbeTarget::new("a", "192.0.2.1");

        let first = {
            let orchestrator = orchestrator.clone();
            let target = target.clone();
            tokio::spawn(async move { orchestrator.run_one(&target).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(orchestrator.is_in_flight("a"));

        let second = orchestrator.run_one(&target).await;
        assert!(matches!(second, Err(ProbeError::InFlight { ref id }) if id == "a"));

        let run = first.await.unwrap().unwrap();
        assert_eq!(run.display_name(), "host.example.net");
        assert!(!orchestrator.is_in_flight("a"));
        assert_eq!(prober.starts.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_discards_late_result() {
        let prober = Arc::new(FakeProber::new(Duration::from_secs(1)));
        let orchestrator = orchestrator(&prober);
        let target = ProbeTarget::new("a", "192.0.2.1");

        let first = {
            let orchestrator = orchestrator.clone();
            let target = target.clone();
            tokio::spawn(async move { orchestrator.run_one(&target).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        orchestrator.cancel_all();
        assert_eq!(orchestrator.in_flight_count(), 0);

        // The id is free again; the stale claim must not release the new one.
        let (first, second) = tokio::join!(first, async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let pending = orchestrator.run_one(&target);
            tokio::pin!(pending);
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(600)) => {}
                _ = &mut pending => panic!("second run finished too early"),
            }
            assert!(orchestrator.is_in_flight("a"));
            pending.await
        });

        assert!(matches!(first.unwrap(), Err(ProbeError::Cancelled { ref id }) if id == "a"));
        assert!(second.is_ok());
        assert_eq!(orchestrator.in_flight_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_scheduling_groups() {
        let prober = Arc::new(FakeProber::new(Duration::from_millis(100)));
        let orchestrator = orchestrator(&prober);

        let (stream, handle) = orchestrator.stream_batch(targets(7));
        tokio::time::sleep(Duration::from_millis(150)).await;
        orchestrator.cancel_all();

        let _: Vec<BatchEvent> = stream.collect().await;
        assert_eq!(
            handle.await.unwrap(),
            BatchSummary::Cancelled {
                completed: 3,
                total: 7
            }
        );
        assert_eq!(prober.starts.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_targets_are_skipped() {
        let prober = Arc::new(FakeProber::new(Duration::from_secs(1)));
        let orchestrator = orchestrator(&prober);
        let target = ProbeTarget::new("a", "192.0.2.1");

        let running = {
            let orchestrator = orchestrator.clone();
            let target = target.clone();
            tokio::spawn(async move { orchestrator.run_one(&target).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let (tx, _rx) = mpsc::channel(8);
        let summary = orchestrator.run_batch(vec![target], tx.clone()).await;
        assert_eq!(summary, BatchSummary::NothingToRun { skipped: 1 });

        let summary = orchestrator.run_batch(Vec::new(), tx).await;
        assert_eq!(summary, BatchSummary::NothingToRun { skipped: 0 });

        assert!(running.await.unwrap().is_ok());
    }

    #[test]
    fn summary_serializes_with_status_tag() {
        let summary = BatchSummary::Cancelled {
            completed: 3,
            total: 7,
        };
        assert_eq!(
            serde_json::to_value(summary).unwrap(),
            serde_json::json!({"status": "cancelled", "completed": 3, "total": 7})
        );
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_targets_fail_without_probing() {
        let prober = Arc::new(FakeProber::new(Duration::from_millis(10)));
        let orchestrator = orchestrator(&prober);

        let result = orchestrator.run_one(&ProbeTarget::new("x", "")).await;
        assert!(matches!(result, Err(ProbeError::InvalidTarget(_))));

        let batch = vec![
            ProbeTarget::new("bad", "   "),
            ProbeTarget::new("good", "192.0.2.9"),
        ];
        let (stream, handle) = orchestrator.stream_batch(batch);
        let events: Vec<BatchEvent> = stream.collect().await;

        assert!(events.iter().any(|e| matches!(
            e,
            BatchEvent::Failed { id, error: ProbeError::InvalidTarget(_) } if id == "bad"
        )));
        assert_eq!(
            handle.await.unwrap(),
            BatchSummary::Completed {
                total: 2,
                completed: 2,
                groups: 1,
                skipped: 0
            }
        );
        assert_eq!(prober.starts.lock().unwrap().len(), 1);
    }
}
