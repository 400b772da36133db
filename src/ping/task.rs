//! Repeated ping sessions with aggregate statistics.
//!
//! A task drives its sessions strictly sequentially: session *n*+1 starts
//! `interval` after session *n* completes (a simple repeating timer, not a
//! fixed-rate scheduler). `stop()` is idempotent, safe to call from the
//! completion handler, and both delivers and returns the final statistics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::PingConfig;
use crate::dns::lookup::HostLookup;
use crate::icmp::codec;
use crate::icmp::socket::TransportFactory;
use crate::ping::probe::{PingProbe, PingStatistics};
use crate::ping::session::{PingSession, PingTarget};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// Per-task settings, derived from [`PingConfig`] or built by hand.
#[derive(Debug, Clone)]
pub struct PingOptions {
    /// Delay between a session's completion and the next probe.
    /// `Duration::ZERO` means flood mode: probes go out back-to-back.
    pub interval: Duration,
    /// Per-probe timeout.
    pub timeout: Duration,
    /// Number of sessions before the task stops itself; `None` is unbounded.
    pub repeat_count: Option<u64>,
    /// ICMP payload size in bytes.
    pub payload_size: usize,
}

impl Default for PingOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(1),
            repeat_count: None,
            payload_size: codec::DEFAULT_PAYLOAD_SIZE,
        }
    }
}

impl From<&PingConfig> for PingOptions {
    fn from(config: &PingConfig) -> Self {
        Self {
            interval: config.interval(),
            timeout: config.timeout(),
            repeat_count: config.count,
            payload_size: config.payload_size,
        }
    }
}

pub type CompletionHandler = Box<dyn FnOnce(PingStatistics) + Send>;

struct TaskShared {
    probes: Mutex<Vec<PingProbe>>,
    finished: AtomicBool,
    stop_tx: watch::Sender<bool>,
    completion: Mutex<Option<CompletionHandler>>,
    final_stats: OnceLock<PingStatistics>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

type Launcher = Box<dyn FnOnce() -> JoinHandle<()> + Send>;

/// A scheduled sequence of ping sessions against one target.
pub struct PingTask {
    id: u64,
    shared: Arc<TaskShared>,
    launcher: Mutex<Option<Launcher>>,
}

impl PingTask {
    pub(crate) fn allocate_id() -> u64 {
        NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn with_id<L, F>(
        id: u64,
        target: PingTarget,
        options: PingOptions,
        identifier: u16,
        lookup: L,
        factory: F,
        completion: CompletionHandler,
    ) -> Self
    where
        L: HostLookup,
        F: TransportFactory,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let shared = Arc::new(TaskShared {
            probes: Mutex::new(Vec::new()),
            finished: AtomicBool::new(false),
            stop_tx,
            completion: Mutex::new(Some(completion)),
            final_stats: OnceLock::new(),
            handle: Mutex::new(None),
        });

        let loop_shared = Arc::clone(&shared);
        let launcher: Launcher = Box::new(move || {
            tokio::spawn(run_loop(
                loop_shared, stop_rx, target, options, identifier, lookup, factory,
            ))
        });

        Self {
            id,
            shared,
            launcher: Mutex::new(Some(launcher)),
        }
    }

    /// Build a task. Prefer going through the [`Pinger`](crate::ping::Pinger)
    /// façade, which also books the running task.
    pub fn new<L, F>(
        target: PingTarget,
        options: PingOptions,
        lookup: L,
        factory: F,
        completion: CompletionHandler,
    ) -> Self
    where
        L: HostLookup,
        F: TransportFactory,
    {
        let id = Self::allocate_id();
        let identifier = std::process::id() as u16 ^ id as u16;
        Self::with_id(id, target, options, identifier, lookup, factory, completion)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Begin the first session immediately. Calls after the first are no-ops.
    pub fn start(&self) {
        if let Some(launch) = self.launcher.lock().take() {
            *self.shared.handle.lock() = Some(launch());
        }
    }

    /// Stop the task: cancel any pending tick, finalize statistics from the
    /// probe history, deliver them through the completion handler exactly
    /// once, and return the same value. Idempotent.
    pub fn stop(&self) -> PingStatistics {
        let _ = self.shared.stop_tx.send(true);
        finish(&self.shared)
    }

    /// Running statistics over the probes finished so far.
    pub fn statistics(&self) -> PingStatistics {
        PingStatistics::from_probes(&self.shared.probes.lock())
    }

    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::SeqCst)
    }
}

/// Compute-and-deliver, first caller wins. Both the natural end of the run
/// loop and `stop()` funnel through here.
fn finish(shared: &TaskShared) -> PingStatistics {
    let stats = *shared
        .final_stats
        .get_or_init(|| PingStatistics::from_probes(&shared.probes.lock()));

    if !shared.finished.swap(true, Ordering::SeqCst) {
        // Take the handler out before invoking it so a re-entrant stop()
        // from inside the callback sees the task already finished.
        let completion = shared.completion.lock().take();
        if let Some(completion) = completion {
            completion(stats);
        }
    }

    stats
}

async fn run_loop<L, F>(
    shared: Arc<TaskShared>,
    mut stop_rx: watch::Receiver<bool>,
    target: PingTarget,
    options: PingOptions,
    identifier: u16,
    lookup: L,
    factory: F,
) where
    L: HostLookup,
    F: TransportFactory,
{
    let payload = codec::default_payload(options.payload_size);
    let mut sequence: u16 = 0;
    let mut completed: u64 = 0;

    loop {
        if shared.finished.load(Ordering::SeqCst) {
            break;
        }

        let mut session = PingSession::new(identifier, options.timeout, payload.clone());
        let probe = tokio::select! {
            _ = stop_rx.changed() => break,
            probe = session.run(&lookup, &factory, &target, sequence) => probe,
        };

        log_probe(&target, &probe);
        shared.probes.lock().push(probe);
        completed += 1;
        sequence = sequence.wrapping_add(1);

        if let Some(count) = options.repeat_count {
            if completed >= count {
                break;
            }
        }

        if options.interval > Duration::ZERO {
            tokio::select! {
                _ = stop_rx.changed() => break,
                _ = tokio::time::sleep(options.interval) => {}
            }
        }
    }

    finish(&shared);
}

fn log_probe(target: &PingTarget, probe: &PingProbe) {
    match (&probe.failure, probe.rtt()) {
        (None, Some(rtt)) => debug!(
            %target,
            icmp_seq = probe.sequence,
            bytes = probe.packet_size,
            time_ms = rtt.as_secs_f64() * 1_000.0,
            "reply received",
        ),
        (Some(failure), _) => debug!(%target, icmp_seq = probe.sequence, %failure, "probe failed"),
        _ => {}
    }
}
