//! One asynchronous name/address resolution with timeout and cancellation.
//!
//! A resolution delivers exactly one result: the first of the lookup and the
//! timeout timer to finish wins, and the loser is a no-op. The guard is the
//! `FnOnce` handler itself, taken out of its slot at most once.

use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::dns::lookup::HostLookup;
use crate::error::DnsError;

/// Outcome of a resolution: either the first usable printable entry of the
/// result set, or a typed failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsResolutionResult {
    Success(String),
    Failure(DnsError),
}

/// What to resolve: a host name into addresses, or an address into names.
#[derive(Debug, Clone)]
pub enum ResolveQuery {
    Addresses(String),
    Names(IpAddr),
}

type ResultHandler = Box<dyn FnOnce(DnsResolutionResult) + Send>;

struct ResolutionState {
    handler: Mutex<Option<ResultHandler>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// A single in-flight resolution.
pub struct DnsResolution<L: HostLookup> {
    query: ResolveQuery,
    timeout: Duration,
    lookup: L,
    fired: AtomicBool,
    state: Arc<ResolutionState>,
}

impl<L: HostLookup> DnsResolution<L> {
    pub(crate) fn new(
        query: ResolveQuery,
        timeout: Duration,
        lookup: L,
        handler: ResultHandler,
    ) -> Self {
        Self {
            query,
            timeout,
            lookup,
            fired: AtomicBool::new(false),
            state: Arc::new(ResolutionState {
                handler: Mutex::new(Some(handler)),
                task: Mutex::new(None),
            }),
        }
    }

    /// Begin the resolution and arm the timeout timer. Idempotent: calls
    /// after the first have no effect.
    pub fn start(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            return;
        }

        let query = self.query.clone();
        let lookup = self.lookup.clone();
        let timeout = self.timeout;
        let state = Arc::clone(&self.state);

        // Hold the slot across the spawn so a concurrent cancel() cannot
        // observe the fired flag without also seeing the task handle.
        let mut task = self.state.task.lock();
        *task = Some(tokio::spawn(async move {
            let result = tokio::select! {
                _ = tokio::time::sleep(timeout) => {
                    debug!(?query, "resolution timed out");
                    DnsResolutionResult::Failure(DnsError::Timeout)
                }
                outcome = run_query(&lookup, &query) => outcome,
            };
            deliver(&state, result);
        }));
    }

    /// Abandon the resolution without delivering a result. A no-op before
    /// `start()` and after a result has been delivered.
    pub fn cancel(&self) {
        if !self.fired.load(Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.state.task.lock().take() {
            handle.abort();
        }
    }
}

fn deliver(state: &ResolutionState, result: DnsResolutionResult) {
    let handler = state.handler.lock().take();
    if let Some(handler) = handler {
        handler(result);
    }
}

async fn run_query<L: HostLookup>(lookup: &L, query: &ResolveQuery) -> DnsResolutionResult {
    match query {
        ResolveQuery::Addresses(host) => match lookup.addresses(host).await {
            Ok(addresses) => first_printable(addresses.iter().map(ToString::to_string)),
            Err(err) => DnsResolutionResult::Failure(err),
        },
        ResolveQuery::Names(address) => match lookup.names(*address).await {
            Ok(names) => first_printable(names.into_iter()),
            Err(err) => DnsResolutionResult::Failure(err),
        },
    }
}

/// Walk the result set and pick the first entry with a usable printable
/// form; an empty or unconvertible set is an unknown-error failure.
fn first_printable(entries: impl Iterator<Item = String>) -> DnsResolutionResult {
    for entry in entries {
        if !entry.is_empty() {
            return DnsResolutionResult::Success(entry);
        }
    }
    DnsResolutionResult::Failure(DnsError::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    use tokio::sync::oneshot;

    use crate::dns::lookup::tests::MockLookup;

    fn resolution_with_probe(
        query: ResolveQuery,
        timeout: Duration,
        lookup: MockLookup,
    ) -> (
        DnsResolution<MockLookup>,
        oneshot::Receiver<DnsResolutionResult>,
        Arc<AtomicU64>,
    ) {
        let (tx, rx) = oneshot::channel();
        let deliveries = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&deliveries);
        let resolution = DnsResolution::new(
            query,
            timeout,
            lookup,
            Box::new(move |result| {
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(result);
            }),
        );
        (resolution, rx, deliveries)
    }

    #[tokio::test]
    async fn should_deliver_first_address_on_success() {
        let lookup = MockLookup::new();
        lookup.add_addresses(
            "example.com",
            vec![IpAddr::from([93, 184, 216, 34]), IpAddr::from([1, 1, 1, 1])],
        );

        let (resolution, rx, _) = resolution_with_probe(
            ResolveQuery::Addresses("example.com".into()),
            Duration::from_secs(3),
            lookup,
        );
        resolution.start();

        assert_eq!(
            rx.await.unwrap(),
            DnsResolutionResult::Success("93.184.216.34".into())
        );
    }

    #[tokio::test]
    async fn should_fail_with_unknown_on_empty_result_set() {
        let (resolution, rx, _) = resolution_with_probe(
            ResolveQuery::Addresses("empty.invalid".into()),
            Duration::from_secs(3),
            MockLookup::new(),
        );
        resolution.start();

        assert_eq!(
            rx.await.unwrap(),
            DnsResolutionResult::Failure(DnsError::Unknown)
        );
    }

    #[tokio::test]
    async fn should_propagate_stream_error() {
        let lookup = MockLookup::new();
        lookup.set_error(DnsError::Stream("no route".into()));

        let (resolution, rx, _) = resolution_with_probe(
            ResolveQuery::Addresses("example.com".into()),
            Duration::from_secs(3),
            lookup,
        );
        resolution.start();

        assert_eq!(
            rx.await.unwrap(),
            DnsResolutionResult::Failure(DnsError::Stream("no route".into()))
        );
    }

    #[tokio::test]
    async fn should_resolve_address_to_name() {
        let lookup = MockLookup::new();
        lookup.add_names(IpAddr::from([1, 1, 1, 1]), vec!["one.one.one.one.".into()]);

        let (resolution, rx, _) = resolution_with_probe(
            ResolveQuery::Names(IpAddr::from([1, 1, 1, 1])),
            Duration::from_secs(3),
            lookup,
        );
        resolution.start();

        assert_eq!(
            rx.await.unwrap(),
            DnsResolutionResult::Success("one.one.one.one.".into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn should_time_out_when_lookup_never_answers_and_cancel_is_then_a_noop() {
        let lookup = MockLookup::new();
        lookup.set_delay(Duration::from_secs(600));

        let (resolution, rx, deliveries) = resolution_with_probe(
            ResolveQuery::Addresses("example.invalid".into()),
            Duration::from_millis(100),
            lookup,
        );
        resolution.start();

        assert_eq!(
            rx.await.unwrap(),
            DnsResolutionResult::Failure(DnsError::Timeout)
        );
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);

        // A manual cancel after delivery has no observable effect.
        resolution.cancel();
        tokio::time::sleep(Duration::from_secs(700)).await;
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_deliver_exactly_once_when_lookup_and_timer_race() {
        let lookup = MockLookup::new();
        lookup.add_addresses("example.com", vec![IpAddr::from([1, 1, 1, 1])]);
        // Same instant as the timeout: whichever the select picks, one result.
        lookup.set_delay(Duration::from_millis(100));

        let (resolution, rx, deliveries) = resolution_with_probe(
            ResolveQuery::Addresses("example.com".into()),
            Duration::from_millis(100),
            lookup,
        );
        resolution.start();

        let _ = rx.await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_ignore_second_start() {
        let lookup = MockLookup::new();
        lookup.add_addresses("example.com", vec![IpAddr::from([1, 1, 1, 1])]);

        let (resolution, rx, deliveries) = resolution_with_probe(
            ResolveQuery::Addresses("example.com".into()),
            Duration::from_secs(3),
            lookup.clone(),
        );
        resolution.start();
        resolution.start();

        let _ = rx.await.unwrap();
        assert_eq!(lookup.call_count(), 1);
        assert_eq!(deliveries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_deliver_after_cancel() {
        let lookup = MockLookup::new();
        lookup.set_delay(Duration::from_secs(10));

        let (resolution, _rx, deliveries) = resolution_with_probe(
            ResolveQuery::Addresses("example.com".into()),
            Duration::from_secs(30),
            lookup,
        );
        resolution.start();
        resolution.cancel();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(deliveries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn should_abort_on_cancel_even_when_lookup_is_already_ready() {
        let lookup = MockLookup::new();
        lookup.add_addresses("example.com", vec![IpAddr::from([1, 1, 1, 1])]);

        let (resolution, _rx, deliveries) = resolution_with_probe(
            ResolveQuery::Addresses("example.com".into()),
            Duration::from_secs(3),
            lookup,
        );
        // Cancel in the same tick as start: the spawned task has not yet
        // polled, and the cancel must still find its handle.
        resolution.start();
        resolution.cancel();

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(deliveries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_ignore_cancel_before_start() {
        let (resolution, _rx, deliveries) = resolution_with_probe(
            ResolveQuery::Addresses("example.com".into()),
            Duration::from_secs(3),
            MockLookup::new(),
        );
        resolution.cancel();
        assert_eq!(deliveries.load(Ordering::SeqCst), 0);
    }
}
