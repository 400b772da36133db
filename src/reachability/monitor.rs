//! Listener fan-out for connectivity changes.
//!
//! The monitor diffs flag snapshots against the previous one so listeners
//! only hear about actual transitions, and serializes each listener's
//! callback against its own unregistration: once `unregister` returns, that
//! callback will not run again.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::reachability::flags::{self, NetworkType, ReachabilityFlags};
use crate::reachability::source::{NoRadio, RadioTechnology, ReachabilitySource};

type ListenerCallback = Box<dyn Fn(NetworkType) + Send + Sync>;

struct ListenerEntry {
    active: AtomicBool,
    // Reentrant so a listener may unregister itself from inside its own
    // callback without deadlocking.
    call_guard: ReentrantMutex<()>,
    callback: ListenerCallback,
}

struct Registry {
    entries: Mutex<HashMap<u64, Arc<ListenerEntry>>>,
    next_id: AtomicU64,
    previous: Mutex<Option<ReachabilityFlags>>,
}

impl Registry {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            previous: Mutex::new(None),
        })
    }

    fn register(self: &Arc<Self>, callback: ListenerCallback) -> ListenerToken {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let entry = Arc::new(ListenerEntry {
            active: AtomicBool::new(true),
            call_guard: ReentrantMutex::new(()),
            callback,
        });
        self.entries.lock().insert(id, entry);
        ListenerToken {
            id,
            registry: Arc::downgrade(self),
            released: false,
        }
    }

    /// Diff against the previous snapshot and fan the classified type out to
    /// every active listener. Duplicate snapshots are dropped here, so a
    /// source that re-sends the same flags stays harmless.
    fn notify<R: RadioTechnology>(&self, current: ReachabilityFlags, radio: &R) {
        {
            let mut previous = self.previous.lock();
            if *previous == Some(current) {
                return;
            }
            *previous = Some(current);
        }

        let network_type = flags::classify(current, radio.current().as_deref());
        debug!(flags = ?current, %network_type, "reachability changed");
        self.fan_out(network_type);
    }

    /// Deliver one network type to every active listener. Leaves the
    /// baseline untouched.
    fn fan_out(&self, network_type: NetworkType) {
        // Snapshot the entries so a callback can mutate the registry.
        let entries: Vec<Arc<ListenerEntry>> = self.entries.lock().values().cloned().collect();
        for entry in entries {
            if !entry.active.load(Ordering::SeqCst) {
                continue;
            }
            let _guard = entry.call_guard.lock();
            if entry.active.load(Ordering::SeqCst) {
                (entry.callback)(network_type.clone());
            }
        }
    }
}

/// Handle to a registered listener. Dropping it unregisters, matching an
/// explicit [`unregister`](ListenerToken::unregister) call.
pub struct ListenerToken {
    id: u64,
    registry: Weak<Registry>,
    released: bool,
}

impl ListenerToken {
    pub fn unregister(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let entry = registry.entries.lock().remove(&self.id);
        if let Some(entry) = entry {
            // Wait out any in-flight callback before declaring the listener
            // gone. Reentrant, so self-unregistration from the callback's own
            // thread goes straight through.
            let _guard = entry.call_guard.lock();
            entry.active.store(false, Ordering::SeqCst);
        }
    }
}

impl Drop for ListenerToken {
    fn drop(&mut self) {
        self.release();
    }
}

/// Watches a [`ReachabilitySource`] and keeps listeners informed of network
/// type transitions.
pub struct ReachabilityMonitor<S, R = NoRadio> {
    source: S,
    radio: R,
    registry: Arc<Registry>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<S, R> ReachabilityMonitor<S, R>
where
    S: ReachabilitySource,
    R: RadioTechnology,
{
    pub fn new(source: S, radio: R) -> Self {
        Self {
            source,
            radio,
            registry: Registry::new(),
            task: Mutex::new(None),
        }
    }

    pub fn current_flags(&self) -> Option<ReachabilityFlags> {
        self.source.current_flags()
    }

    /// Classify the current state. An unreadable state is `Unknown`, never
    /// an error.
    pub fn network_type(&self) -> NetworkType {
        match self.source.current_flags() {
            Some(current) => flags::classify(current, self.radio.current().as_deref()),
            None => NetworkType::Unknown,
        }
    }

    pub fn register<C>(&self, callback: C) -> ListenerToken
    where
        C: Fn(NetworkType) + Send + Sync + 'static,
    {
        self.registry.register(Box::new(callback))
    }

    pub fn is_listening(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Begin delivering notifications. The first notification fires
    /// synchronously from here against an empty baseline, then a background
    /// task relays source changes. Calling this while already listening is a
    /// no-op, and a listener may call back into the monitor (including
    /// [`stop_listening`](Self::stop_listening)) from inside its callback.
    pub fn start_listening(&self) {
        let (ready_tx, ready_rx) = oneshot::channel::<()>();
        {
            let mut task = self.task.lock();
            if task.is_some() {
                return;
            }

            *self.registry.previous.lock() = None;
            let mut rx = self.source.watch();

            let registry = Arc::clone(&self.registry);
            let radio = self.radio.clone();
            *task = Some(tokio::spawn(async move {
                // Hold relayed changes back until the initial notification
                // below has been delivered.
                let _ = ready_rx.await;
                while rx.changed().await.is_ok() {
                    let current = *rx.borrow_and_update();
                    registry.notify(current, &radio);
                }
            }));
        }

        // The task lock is released at this point, so the initial callbacks
        // are free to re-enter the monitor. Unreadable flags surface as
        // Unknown and leave the baseline empty.
        match self.source.current_flags() {
            Some(initial) => self.registry.notify(initial, &self.radio),
            None => self.registry.fan_out(NetworkType::Unknown),
        }
        let _ = ready_tx.send(());
    }

    /// Stop delivering notifications. Registered tokens stay valid and go
    /// dormant until the next [`start_listening`](Self::start_listening).
    pub fn stop_listening(&self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

impl<S, R> Drop for ReachabilityMonitor<S, R> {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}
