//! Entry point for launching ping tasks.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::PingConfig;
use crate::dns::lookup::{HostLookup, SystemLookup};
use crate::icmp::socket::{SocketFactory, TransportFactory};
use crate::ping::probe::PingStatistics;
use crate::ping::session::PingTarget;
use crate::ping::task::{PingOptions, PingTask};

/// Hands out [`PingTask`]s and keeps track of the ones still running.
///
/// A task books itself out of the registry when it finishes, whether it ran
/// to its repeat count or was stopped by hand, so `active_count` reflects
/// live tasks only.
pub struct Pinger<L = SystemLookup, F = SocketFactory> {
    options: PingOptions,
    lookup: L,
    factory: F,
    tasks: Arc<Mutex<Vec<Arc<PingTask>>>>,
}

impl Pinger<SystemLookup, SocketFactory> {
    pub fn new(config: &PingConfig) -> Self {
        Self::with_parts(PingOptions::from(config), SystemLookup::new(), SocketFactory)
    }
}

impl<L, F> Pinger<L, F>
where
    L: HostLookup,
    F: TransportFactory,
{
    pub fn with_parts(options: PingOptions, lookup: L, factory: F) -> Self {
        Self {
            options,
            lookup,
            factory,
            tasks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Build and register a task. The caller still owns the decision of when
    /// the first probe goes out through [`PingTask::start`].
    pub fn task<C>(&self, target: PingTarget, completion: C) -> Arc<PingTask>
    where
        C: FnOnce(PingStatistics) + Send + 'static,
    {
        let id = PingTask::allocate_id();
        let identifier = std::process::id() as u16 ^ id as u16;

        let registry = Arc::clone(&self.tasks);
        let wrapped = Box::new(move |stats: PingStatistics| {
            registry.lock().retain(|task| task.id() != id);
            debug!(task = id, "ping task finished");
            completion(stats);
        });

        let task = Arc::new(PingTask::with_id(
            id,
            target,
            self.options.clone(),
            identifier,
            self.lookup.clone(),
            self.factory.clone(),
            wrapped,
        ));
        self.tasks.lock().push(Arc::clone(&task));
        task
    }

    pub fn active_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Stop every task still booked. Their completion handlers fire as usual.
    pub fn stop_all(&self) {
        let tasks: Vec<Arc<PingTask>> = self.tasks.lock().clone();
        for task in tasks {
            task.stop();
        }
    }
}
