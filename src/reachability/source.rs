//! Where reachability flags come from.
//!
//! The monitor only sees the [`ReachabilitySource`] seam. The production
//! source synthesizes flags from the kernel's interface table since Linux
//! exposes no single reachability query; tests substitute a scripted source.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::config::ReachabilityConfig;
use crate::reachability::flags::ReachabilityFlags;

/// Interface name prefixes that indicate a cellular link.
const WWAN_NAME_PREFIXES: &[&str] = &["wwan", "rmnet", "pdp_ip", "ccmni"];

/// What the reachability question is asked about: any route at all, or a
/// specific host or address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ReachabilityTarget {
    #[default]
    Any,
    Host(String),
    Address(std::net::IpAddr),
}

impl ReachabilityTarget {
    pub fn from_config(config: &ReachabilityConfig) -> Self {
        match &config.host {
            None => Self::Any,
            Some(host) => match host.parse() {
                Ok(address) => Self::Address(address),
                Err(_) => Self::Host(host.clone()),
            },
        }
    }
}

impl std::fmt::Display for ReachabilityTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => f.write_str("any route"),
            Self::Host(host) => host.fmt(f),
            Self::Address(address) => address.fmt(f),
        }
    }
}

/// Reports the current radio access technology when the link is cellular.
pub trait RadioTechnology: Send + Sync + Clone + 'static {
    fn current(&self) -> Option<String>;
}

/// Hosts without a cellular modem report nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoRadio;

impl RadioTechnology for NoRadio {
    fn current(&self) -> Option<String> {
        None
    }
}

/// Seam over the operating system's view of connectivity.
pub trait ReachabilitySource: Send + Sync + 'static {
    /// One-shot snapshot; `None` when the state cannot be read.
    fn current_flags(&self) -> Option<ReachabilityFlags>;
    /// Subscribe to subsequent flag changes.
    fn watch(&self) -> watch::Receiver<ReachabilityFlags>;
}

/// What the flag synthesis needs to know about one interface.
#[derive(Clone, Debug)]
pub struct LinkState {
    pub up: bool,
    pub loopback: bool,
    pub has_address: bool,
    pub wwan: bool,
}

/// Fold the interface table into reachability flags. Reachable means any up,
/// non-loopback interface holding an address; cellular when the first such
/// interface carries a WWAN-style name.
pub fn synthesize_flags(links: &[LinkState]) -> ReachabilityFlags {
    let candidate = links
        .iter()
        .find(|link| link.up && !link.loopback && link.has_address);
    match candidate {
        Some(link) if link.wwan => ReachabilityFlags::REACHABLE | ReachabilityFlags::IS_WWAN,
        Some(_) => ReachabilityFlags::REACHABLE,
        None => ReachabilityFlags::empty(),
    }
}

pub(crate) fn is_wwan_name(name: &str) -> bool {
    WWAN_NAME_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

fn read_links() -> Vec<LinkState> {
    pnet::datalink::interfaces()
        .into_iter()
        .map(|interface| LinkState {
            up: interface.is_up(),
            loopback: interface.is_loopback(),
            has_address: !interface.ips.is_empty(),
            wwan: is_wwan_name(&interface.name),
        })
        .collect()
}

/// Production source: polls the interface table on a fixed cadence and
/// publishes flag changes through a watch channel. The poll task starts
/// lazily on the first [`watch`](ReachabilitySource::watch) call.
///
/// The interface table cannot answer per-host questions, so a host or
/// address target degrades to the any-route answer; the target is kept for
/// log context.
pub struct InterfaceProbeSource {
    target: ReachabilityTarget,
    poll_interval: Duration,
    tx: watch::Sender<ReachabilityFlags>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl InterfaceProbeSource {
    pub fn new(target: ReachabilityTarget, poll_interval: Duration) -> Arc<Self> {
        let (tx, _rx) = watch::channel(ReachabilityFlags::empty());
        Arc::new(Self {
            target,
            poll_interval,
            tx,
            task: Mutex::new(None),
        })
    }

    pub fn target(&self) -> &ReachabilityTarget {
        &self.target
    }

    fn ensure_polling(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }
        let tx = self.tx.clone();
        let target = self.target.clone();
        let interval = self.poll_interval;
        *task = Some(tokio::spawn(async move {
            loop {
                let flags = synthesize_flags(&read_links());
                trace!(%target, ?flags, "interface poll");
                // send_replace keeps publishing even with no subscriber yet.
                tx.send_replace(flags);
                tokio::time::sleep(interval).await;
            }
        }));
    }
}

impl ReachabilitySource for Arc<InterfaceProbeSource> {
    fn current_flags(&self) -> Option<ReachabilityFlags> {
        Some(synthesize_flags(&read_links()))
    }

    fn watch(&self) -> watch::Receiver<ReachabilityFlags> {
        self.ensure_polling();
        self.tx.subscribe()
    }
}

impl Drop for InterfaceProbeSource {
    fn drop(&mut self) {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    /// Scripted source for monitor tests. `set_flags` publishes a new value;
    /// duplicates are re-sent on purpose so dedup can be exercised downstream.
    #[derive(Clone)]
    pub struct MockSource {
        inner: Arc<MockSourceInner>,
    }

    struct MockSourceInner {
        tx: watch::Sender<ReachabilityFlags>,
        current: Mutex<Option<ReachabilityFlags>>,
    }

    impl MockSource {
        pub fn new(initial: Option<ReachabilityFlags>) -> Self {
            let (tx, _rx) = watch::channel(initial.unwrap_or_default());
            Self {
                inner: Arc::new(MockSourceInner {
                    tx,
                    current: Mutex::new(initial),
                }),
            }
        }

        pub fn set_flags(&self, flags: ReachabilityFlags) {
            *self.inner.current.lock() = Some(flags);
            self.inner.tx.send_replace(flags);
        }
    }

    impl ReachabilitySource for MockSource {
        fn current_flags(&self) -> Option<ReachabilityFlags> {
            *self.inner.current.lock()
        }

        fn watch(&self) -> watch::Receiver<ReachabilityFlags> {
            self.inner.tx.subscribe()
        }
    }

    /// Fixed radio report for classification through the monitor.
    #[derive(Clone, Default)]
    pub struct FixedRadio(pub Option<String>);

    impl RadioTechnology for FixedRadio {
        fn current(&self) -> Option<String> {
            self.0.clone()
        }
    }

    #[test]
    fn test_synthesize_flags_empty_table() {
        assert_eq!(synthesize_flags(&[]), ReachabilityFlags::empty());
    }

    #[test]
    fn test_synthesize_flags_loopback_only_is_unreachable() {
        let links = [LinkState {
            up: true,
            loopback: true,
            has_address: true,
            wwan: false,
        }];
        assert_eq!(synthesize_flags(&links), ReachabilityFlags::empty());
    }

    #[test]
    fn test_synthesize_flags_up_interface_with_address_is_reachable() {
        let links = [
            LinkState {
                up: true,
                loopback: true,
                has_address: true,
                wwan: false,
            },
            LinkState {
                up: true,
                loopback: false,
                has_address: true,
                wwan: false,
            },
        ];
        assert_eq!(synthesize_flags(&links), ReachabilityFlags::REACHABLE);
    }

    #[test]
    fn test_synthesize_flags_down_or_addressless_does_not_count() {
        let links = [
            LinkState {
                up: false,
                loopback: false,
                has_address: true,
                wwan: false,
            },
            LinkState {
                up: true,
                loopback: false,
                has_address: false,
                wwan: false,
            },
        ];
        assert_eq!(synthesize_flags(&links), ReachabilityFlags::empty());
    }

    #[test]
    fn test_synthesize_flags_cellular_interface_sets_wwan() {
        let links = [LinkState {
            up: true,
            loopback: false,
            has_address: true,
            wwan: true,
        }];
        assert_eq!(
            synthesize_flags(&links),
            ReachabilityFlags::REACHABLE | ReachabilityFlags::IS_WWAN
        );
    }

    #[test]
    fn test_target_from_config() {
        let mut config = ReachabilityConfig::default();
        assert_eq!(
            ReachabilityTarget::from_config(&config),
            ReachabilityTarget::Any
        );

        config.host = Some(String::from("one.one.one.one"));
        assert_eq!(
            ReachabilityTarget::from_config(&config),
            ReachabilityTarget::Host(String::from("one.one.one.one"))
        );

        config.host = Some(String::from("1.1.1.1"));
        assert_eq!(
            ReachabilityTarget::from_config(&config),
            ReachabilityTarget::Address(std::net::IpAddr::from([1, 1, 1, 1]))
        );
    }

    #[test]
    fn test_wwan_name_prefixes() {
        assert!(is_wwan_name("wwan0"));
        assert!(is_wwan_name("rmnet_data0"));
        assert!(is_wwan_name("pdp_ip0"));
        assert!(is_wwan_name("ccmni1"));
        assert!(!is_wwan_name("eth0"));
        assert!(!is_wwan_name("wlan0"));
    }
}
