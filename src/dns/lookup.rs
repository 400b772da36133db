//! Host lookup trait and implementations.
//!
//! Provides abstraction over name resolution to enable:
//! - Testing with mock lookups
//! - Different resolution backends

use std::future::Future;
use std::net::IpAddr;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};

use crate::error::DnsError;

/// Trait for forward and reverse host resolution.
pub trait HostLookup: Send + Sync + Clone + 'static {
    /// Resolve a host name to its addresses. An empty result set is not an
    /// error; it means the name exists but carries no usable records.
    fn addresses(&self, host: &str) -> impl Future<Output = Result<Vec<IpAddr>, DnsError>> + Send;

    /// Resolve an address back to its host names.
    fn names(&self, address: IpAddr) -> impl Future<Output = Result<Vec<String>, DnsError>> + Send;
}

/// Production lookup backed by the system resolver configuration.
#[derive(Clone)]
pub struct SystemLookup {
    resolver: TokioAsyncResolver,
}

impl SystemLookup {
    /// Build a lookup from `/etc/resolv.conf`, falling back to the default
    /// public configuration when the system one cannot be read.
    pub fn new() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|_| {
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

impl Default for SystemLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLookup for SystemLookup {
    async fn addresses(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
        let lookup = self
            .resolver
            .lookup_ip(host)
            .await
            .map_err(|err| DnsError::Stream(err.to_string()))?;
        Ok(lookup.iter().collect())
    }

    async fn names(&self, address: IpAddr) -> Result<Vec<String>, DnsError> {
        let lookup = self
            .resolver
            .reverse_lookup(address)
            .await
            .map_err(|err| DnsError::Stream(err.to_string()))?;
        Ok(lookup.iter().map(|ptr| ptr.0.to_utf8()).collect())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;

    /// Mock lookup for testing.
    ///
    /// Responses are pre-configured per name/address; an optional artificial
    /// delay lets timeout races be scripted under paused time.
    #[derive(Clone, Default)]
    pub struct MockLookup {
        addresses: Arc<Mutex<HashMap<String, Vec<IpAddr>>>>,
        names: Arc<Mutex<HashMap<IpAddr, Vec<String>>>>,
        error: Arc<Mutex<Option<DnsError>>>,
        delay: Arc<Mutex<Option<Duration>>>,
        calls: Arc<AtomicU64>,
    }

    impl MockLookup {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn add_addresses(&self, host: &str, addresses: Vec<IpAddr>) {
            self.addresses.lock().insert(host.to_string(), addresses);
        }

        pub fn add_names(&self, address: IpAddr, names: Vec<String>) {
            self.names.lock().insert(address, names);
        }

        pub fn set_error(&self, error: DnsError) {
            *self.error.lock() = Some(error);
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock() = Some(delay);
        }

        pub fn call_count(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }

        async fn pause(&self) {
            let delay = *self.delay.lock();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
        }
    }

    impl HostLookup for MockLookup {
        async fn addresses(&self, host: &str) -> Result<Vec<IpAddr>, DnsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            if let Some(error) = self.error.lock().clone() {
                return Err(error);
            }
            Ok(self.addresses.lock().get(host).cloned().unwrap_or_default())
        }

        async fn names(&self, address: IpAddr) -> Result<Vec<String>, DnsError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            if let Some(error) = self.error.lock().clone() {
                return Err(error);
            }
            Ok(self.names.lock().get(&address).cloned().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_mock_lookup_returns_configured_addresses() {
        let lookup = MockLookup::new();
        lookup.add_addresses("example.com", vec![IpAddr::from([93, 184, 216, 34])]);

        let addresses = lookup.addresses("example.com").await.unwrap();
        assert_eq!(addresses, vec![IpAddr::from([93, 184, 216, 34])]);
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_lookup_unconfigured_host_is_empty() {
        let lookup = MockLookup::new();
        assert!(lookup.addresses("nowhere.invalid").await.unwrap().is_empty());
    }
}
