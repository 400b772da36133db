//! Resolver façade.
//!
//! Hands out [`DnsResolution`]s configured with the façade's lookup backend
//! and timeout. Each resolution is independent; the façade keeps no state.

use std::net::IpAddr;
use std::time::Duration;

use crate::config::DnsConfig;
use crate::dns::lookup::{HostLookup, SystemLookup};
use crate::dns::resolution::{DnsResolution, DnsResolutionResult, ResolveQuery};

pub struct Resolver<L: HostLookup> {
    lookup: L,
    timeout: Duration,
}

impl Resolver<SystemLookup> {
    /// Resolver over the system lookup backend.
    pub fn new(config: &DnsConfig) -> Self {
        Self::with_lookup(SystemLookup::new(), config.timeout())
    }
}

impl<L: HostLookup> Resolver<L> {
    pub fn with_lookup(lookup: L, timeout: Duration) -> Self {
        Self { lookup, timeout }
    }

    /// Resolve a host name to an address. The returned resolution must be
    /// `start()`ed; the handler receives exactly one result.
    pub fn resolve_host(
        &self,
        host: impl Into<String>,
        handler: impl FnOnce(DnsResolutionResult) + Send + 'static,
    ) -> DnsResolution<L> {
        DnsResolution::new(
            ResolveQuery::Addresses(host.into()),
            self.timeout,
            self.lookup.clone(),
            Box::new(handler),
        )
    }

    /// Translate an address back into a host name.
    pub fn resolve_address(
        &self,
        address: IpAddr,
        handler: impl FnOnce(DnsResolutionResult) + Send + 'static,
    ) -> DnsResolution<L> {
        DnsResolution::new(
            ResolveQuery::Names(address),
            self.timeout,
            self.lookup.clone(),
            Box::new(handler),
        )
    }
}
