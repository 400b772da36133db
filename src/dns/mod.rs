//! Asynchronous host resolution.

pub mod lookup;
pub mod resolution;
pub mod resolver;

pub use lookup::{HostLookup, SystemLookup};
pub use resolution::{DnsResolution, DnsResolutionResult, ResolveQuery};
pub use resolver::Resolver;
