//! Netdiag - client-side network diagnostics.
//!
//! Netdiag answers the questions a connectivity report needs: can we reach a
//! host and how fast (ICMP ping), what kind of network are we on and when
//! does that change (reachability), what does a name resolve to (DNS), and
//! how much traffic has each interface moved (counters).
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`]: Configuration loading and validation
//! - [`icmp`]: Echo request/reply codec and the raw-socket transport
//! - [`ping`]: Single probe sessions, repeating tasks, and statistics
//! - [`reachability`]: Connectivity flags, classification, and change listeners
//! - [`dns`]: Forward and reverse resolution with one-shot delivery
//! - [`traffic`]: Interface enumeration and byte counters
//! - [`error`]: Error types
//!
//! # Testing
//!
//! Every OS-facing component sits behind a trait so the interesting logic
//! runs against mocks:
//!
//! ```rust
//! use netdiag::reachability::{classify, NetworkType, ReachabilityFlags};
//!
//! let flags = ReachabilityFlags::REACHABLE | ReachabilityFlags::IS_WWAN;
//! assert_eq!(classify(flags, Some("LTE")), NetworkType::Wwan("4G".into()));
//! ```

pub mod config;
pub mod dns;
pub mod error;
pub mod icmp;
pub mod ping;
pub mod reachability;
pub mod traffic;
