//! Connectivity flags and their mapping to a coarse network type.
//!
//! Classification is a pure function over flags and the current radio
//! technology so it can be tested without touching the operating system.

use std::fmt;

bitflags::bitflags! {
    /// Snapshot of the host's connectivity state.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ReachabilityFlags: u32 {
        /// Some route to the outside exists.
        const REACHABLE = 1 << 0;
        /// The route goes through a tunnel or other transient link.
        const TRANSIENT_CONNECTION = 1 << 1;
        /// A connection must be established before traffic can flow.
        const CONNECTION_REQUIRED = 1 << 2;
        /// The route goes over a cellular interface.
        const IS_WWAN = 1 << 3;
    }
}

impl Default for ReachabilityFlags {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkType {
    /// Connectivity could not be determined.
    Unknown,
    NoNetwork,
    Wifi,
    /// Cellular, tagged with the generation reported by the radio.
    Wwan(String),
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::NoNetwork => write!(f, "no network"),
            Self::Wifi => write!(f, "wifi"),
            Self::Wwan(generation) => write!(f, "wwan ({generation})"),
        }
    }
}

/// Map a radio access technology name to a cellular generation.
fn generation(technology: &str) -> &'static str {
    match technology {
        "LTE" => "4G",
        "WCDMA" | "HSDPA" | "HSUPA" | "CDMAEVDORev0" | "CDMAEVDORevA" | "CDMAEVDORevB"
        | "eHRPD" => "3G",
        "GPRS" | "EDGE" | "CDMA1x" => "2G",
        _ => "unknown",
    }
}

/// Derive the network type from reachability flags and, when the link is
/// cellular, the radio technology in use. A WWAN flag with no radio report
/// yields `Unknown` rather than a guess.
pub fn classify(flags: ReachabilityFlags, radio: Option<&str>) -> NetworkType {
    if flags.contains(ReachabilityFlags::IS_WWAN) {
        return match radio {
            Some(technology) => NetworkType::Wwan(generation(technology).to_string()),
            None => NetworkType::Unknown,
        };
    }
    if flags.contains(ReachabilityFlags::REACHABLE) {
        return NetworkType::Wifi;
    }
    NetworkType::NoNetwork
}

/// A transient connection that is not itself reachable is how a VPN tunnel
/// presents before it is established.
pub fn parse_vpn(flags: ReachabilityFlags) -> bool {
    flags.contains(ReachabilityFlags::TRANSIENT_CONNECTION)
        && !flags.contains(ReachabilityFlags::REACHABLE)
}
