pub mod flags;
pub mod monitor;
pub mod source;

pub use flags::{classify, parse_vpn, NetworkType, ReachabilityFlags};
pub use monitor::{ListenerToken, ReachabilityMonitor};
pub use source::{
    InterfaceProbeSource, LinkState, NoRadio, RadioTechnology, ReachabilitySource,
    ReachabilityTarget,
};
