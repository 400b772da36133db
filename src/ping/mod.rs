pub mod pinger;
pub mod probe;
pub mod session;
pub mod task;

pub use pinger::Pinger;
pub use probe::{PingProbe, PingStatistics};
pub use session::{PingTarget, SessionState};
pub use task::{PingOptions, PingTask};
