//! Probe records and aggregate statistics.

use std::net::IpAddr;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::PingError;

/// One finished ICMP exchange attempt. Immutable once created.
#[derive(Debug, Clone)]
pub struct PingProbe {
    /// Sequence number, wrapping at 16 bits across a task's sessions.
    pub sequence: u16,
    /// When the probe started.
    pub sent_at: Instant,
    /// When the matching reply arrived, if it did.
    pub received_at: Option<Instant>,
    /// Why the probe failed, if it did.
    pub failure: Option<PingError>,
    /// On-the-wire size of the reply, zero on failure.
    pub packet_size: usize,
    /// The resolved destination, once known.
    pub address: Option<IpAddr>,
}

impl PingProbe {
    pub fn is_success(&self) -> bool {
        self.failure.is_none() && self.received_at.is_some()
    }

    /// Round-trip time, rounded to microsecond precision.
    pub fn rtt(&self) -> Option<Duration> {
        if self.failure.is_some() {
            return None;
        }
        self.received_at
            .map(|received| round_to_micros(received - self.sent_at))
    }
}

fn round_to_micros(duration: Duration) -> Duration {
    Duration::from_micros(duration.as_micros() as u64)
}

/// Aggregate statistics over a task's probe history.
///
/// Always recomputed from the full history rather than maintained as running
/// state, so long-lived tasks cannot accumulate drift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PingStatistics {
    pub transmitted: u64,
    pub received: u64,
    pub min_rtt: Duration,
    pub avg_rtt: Duration,
    pub max_rtt: Duration,
}

impl PingStatistics {
    pub fn from_probes(probes: &[PingProbe]) -> Self {
        let mut received: u64 = 0;
        let mut min_rtt: Option<Duration> = None;
        let mut max_rtt = Duration::ZERO;
        let mut total_rtt = Duration::ZERO;

        for rtt in probes.iter().filter_map(PingProbe::rtt) {
            received += 1;
            min_rtt = Some(min_rtt.map_or(rtt, |min| min.min(rtt)));
            max_rtt = max_rtt.max(rtt);
            total_rtt += rtt;
        }

        let avg_rtt = if received == 0 {
            Duration::ZERO
        } else {
            total_rtt / received as u32
        };

        Self {
            transmitted: probes.len() as u64,
            received,
            min_rtt: min_rtt.unwrap_or(Duration::ZERO),
            avg_rtt,
            max_rtt,
        }
    }

    /// Fraction of probes lost, in [0, 1].
    pub fn loss(&self) -> f64 {
        if self.transmitted == 0 {
            return 0.0;
        }
        1.0 - self.received as f64 / self.transmitted as f64
    }
}
