//! Per-interface byte counters.
//!
//! Counters are cumulative since boot; callers diff successive samples to get
//! rates. The reader never errors on partial data, a half-readable counter
//! table still yields whatever parsed.

use std::collections::HashMap;
use std::path::PathBuf;

use tracing::warn;

/// Raw counter line for one interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterRecord {
    pub interface: String,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Seam over the kernel's counter table.
pub trait CounterSource: Send + Sync {
    fn counters(&self) -> Vec<CounterRecord>;
}

/// Reads `/proc/net/dev`. Unreadable file or malformed lines degrade to an
/// empty or partial record set.
pub struct ProcNetDev {
    path: PathBuf,
}

impl ProcNetDev {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcNetDev {
    fn default() -> Self {
        Self::new("/proc/net/dev")
    }
}

impl CounterSource for ProcNetDev {
    fn counters(&self) -> Vec<CounterRecord> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => parse_proc_net_dev(&content),
            Err(error) => {
                warn!(path = %self.path.display(), %error, "unable to read counters");
                Vec::new()
            }
        }
    }
}

/// Parse the two-header-line `/proc/net/dev` format. Each data line is
/// `name: rx_bytes rx_packets ... tx_bytes ...` with tx_bytes at field 8.
fn parse_proc_net_dev(content: &str) -> Vec<CounterRecord> {
    content
        .lines()
        .skip(2)
        .filter_map(|line| {
            let (name, fields) = line.split_once(':')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            let fields: Vec<&str> = fields.split_whitespace().collect();
            if fields.len() < 16 {
                return None;
            }
            let rx_bytes = fields[0].parse().ok()?;
            let tx_bytes = fields[8].parse().ok()?;
            Some(CounterRecord {
                interface: name.to_string(),
                rx_bytes,
                tx_bytes,
            })
        })
        .collect()
}

/// Counters for one interface within a [`TrafficSample`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InterfaceTraffic {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

pub type TrafficSample = HashMap<String, InterfaceTraffic>;

/// Snapshots cumulative traffic per interface from a [`CounterSource`].
pub struct TrafficSampler<S = ProcNetDev> {
    source: S,
}

impl TrafficSampler<ProcNetDev> {
    pub fn new() -> Self {
        Self::with_source(ProcNetDev::default())
    }
}

impl Default for TrafficSampler<ProcNetDev> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: CounterSource> TrafficSampler<S> {
    pub fn with_source(source: S) -> Self {
        Self { source }
    }

    pub fn summary(&self) -> TrafficSample {
        let mut sample = TrafficSample::new();
        for record in self.source.counters() {
            let entry = sample.entry(record.interface).or_default();
            entry.rx_bytes = entry.rx_bytes.saturating_add(record.rx_bytes);
            entry.tx_bytes = entry.tx_bytes.saturating_add(record.tx_bytes);
        }
        sample
    }
}
