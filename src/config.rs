//! Configuration loading and validation.
//!
//! Every diagnostic façade takes its section of this config explicitly;
//! there is no process-wide mutable state. `Config::default()` is the
//! convenience instance for callers that do not need a file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{ConfigError, Result};

/// Upper bound on the ICMP payload carried by a probe. Anything close to the
/// MTU is pointless for diagnostics and risks fragmentation.
pub const MAX_PAYLOAD_SIZE: usize = 1024;

/// Main configuration for the netdiag toolkit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub ping: PingConfig,

    #[serde(default)]
    pub dns: DnsConfig,

    #[serde(default)]
    pub reachability: ReachabilityConfig,
}

/// Settings for the ping engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PingConfig {
    /// Target host name or literal address.
    #[serde(default = "default_ping_host")]
    pub host: String,

    /// Per-probe timeout in seconds.
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: f64,

    /// Delay between a session's completion and the next probe, in seconds.
    /// Zero means flood mode: probes are issued back-to-back.
    #[serde(default = "default_ping_interval")]
    pub interval_secs: f64,

    /// Number of probes to send before the task stops itself.
    /// Absent means unbounded.
    #[serde(default)]
    pub count: Option<u64>,

    /// ICMP payload size in bytes.
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,
}

impl Default for PingConfig {
    fn default() -> Self {
        Self {
            host: default_ping_host(),
            timeout_secs: default_probe_timeout(),
            interval_secs: default_ping_interval(),
            count: None,
            payload_size: default_payload_size(),
        }
    }
}

impl PingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs.max(0.0))
    }
}

/// Settings for asynchronous host resolution.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DnsConfig {
    /// Resolution timeout in seconds.
    #[serde(default = "default_dns_timeout")]
    pub timeout_secs: f64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_dns_timeout(),
        }
    }
}

impl DnsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

/// Settings for the reachability monitor.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReachabilityConfig {
    /// Host whose reachability to track. Absent means the wildcard
    /// "any route" target.
    #[serde(default)]
    pub host: Option<String>,

    /// Interval between interface-table probes, in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: f64,
}

impl Default for ReachabilityConfig {
    fn default() -> Self {
        Self {
            host: None,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ReachabilityConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }
}

fn default_ping_host() -> String {
    "1.1.1.1".to_string()
}

const fn default_probe_timeout() -> f64 {
    1.0
}

const fn default_ping_interval() -> f64 {
    1.0
}

const fn default_payload_size() -> usize {
    56
}

const fn default_dns_timeout() -> f64 {
    3.0
}

const fn default_poll_interval() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.ping.host.is_empty() {
            return Err(ConfigError::Validation("ping.host cannot be empty".into()).into());
        }

        if self.ping.timeout_secs <= 0.0 {
            return Err(ConfigError::Validation("ping.timeout_secs must be > 0".into()).into());
        }

        if self.ping.interval_secs < 0.0 {
            return Err(ConfigError::Validation("ping.interval_secs must be >= 0".into()).into());
        }

        if self.ping.payload_size > MAX_PAYLOAD_SIZE {
            return Err(ConfigError::Validation(format!(
                "ping.payload_size must be <= {MAX_PAYLOAD_SIZE}"
            ))
            .into());
        }

        if self.dns.timeout_secs <= 0.0 {
            return Err(ConfigError::Validation("dns.timeout_secs must be > 0".into()).into());
        }

        if self.reachability.poll_interval_secs <= 0.0 {
            return Err(ConfigError::Validation(
                "reachability.poll_interval_secs must be > 0".into(),
            )
            .into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let toml = r#"
            [ping]
            host = "example.com"
            timeout_secs = 2.0
            count = 4

            [dns]
            timeout_secs = 1.5
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.ping.host, "example.com");
        assert_eq!(config.ping.timeout(), Duration::from_secs(2));
        assert_eq!(config.ping.count, Some(4));
        assert_eq!(config.dns.timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_default_values() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.ping.host, "1.1.1.1");
        assert_eq!(config.ping.timeout(), Duration::from_secs(1));
        assert_eq!(config.ping.interval(), Duration::from_secs(1));
        assert!(config.ping.count.is_none());
        assert_eq!(config.ping.payload_size, 56);
        assert_eq!(config.dns.timeout(), Duration::from_secs(3));
        assert_eq!(config.reachability.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_flood_interval_accepted() {
        let toml = r#"
            [ping]
            interval_secs = 0.0
        "#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.ping.interval(), Duration::ZERO);
    }

    #[test]
    fn test_zero_probe_timeout_rejected() {
        let toml = r#"
            [ping]
            timeout_secs = 0.0
        "#;

        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let toml = r#"
            [ping]
            payload_size = 65000
        "#;

        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn test_empty_host_rejected() {
        let toml = r#"
            [ping]
            host = ""
        "#;

        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            unknown_field = "value"
        "#;

        assert!(Config::parse(toml).is_err());
    }

    #[test]
    fn test_zero_dns_timeout_rejected() {
        let toml = r#"
            [dns]
            timeout_secs = 0.0
        "#;

        assert!(Config::parse(toml).is_err());
    }
}
