//! Error types for the netdiag toolkit.

use std::io;

use thiserror::Error;

/// Main error type for netdiag operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("packet error: {0}")]
    Packet(#[from] PacketError),

    #[error("ping error: {0}")]
    Ping(#[from] PingError),

    #[error("DNS error: {0}")]
    Dns(#[from] DnsError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    ReadFile(#[source] io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),

    #[error("validation failed: {0}")]
    Validation(String),
}

/// Errors from decoding inbound ICMP packets.
///
/// Only genuinely malformed input is an error; a well-formed packet that is
/// not the reply we are waiting for decodes to `None` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("packet too short: {len} bytes")]
    Truncated { len: usize },

    #[error("invalid IPv4 header length: {ihl} words")]
    BadIpHeader { ihl: u8 },
}

/// Terminal failures for a single ping probe.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PingError {
    #[error("did receive unexpected packet")]
    UnexpectedPacket,

    #[error("cannot resolve {host}: {message}")]
    ResolveAddress { host: String, message: String },

    #[error("fail to send packet: icmp_seq={sequence} error={message}")]
    SendPacket { sequence: u16, message: String },

    #[error("server error: {0}")]
    Server(String),

    #[error("request timeout for icmp_seq {0}")]
    Timeout(u16),

    #[error("unknown error")]
    Unknown,
}

/// Terminal failures for a DNS resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnsError {
    #[error("stream error: {0}")]
    Stream(String),

    #[error("resolution timed out")]
    Timeout,

    #[error("unknown error")]
    Unknown,
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;
