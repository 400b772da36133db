//! One echo-request/reply exchange.
//!
//! A session is a small state machine: `Idle → Started → AddressResolved →
//! Sent → Finished`. It terminates on exactly one of: matching reply,
//! unexpected packet, send failure, resolution failure, or timeout; the
//! finalized probe is returned exactly once from [`PingSession::run`].

use std::net::IpAddr;
use std::time::Duration;

use tokio::time::Instant;

use crate::dns::lookup::HostLookup;
use crate::error::PingError;
use crate::icmp::codec;
use crate::icmp::socket::{IcmpTransport, RECV_BUFFER_SIZE, TransportFactory};
use crate::ping::probe::PingProbe;

/// Ping destination: a host name to resolve, or a literal address.
#[derive(Debug, Clone)]
pub enum PingTarget {
    Host(String),
    Address(IpAddr),
}

impl std::fmt::Display for PingTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Host(host) => host.fmt(f),
            Self::Address(address) => address.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Started,
    AddressResolved,
    Sent,
    Finished,
}

pub struct PingSession {
    state: SessionState,
    identifier: u16,
    timeout: Duration,
    payload: Vec<u8>,
}

impl PingSession {
    pub fn new(identifier: u16, timeout: Duration, payload: Vec<u8>) -> Self {
        Self {
            state: SessionState::Idle,
            identifier,
            timeout,
            payload,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the exchange to its terminal state and return the finalized
    /// probe. The timeout covers the whole exchange, resolution included.
    pub async fn run<L, F>(
        &mut self,
        lookup: &L,
        factory: &F,
        target: &PingTarget,
        sequence: u16,
    ) -> PingProbe
    where
        L: HostLookup,
        F: TransportFactory,
    {
        self.state = SessionState::Started;
        let sent_at = Instant::now();

        let timeout = self.timeout;
        let outcome =
            tokio::time::timeout(timeout, self.exchange(lookup, factory, target, sequence)).await;

        self.state = SessionState::Finished;

        match outcome {
            Ok(Ok((address, packet_size))) => PingProbe {
                sequence,
                sent_at,
                received_at: Some(Instant::now()),
                failure: None,
                packet_size,
                address: Some(address),
            },
            Ok(Err(failure)) => PingProbe {
                sequence,
                sent_at,
                received_at: None,
                failure: Some(failure),
                packet_size: 0,
                address: None,
            },
            Err(_) => PingProbe {
                sequence,
                sent_at,
                received_at: None,
                failure: Some(PingError::Timeout(sequence)),
                packet_size: 0,
                address: None,
            },
        }
    }

    async fn exchange<L, F>(
        &mut self,
        lookup: &L,
        factory: &F,
        target: &PingTarget,
        sequence: u16,
    ) -> Result<(IpAddr, usize), PingError>
    where
        L: HostLookup,
        F: TransportFactory,
    {
        let address = resolve_target(lookup, target).await?;
        self.state = SessionState::AddressResolved;

        let mut transport = factory
            .open(address)
            .await
            .map_err(|err| PingError::Server(err.to_string()))?;

        let packet = codec::encode_echo_request(self.identifier, sequence, Some(&self.payload));
        transport
            .send_to(&packet, address)
            .await
            .map_err(|err| PingError::SendPacket {
                sequence,
                message: err.to_string(),
            })?;
        self.state = SessionState::Sent;

        let mut buf = [0u8; RECV_BUFFER_SIZE];
        let len = transport
            .recv(&mut buf)
            .await
            .map_err(|err| PingError::Server(err.to_string()))?;

        // The first inbound packet decides the session: anything that is not
        // our reply for this sequence is an unexpected packet.
        match codec::decode_echo_reply(&buf[..len], self.identifier) {
            Ok(Some(reply)) if reply.sequence == sequence => Ok((address, reply.packet_size())),
            _ => Err(PingError::UnexpectedPacket),
        }
    }
}

async fn resolve_target<L: HostLookup>(
    lookup: &L,
    target: &PingTarget,
) -> Result<IpAddr, PingError> {
    let host = match target {
        PingTarget::Address(address) => return Ok(*address),
        PingTarget::Host(host) => host,
    };

    if let Ok(address) = host.parse::<IpAddr>() {
        return Ok(address);
    }

    let addresses = lookup
        .addresses(host)
        .await
        .map_err(|err| PingError::ResolveAddress {
            host: host.clone(),
            message: err.to_string(),
        })?;

    // The echo codec speaks ICMPv4; pick the first IPv4 address.
    addresses
        .iter()
        .find(|address| address.is_ipv4())
        .copied()
        .ok_or_else(|| PingError::ResolveAddress {
            host: host.clone(),
            message: "no IPv4 address in result set".into(),
        })
}
