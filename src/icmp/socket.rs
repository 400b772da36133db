//! ICMP transport abstraction.
//!
//! Provides a trait-based abstraction over the raw ICMP socket to enable:
//! - Testing without network access or elevated privileges
//! - Different socket backends
//!
//! The production implementation uses a datagram ICMP socket, which on Linux
//! works without `CAP_NET_RAW` when `net.ipv4.ping_group_range` allows it.

use std::future::Future;
use std::io;
use std::net::{IpAddr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Receive buffer size for inbound ICMP messages.
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Trait for sending and receiving ICMP messages.
pub trait IcmpTransport: Send {
    /// Send one ICMP message to the target address.
    fn send_to(&mut self, packet: &[u8], target: IpAddr)
    -> impl Future<Output = io::Result<()>> + Send;

    /// Receive the next inbound ICMP message into `buf`, returning its length.
    fn recv(&mut self, buf: &mut [u8]) -> impl Future<Output = io::Result<usize>> + Send;
}

/// Trait for opening a transport toward a resolved target address.
///
/// Each ping session opens its own transport, mirroring the one-socket-per-
/// exchange lifecycle, so the factory is shared and the transports are not.
pub trait TransportFactory: Send + Sync + Clone + 'static {
    type Transport: IcmpTransport + 'static;

    fn open(&self, target: IpAddr) -> impl Future<Output = io::Result<Self::Transport>> + Send;
}

/// Production ICMP transport over a kernel datagram ICMP socket.
pub struct IcmpSocket {
    socket: UdpSocket,
}

impl IcmpSocket {
    /// Open a nonblocking ICMP socket for the target's address family and
    /// register it with the tokio reactor.
    pub fn open(target: IpAddr) -> io::Result<Self> {
        let (domain, protocol) = match target {
            IpAddr::V4(_) => (Domain::IPV4, Protocol::ICMPV4),
            IpAddr::V6(_) => (Domain::IPV6, Protocol::ICMPV6),
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(protocol))?;
        socket.set_nonblocking(true)?;

        let socket = UdpSocket::from_std(socket.into())?;
        Ok(Self { socket })
    }
}

impl IcmpTransport for IcmpSocket {
    async fn send_to(&mut self, packet: &[u8], target: IpAddr) -> io::Result<()> {
        self.socket
            .send_to(packet, SocketAddr::new(target, 0))
            .await
            .map(|_| ())
    }

    async fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (len, _addr) = self.socket.recv_from(buf).await?;
        Ok(len)
    }
}

/// Factory producing [`IcmpSocket`] transports.
#[derive(Clone, Copy, Debug, Default)]
pub struct SocketFactory;

impl TransportFactory for SocketFactory {
    type Transport = IcmpSocket;

    async fn open(&self, target: IpAddr) -> io::Result<IcmpSocket> {
        IcmpSocket::open(target)
    }
}
