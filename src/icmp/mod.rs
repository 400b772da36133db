//! ICMP wire format and transport.

pub mod codec;
pub mod socket;

pub use codec::{EchoReply, decode_echo_reply, default_payload, encode_echo_request};
pub use socket::{IcmpSocket, IcmpTransport, SocketFactory, TransportFactory};
