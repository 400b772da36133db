//! ICMP echo packet construction and parsing.
//!
//! Builds echo requests with proper RFC 1071 checksums and decodes inbound
//! packets into "our reply" / "not ours" / "malformed". Pure transforms; no
//! sockets here.

use pnet::packet::Packet;
use pnet::packet::icmp::echo_reply::EchoReplyPacket;
use pnet::packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet::packet::icmp::{self, IcmpCode, IcmpPacket, IcmpType, IcmpTypes};

use crate::error::PacketError;

/// ICMP header size in bytes.
pub const ICMP_HEADER_SIZE: usize = 8;

/// Payload size used when the caller does not supply one, matching the
/// classic `ping` default of 64-byte messages.
pub const DEFAULT_PAYLOAD_SIZE: usize = 56;

/// A decoded echo reply that matched our identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoReply {
    pub identifier: u16,
    pub sequence: u16,
    pub payload: Vec<u8>,
}

impl EchoReply {
    /// Total on-the-wire size of the ICMP message.
    pub fn packet_size(&self) -> usize {
        ICMP_HEADER_SIZE + self.payload.len()
    }
}

/// Build an ICMP echo request for the given identifier and sequence number.
///
/// When `payload` is `None` a default-filled payload of
/// [`DEFAULT_PAYLOAD_SIZE`] bytes is used.
pub fn encode_echo_request(identifier: u16, sequence: u16, payload: Option<&[u8]>) -> Vec<u8> {
    match payload {
        Some(payload) => encode(IcmpTypes::EchoRequest, identifier, sequence, payload),
        None => {
            let filler = default_payload(DEFAULT_PAYLOAD_SIZE);
            encode(IcmpTypes::EchoRequest, identifier, sequence, &filler)
        }
    }
}

/// Build an ICMP echo reply. The ping engine never sends these; they exist
/// for loopback-style transports and tests that need well-formed replies.
pub fn encode_echo_reply(identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    encode(IcmpTypes::EchoReply, identifier, sequence, payload)
}

/// The incrementing byte pattern used to fill default payloads.
pub fn default_payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| i as u8).collect()
}

fn encode(icmp_type: IcmpType, identifier: u16, sequence: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; ICMP_HEADER_SIZE + payload.len()];

    {
        // The buffer is sized for the header, so packet creation cannot fail.
        let mut packet = MutableEchoRequestPacket::new(&mut buffer).unwrap();
        packet.set_icmp_type(icmp_type);
        packet.set_icmp_code(IcmpCode::new(0));
        packet.set_identifier(identifier);
        packet.set_sequence_number(sequence);
        packet.set_payload(payload);
    }

    let checksum = icmp::checksum(&IcmpPacket::new(&buffer).unwrap());

    {
        let mut packet = MutableEchoRequestPacket::new(&mut buffer).unwrap();
        packet.set_checksum(checksum);
    }

    buffer
}

/// Decode an inbound packet as an echo reply matching `identifier`.
///
/// Raw ICMP sockets deliver the IPv4 header in front of the ICMP message;
/// datagram ICMP sockets do not. Both layouts are accepted.
///
/// Returns `Ok(Some)` for a matching reply, `Ok(None)` for a well-formed
/// packet that is not our reply (wrong type, wrong identifier, or a failed
/// checksum), and `Err` for input too short to interpret.
pub fn decode_echo_reply(
    buf: &[u8],
    identifier: u16,
) -> Result<Option<EchoReply>, PacketError> {
    let message = strip_ip_header(buf)?;

    let Some(packet) = IcmpPacket::new(message) else {
        return Err(PacketError::Truncated { len: message.len() });
    };

    if packet.get_icmp_type() != IcmpTypes::EchoReply || packet.get_icmp_code() != IcmpCode::new(0)
    {
        return Ok(None);
    }

    // A checksum mismatch is an unexpected packet, not a decode error.
    if icmp::checksum(&packet) != packet.get_checksum() {
        return Ok(None);
    }

    let Some(reply) = EchoReplyPacket::new(message) else {
        return Err(PacketError::Truncated { len: message.len() });
    };

    if reply.get_identifier() != identifier {
        return Ok(None);
    }

    Ok(Some(EchoReply {
        identifier,
        sequence: reply.get_sequence_number(),
        payload: reply.payload().to_vec(),
    }))
}

/// Skip a leading IPv4 header if one is present, validating lengths before
/// trusting any of its fields.
fn strip_ip_header(buf: &[u8]) -> Result<&[u8], PacketError> {
    if buf.len() < ICMP_HEADER_SIZE {
        return Err(PacketError::Truncated { len: buf.len() });
    }

    // ICMP type bytes (0 and 8) never carry a 4 in the version nibble.
    if buf[0] >> 4 != 4 {
        return Ok(buf);
    }

    let ihl = buf[0] & 0x0f;
    if ihl < 5 {
        return Err(PacketError::BadIpHeader { ihl });
    }

    let offset = usize::from(ihl) * 4;
    if buf.len() < offset + ICMP_HEADER_SIZE {
        return Err(PacketError::Truncated { len: buf.len() });
    }

    Ok(&buf[offset..])
}
