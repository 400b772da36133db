//! Network interface enumeration.
//!
//! Every call re-reads the kernel's table; nothing is cached. One descriptor
//! is produced per (interface, address) pair, mirroring how the address list
//! comes back from the kernel.

use std::net::IpAddr;

use pnet::datalink;
use pnet::ipnetwork::IpNetwork;

/// One address binding on one interface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub index: u32,
    pub address: IpAddr,
    pub netmask: Option<IpAddr>,
    /// Broadcast address, for broadcast-capable IPv4 bindings only.
    pub broadcast: Option<IpAddr>,
    /// Peer address of a point-to-point link. Mutually exclusive with
    /// `broadcast`; the link layer here does not expose the peer, so this
    /// stays `None` on point-to-point interfaces.
    pub destination: Option<IpAddr>,
    pub multicast: bool,
}

/// Build descriptors for one interface from its raw attributes.
pub fn describe(
    name: &str,
    index: u32,
    networks: &[IpNetwork],
    broadcast_capable: bool,
    point_to_point: bool,
    multicast: bool,
) -> Vec<InterfaceDescriptor> {
    networks
        .iter()
        .map(|network| {
            let broadcast = match network {
                IpNetwork::V4(v4) if broadcast_capable && !point_to_point => {
                    Some(IpAddr::V4(v4.broadcast()))
                }
                _ => None,
            };
            InterfaceDescriptor {
                name: name.to_string(),
                index,
                address: network.ip(),
                netmask: Some(network.mask()),
                broadcast,
                destination: None,
                multicast,
            }
        })
        .collect()
}

/// Enumerate every address on every interface the kernel reports.
pub fn interfaces() -> Vec<InterfaceDescriptor> {
    datalink::interfaces()
        .iter()
        .flat_map(|interface| {
            describe(
                &interface.name,
                interface.index,
                &interface.ips,
                interface.is_broadcast(),
                interface.is_point_to_point(),
                interface.is_multicast(),
            )
        })
        .collect()
}

/// First descriptor whose interface carries the given name.
pub fn find_interface(name: &str) -> Option<InterfaceDescriptor> {
    interfaces()
        .into_iter()
        .find(|descriptor| descriptor.name == name)
}
