//! Broadcast side of the wake-up: finding a usable local IPv4 address on the
//! configured interface and sending the magic packet to the IPv4 limited
//! broadcast address.
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddrV4, UdpSocket};

use thiserror::Error;

use crate::wol::MagicPacket;

/// Conventional WOL port ("discard").
pub const DEFAULT_PORT: u16 = 9;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("interface '{0}' not found")]
    InterfaceNotFound(String),

    #[error("unable to list addresses of interface '{interface}': {source}")]
    NoAddresses {
        interface: String,
        #[source]
        source: nix::Error,
    },

    #[error("no suitable local address found on interface '{0}'")]
    NoSuitableAddress(String),
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("error sending WOL packet: {0}")]
    Io(#[from] io::Error),

    #[error("partial write: sent {sent} of {expected} bytes")]
    Partial { sent: usize, expected: usize },
}

/// Anything a magic packet can be handed to.
pub trait PacketSink {
    fn send(&mut self, packet: &MagicPacket) -> Result<(), SendError>;
}

/// Picks the first IPv4, non-loopback address in enumeration order.
pub fn select_source_address<I>(addrs: I) -> Option<Ipv4Addr>
where
    I: IntoIterator<Item = IpAddr>,
{
    addrs.into_iter().find_map(|addr| match addr {
        IpAddr::V4(v4) if !v4.is_loopback() => Some(v4),
        _ => None,
    })
}

/// Resolves the local address the broadcast will be sent from.
pub fn resolve_broadcast_source(interface: &str) -> Result<Ipv4Addr, ResolveError> {
    nix::net::if_::if_nametoindex(interface)
        .map_err(|_| ResolveError::InterfaceNotFound(interface.to_string()))?;

    let addrs = nix::ifaddrs::getifaddrs().map_err(|source| ResolveError::NoAddresses {
        interface: interface.to_string(),
        source,
    })?;

    let candidates = addrs
        .filter(|ifa| ifa.interface_name == interface)
        .filter_map(|ifa| ifa.address)
        .filter_map(|addr| {
            addr.as_sockaddr_in()
                .map(|sin| IpAddr::V4(Ipv4Addr::from(sin.ip())))
        });

    select_source_address(candidates)
        .ok_or_else(|| ResolveError::NoSuitableAddress(interface.to_string()))
}

/// UDP socket bound to the resolved interface address and connected to
/// `255.255.255.255:<port>`. Closed when dropped.
#[derive(Debug)]
pub struct BroadcastSocket {
    socket: UdpSocket,
    target: SocketAddrV4,
}

impl BroadcastSocket {
    pub fn open(source: Ipv4Addr, port: u16) -> io::Result<Self> {
        Self::with_target(source, SocketAddrV4::new(Ipv4Addr::BROADCAST, port))
    }

    fn with_target(source: Ipv4Addr, target: SocketAddrV4) -> io::Result<Self> {
        let socket = UdpSocket::bind(SocketAddrV4::new(source, 0))?;
        socket.set_broadcast(true)?;
        socket.connect(target)?;

        tracing::debug!(%source, dest = %target, "broadcast socket ready");
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddrV4 {
        self.target
    }
}

impl PacketSink for BroadcastSocket {
    fn send(&mut self, packet: &MagicPacket) -> Result<(), SendError> {
        let bytes = packet.as_bytes();
        let sent = self.socket.send(bytes)?;
        if sent != bytes.len() {
            return Err(SendError::Partial {
                sent,
                expected: bytes.len(),
            });
        }

        Ok(())
    }
}

impl Drop for BroadcastSocket {
    fn drop(&mut self) {
        tracing::debug!(dest = %self.target, "closing broadcast socket");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wol::{create_magic_packet, MAGIC_PACKET_LEN};
    use std::net::Ipv6Addr;

    #[test]
    fn test_loopback_only_has_no_suitable_address() {
        let addrs = [IpAddr::V4(Ipv4Addr::LOCALHOST)];
        assert_eq!(select_source_address(addrs), None);
    }

    #[test]
    fn test_selects_single_non_loopback_ipv4() {
        let lan = Ipv4Addr::new(192, 168, 1, 23);
        let addrs = [
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6("fe80::1".parse().unwrap()),
            IpAddr::V4(lan),
        ];
        assert_eq!(select_source_address(addrs), Some(lan));
    }

    #[test]
    fn test_first_match_wins() {
        let first = Ipv4Addr::new(10, 0, 0, 2);
        let second = Ipv4Addr::new(192, 168, 1, 23);
        let addrs = [IpAddr::V4(first), IpAddr::V4(second)];
        assert_eq!(select_source_address(addrs), Some(first));
    }

    #[test]
    fn test_empty_enumeration_has_no_suitable_address() {
        assert_eq!(select_source_address(Vec::new()), None);
    }

    #[test]
    fn test_unknown_interface_is_not_found() {
        let err = resolve_broadcast_source("wake-no-such-if0").unwrap_err();
        assert!(matches!(err, ResolveError::InterfaceNotFound(name) if name == "wake-no-such-if0"));
    }

    #[test]
    fn test_open_targets_limited_broadcast() {
        let socket = BroadcastSocket::open(Ipv4Addr::UNSPECIFIED, DEFAULT_PORT);
        // connecting to the broadcast address needs a route; skip where there is none
        if let Ok(socket) = socket {
            assert_eq!(
                socket.target(),
                SocketAddrV4::new(Ipv4Addr::BROADCAST, DEFAULT_PORT)
            );
        }
    }

    #[test]
    fn test_send_writes_whole_packet() {
        let receiver = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let target = match receiver.local_addr().unwrap() {
            std::net::SocketAddr::V4(addr) => addr,
            other => panic!("unexpected receiver address {other}"),
        };

        let mut socket = BroadcastSocket::with_target(Ipv4Addr::LOCALHOST, target).unwrap();
        let packet = create_magic_packet("AA:BB:CC:DD:EE:FF").unwrap();
        socket.send(&packet).unwrap();

        let mut buf = [0u8; 256];
        let len = receiver.recv(&mut buf).unwrap();
        assert_eq!(len, MAGIC_PACKET_LEN);
        assert_eq!(&buf[..len], packet.as_bytes());
    }
}
