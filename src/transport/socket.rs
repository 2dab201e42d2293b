//! Socket construction for the two NatNet channels.
//!
//! Options (reuse-address, broadcast, multicast membership) must be
//! set before binding, so sockets are built with `socket2` and handed
//! to Tokio via `from_std`.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

use super::config::ClientConfig;

fn new_udp_socket() -> std::io::Result<Socket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    Ok(socket)
}

fn bind(socket: Socket, addr: SocketAddrV4) -> std::io::Result<UdpSocket> {
    socket.bind(&SocketAddr::V4(addr).into())?;
    UdpSocket::from_std(socket.into())
}

/// Opens the command channel socket.
///
/// Multicast sessions bind to an ephemeral port on any interface with
/// broadcast enabled; unicast binds the configured local interface.
pub fn open_command_socket(config: &ClientConfig) -> std::io::Result<UdpSocket> {
    let socket = new_udp_socket()?;
    if config.use_multicast {
        socket.set_broadcast(true)?;
        bind(socket, SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
    } else {
        bind(socket, SocketAddrV4::new(config.local_address, 0))
    }
}

/// Opens the data channel socket.
///
/// Multicast sessions join the group on the local interface and bind
/// the data port. Unicast sessions bind an ephemeral port and still
/// join the group unless it is the broadcast address.
pub fn open_data_socket(config: &ClientConfig) -> std::io::Result<UdpSocket> {
    let socket = new_udp_socket()?;
    if config.use_multicast {
        socket.join_multicast_v4(&config.multicast_group, &config.local_address)?;
        bind(
            socket,
            SocketAddrV4::new(config.local_address, config.data_port),
        )
    } else {
        if config.multicast_group != Ipv4Addr::BROADCAST {
            socket.join_multicast_v4(&config.multicast_group, &config.local_address)?;
        }
        bind(socket, SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
    }
}
