use std::{net::Ipv4Addr, time::Duration};

use crate::protocol::{
    constants::{DEFAULT_COMMAND_PORT, DEFAULT_DATA_PORT, DEFAULT_MULTICAST_GROUP},
    version::ProtocolVersion,
};

/// Connection settings for a NatNet session.
///
/// Consumed at construction; a running session never re-reads these.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Address of the NatNet server (Motive host).
    pub server_address: Ipv4Addr,
    /// Local interface to bind and join the multicast group on.
    pub local_address: Ipv4Addr,
    /// Multicast group from the server's streaming settings.
    pub multicast_group: Ipv4Addr,
    /// Command channel port on the server.
    pub command_port: u16,
    /// Data channel port.
    pub data_port: u16,
    /// Multicast (default) or unicast streaming.
    pub use_multicast: bool,
    /// Bitstream version to request; `UNKNOWN` adopts the server's
    /// stream version on the first SERVERINFO.
    pub requested_version: ProtocolVersion,
    /// Optional data-channel receive timeout. When set, persistent
    /// silence is fatal for the data loop ("server not responding");
    /// when unset the data loop blocks indefinitely awaiting frames.
    pub data_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_address: Ipv4Addr::LOCALHOST,
            local_address: Ipv4Addr::LOCALHOST,
            multicast_group: DEFAULT_MULTICAST_GROUP,
            command_port: DEFAULT_COMMAND_PORT,
            data_port: DEFAULT_DATA_PORT,
            use_multicast: true,
            requested_version: ProtocolVersion::UNKNOWN,
            data_timeout: None,
        }
    }
}
