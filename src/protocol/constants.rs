use bitflags::bitflags;
use std::{net::Ipv4Addr, time::Duration};

/// Default NatNet command channel port.
pub const DEFAULT_COMMAND_PORT: u16 = 1510;

/// Default NatNet data channel port.
pub const DEFAULT_DATA_PORT: u16 = 1511;

/// Default multicast group, matching Motive's streaming settings.
pub const DEFAULT_MULTICAST_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 42, 99);

/// Receive buffer size for both channels. A frame never spans datagrams.
pub const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Upper bound on any marker count field; larger values are treated as
/// corruption and end the decode of that payload.
pub const MAX_MARKERS_PER_SET: i32 = 10_000;

/// Total size of the CONNECT payload.
pub const CONNECT_PAYLOAD_SIZE: usize = 270;

/// ASCII magic at the head of the CONNECT payload.
pub const CONNECT_MAGIC: &[u8; 4] = b"Ping";

/// Offset of the requested version components inside the CONNECT payload.
pub const CONNECT_VERSION_OFFSET: usize = 265;

/// Size of the fixed application-name field in SERVERINFO.
pub const SERVER_INFO_NAME_SIZE: usize = 256;

/// Longest RESPONSE body still considered a bitstream version string.
pub const MAX_BITSTREAM_RESPONSE_LEN: usize = 30;

/// Command-channel receive timeout; also the unicast keepalive cadence.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Attempts made by `send_command` before reporting failure.
pub const COMMAND_SEND_ATTEMPTS: usize = 3;

/// Delay after the initial `TimelinePlay` of a bitstream change.
pub const BITSTREAM_SETTLE_SHORT: Duration = Duration::from_millis(100);

/// Delay after the full timeline reset sequence of a bitstream change.
pub const BITSTREAM_SETTLE_LONG: Duration = Duration::from_secs(2);

bitflags! {
    /// Trailing param bitfield of a rigid body record (2.6 and later).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(transparent)]
    pub struct RigidBodyParams: i16 {
        const TRACKING_VALID = 0b0000_0001;
    }
}

bitflags! {
    /// Trailing param bitfield of the frame suffix.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    #[repr(transparent)]
    pub struct FrameParams: i16 {
        const RECORDING              = 0b0000_0001;
        const TRACKED_MODELS_CHANGED = 0b0000_0010;
    }
}
