//! Asynchronous NatNet (OptiTrack Motive) streaming client.
//!
//! NatNet is the UDP streaming protocol spoken by OptiTrack's Motive
//! software: a command channel for the handshake and control requests,
//! and a data channel carrying per-frame binary payloads with rigid
//! bodies, skeletons, marker sets, force plates and analog devices.
//!
//! The crate is split the same way the protocol is:
//! - [`protocol`] — the versioned wire codec (envelope, control
//!   packets, frame records).
//! - [`session`] — the negotiated session snapshot shared between the
//!   two receive loops.
//! - [`transport`] — sockets, the command/data receive loops and the
//!   [`NatnetClient`] surface.
//! - [`dispatch`] — the consumer hooks invoked per decoded frame.

pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

pub use dispatch::{FrameHandler, FrameSummary};
pub use error::NatnetError;
pub use protocol::packet::frame::MoCapFrame;
pub use protocol::version::ProtocolVersion;
pub use session::SessionSnapshot;
pub use transport::{ClientConfig, NatnetClient};
