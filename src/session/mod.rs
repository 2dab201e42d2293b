//! Negotiated session state shared between the receive loops.
//!
//! The command loop is the single writer: it folds SERVERINFO and
//! bitstream RESPONSE messages into a fresh [`SessionSnapshot`] and
//! publishes it through a `tokio::sync::watch` channel. The data loop
//! reads the snapshot by value on every datagram to pick the decode
//! rules, so there is never a torn read of the version fields.

use tokio::sync::watch;

use crate::protocol::{packet::ServerInfo, version::ProtocolVersion};

/// Immutable view of the negotiated NatNet session.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Server application name from SERVERINFO, e.g. "Motive".
    pub application_name: Option<String>,
    /// Version of the server application itself.
    pub server_version: ProtocolVersion,
    /// Highest stream version the server reports it can emit.
    pub server_stream_version: ProtocolVersion,
    /// The bitstream version frames are decoded under.
    pub requested_version: ProtocolVersion,
    /// Whether the server accepts bitstream version changes. Only true
    /// for servers reporting major >= 4 over unicast; multicast
    /// sessions cannot alter the bitstream.
    pub can_change_bitstream: bool,
}

impl SessionSnapshot {
    pub fn with_requested(requested: ProtocolVersion) -> Self {
        Self {
            requested_version: requested,
            ..Self::default()
        }
    }

    /// True once SERVERINFO arrived and the server version is known.
    pub fn ready(&self) -> bool {
        self.application_name.is_some() && !self.server_version.is_unknown()
    }

    /// Folds a SERVERINFO message into the snapshot.
    ///
    /// If no version was explicitly requested, the server's stream
    /// version is adopted so frames decode under the layout the server
    /// is actually sending.
    pub fn apply_server_info(&mut self, info: &ServerInfo, multicast: bool) {
        self.application_name = Some(info.application_name.clone());
        self.server_version = info.server_version;
        self.server_stream_version = info.stream_version;
        if self.requested_version.major == 0 && self.requested_version.minor == 0 {
            tracing::info!(
                adopted = %info.stream_version,
                "no version requested, adopting server stream version"
            );
            self.requested_version = info.stream_version;
        }
        self.can_change_bitstream = info.stream_version.major >= 4 && !multicast;
    }

    /// Folds the version out of a `Bitstream,<maj>.<min>` response.
    pub fn apply_bitstream_version(&mut self, version: ProtocolVersion) {
        self.server_stream_version = version;
    }
}

/// Creates the session watch channel seeded with the configured
/// requested version.
pub fn channel(
    requested: ProtocolVersion,
) -> (
    watch::Sender<SessionSnapshot>,
    watch::Receiver<SessionSnapshot>,
) {
    watch::channel(SessionSnapshot::with_requested(requested))
}
