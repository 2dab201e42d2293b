//! Command-channel receive loop.
//!
//! Drives the handshake side of the session: SERVERINFO and RESPONSE
//! messages update the published session snapshot, response codes are
//! forwarded to whoever is awaiting `send_command`, and unicast
//! sessions get a keepalive after every receive cycle so the server
//! keeps streaming to us.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use tokio::{
    net::UdpSocket,
    sync::{mpsc, watch},
    time,
};

use crate::error::NatnetError;
use crate::protocol::{
    constants::{COMMAND_TIMEOUT, RECV_BUFFER_SIZE},
    packet::{ControlPacket, Envelope, MessageId, Response, ServerInfo, encode_message},
    wire::read_cstring,
};
use crate::session::SessionSnapshot;

pub(super) struct CommandLoop {
    pub socket: Arc<UdpSocket>,
    pub session: Arc<watch::Sender<SessionSnapshot>>,
    pub response_tx: mpsc::Sender<i32>,
    pub shutdown: watch::Receiver<bool>,
    pub use_multicast: bool,
    pub server: SocketAddr,
}

impl CommandLoop {
    pub async fn run(mut self) -> Result<(), NatnetError> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    // A dropped sender means the owning client is gone.
                    if changed.is_err() || *self.shutdown.borrow() {
                        tracing::debug!("command loop stopping");
                        return Ok(());
                    }
                }
                outcome = time::timeout(COMMAND_TIMEOUT, self.socket.recv_from(&mut buf)) => {
                    match outcome {
                        Ok(Ok((len, peer))) => self.handle_datagram(&buf[..len], peer),
                        Ok(Err(e)) => {
                            if *self.shutdown.borrow() {
                                return Ok(());
                            }
                            tracing::error!(error = %e, "command socket receive failed");
                            return Err(NatnetError::Socket(e));
                        }
                        Err(_elapsed) => {
                            if self.use_multicast {
                                tracing::error!("command channel timed out, server not responding");
                                return Err(NatnetError::ServerNotResponding { channel: "command" });
                            }
                        }
                    }
                    // Unicast servers drop silent clients; signal
                    // liveness once per receive cycle.
                    if !self.use_multicast && !*self.shutdown.borrow() {
                        self.send_keep_alive().await;
                    }
                }
            }
        }
    }

    fn handle_datagram(&self, datagram: &[u8], peer: SocketAddr) {
        let mut datagram = Bytes::copy_from_slice(datagram);
        let envelope = match Envelope::decode(&mut datagram) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(peer = %peer, error = %e, "dropping undecodable command datagram");
                return;
            }
        };

        match envelope.id {
            MessageId::ServerInfo => {
                let mut payload = envelope.payload.clone();
                match ServerInfo::decode_body(&mut payload) {
                    Ok(info) => {
                        tracing::info!(
                            application = %info.application_name,
                            server = %info.server_version,
                            stream = %info.stream_version,
                            "server info received"
                        );
                        let multicast = self.use_multicast;
                        self.session
                            .send_modify(|snapshot| snapshot.apply_server_info(&info, multicast));
                    }
                    Err(e) => tracing::debug!(error = %e, "malformed SERVERINFO"),
                }
            }
            MessageId::Response => match Response::parse(&envelope.payload) {
                Ok(Response::Code(code)) => {
                    tracing::debug!(code, "command response");
                    let _ = self.response_tx.try_send(code);
                }
                Ok(response) => {
                    if let Some(version) = response.bitstream_version() {
                        tracing::info!(version = %version, "server accepted bitstream version");
                        self.session
                            .send_modify(|snapshot| snapshot.apply_bitstream_version(version));
                    } else if let Response::Message(message) = response {
                        tracing::debug!(message = %message, "command response message");
                    }
                }
                Err(e) => tracing::debug!(error = %e, "malformed RESPONSE"),
            },
            MessageId::MessageString => {
                let mut payload = envelope.payload.clone();
                if let Ok(message) = read_cstring(&mut payload) {
                    tracing::debug!(message = %message, "server message");
                }
            }
            other => {
                // Model definitions are intentionally not decoded, and
                // frames belong on the data channel.
                tracing::trace!(id = ?other, "ignoring message on command channel");
            }
        }
    }

    async fn send_keep_alive(&self) {
        let mut message = Vec::with_capacity(4);
        encode_message(MessageId::KeepAlive, &[], &mut message);
        match self.socket.send_to(&message, self.server).await {
            Ok(_) => tracing::trace!("keepalive sent"),
            Err(e) => tracing::warn!(error = %e, "keepalive send failed"),
        }
    }
}
