//! Data-channel receive loop.
//!
//! Decodes FRAMEOFDATA datagrams under the session's negotiated
//! version and hands the result to the frame dispatcher. Malformed or
//! truncated datagrams are absorbed here; only socket failures and a
//! configured receive timeout stop the loop.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::{net::UdpSocket, sync::watch, time};

use crate::dispatch::{FrameHandler, dispatch_frame};
use crate::error::NatnetError;
use crate::protocol::{
    constants::RECV_BUFFER_SIZE,
    packet::{Envelope, MessageId, frame::MoCapFrame},
};
use crate::session::SessionSnapshot;

pub(super) struct DataLoop {
    pub socket: Arc<UdpSocket>,
    pub session: watch::Receiver<SessionSnapshot>,
    pub handler: Arc<dyn FrameHandler>,
    pub shutdown: watch::Receiver<bool>,
    pub timeout: Option<Duration>,
}

enum RecvOutcome {
    Datagram(usize),
    TimedOut,
    Failed(std::io::Error),
}

async fn recv_maybe_timeout(
    socket: &UdpSocket,
    buf: &mut [u8],
    limit: Option<Duration>,
) -> RecvOutcome {
    match limit {
        Some(limit) => match time::timeout(limit, socket.recv_from(buf)).await {
            Ok(Ok((len, _peer))) => RecvOutcome::Datagram(len),
            Ok(Err(e)) => RecvOutcome::Failed(e),
            Err(_elapsed) => RecvOutcome::TimedOut,
        },
        None => match socket.recv_from(buf).await {
            Ok((len, _peer)) => RecvOutcome::Datagram(len),
            Err(e) => RecvOutcome::Failed(e),
        },
    }
}

impl DataLoop {
    pub async fn run(mut self) -> Result<(), NatnetError> {
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        loop {
            tokio::select! {
                changed = self.shutdown.changed() => {
                    // A dropped sender means the owning client is gone.
                    if changed.is_err() || *self.shutdown.borrow() {
                        tracing::debug!("data loop stopping");
                        return Ok(());
                    }
                }
                outcome = recv_maybe_timeout(&self.socket, &mut buf, self.timeout) => {
                    match outcome {
                        RecvOutcome::Datagram(len) => self.handle_datagram(&buf[..len]),
                        RecvOutcome::TimedOut => {
                            tracing::error!("data channel timed out, server not responding");
                            return Err(NatnetError::ServerNotResponding { channel: "data" });
                        }
                        RecvOutcome::Failed(e) => {
                            if *self.shutdown.borrow() {
                                return Ok(());
                            }
                            tracing::error!(error = %e, "data socket receive failed");
                            return Err(NatnetError::Socket(e));
                        }
                    }
                }
            }
        }
    }

    fn handle_datagram(&self, datagram: &[u8]) {
        let mut datagram = Bytes::copy_from_slice(datagram);
        let envelope = match Envelope::decode(&mut datagram) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(error = %e, "dropping undecodable data datagram");
                return;
            }
        };

        match envelope.id {
            MessageId::FrameOfData => {
                let version = self.session.borrow().requested_version;
                let frame = MoCapFrame::decode(envelope.payload, version);
                tracing::trace!(
                    frame = frame.prefix.frame_number,
                    rigid_bodies = frame.rigid_bodies.len(),
                    skeletons = frame.skeletons.len(),
                    labeled_markers = frame.labeled_markers.len(),
                    "frame decoded"
                );
                dispatch_frame(self.handler.as_ref(), &frame);
            }
            other => {
                tracing::trace!(id = ?other, "ignoring message on data channel");
            }
        }
    }
}
