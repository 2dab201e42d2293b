//! Client surface owning a NatNet session.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::{
    sync::{Mutex, mpsc, watch},
    task::JoinHandle,
    time,
};

use crate::dispatch::FrameHandler;
use crate::error::NatnetError;
use crate::protocol::{
    constants::{
        BITSTREAM_SETTLE_LONG, BITSTREAM_SETTLE_SHORT, COMMAND_SEND_ATTEMPTS, COMMAND_TIMEOUT,
    },
    packet::{Connect, ControlPacket, MessageId, control, encode_message},
    version::ProtocolVersion,
};
use crate::session::{self, SessionSnapshot};

use super::command::CommandLoop;
use super::config::ClientConfig;
use super::data::DataLoop;
use super::socket;

/// A connected NatNet client session.
///
/// Owns the command and data sockets and the two receive loops running
/// on them. Construction sends CONNECT; the handshake completes
/// asynchronously when the command loop folds the server's SERVERINFO
/// into the session snapshot, observable via [`NatnetClient::connected`].
///
/// A session cannot be restarted after [`NatnetClient::shutdown`];
/// construct a new one to reconnect.
pub struct NatnetClient {
    config: ClientConfig,
    server: SocketAddr,
    command_socket: Arc<tokio::net::UdpSocket>,
    data_socket: Arc<tokio::net::UdpSocket>,
    session: watch::Receiver<SessionSnapshot>,
    session_tx: Arc<watch::Sender<SessionSnapshot>>,
    // Serializes command round-trips so concurrent callers cannot
    // steal each other's response codes.
    responses: Mutex<mpsc::Receiver<i32>>,
    shutdown: watch::Sender<bool>,
    command_task: JoinHandle<Result<(), NatnetError>>,
    data_task: JoinHandle<Result<(), NatnetError>>,
}

impl NatnetClient {
    /// Opens both sockets, starts the receive loops, and sends the
    /// initial CONNECT request.
    pub async fn connect(
        config: ClientConfig,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Self, NatnetError> {
        let data_socket = Arc::new(socket::open_data_socket(&config)?);
        let command_socket = Arc::new(socket::open_command_socket(&config)?);
        let server = SocketAddr::from((config.server_address, config.command_port));

        let (session_tx, session_rx) = session::channel(config.requested_version);
        let session_tx = Arc::new(session_tx);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (response_tx, response_rx) = mpsc::channel(16);

        let command_task = tokio::spawn(
            CommandLoop {
                socket: command_socket.clone(),
                session: session_tx.clone(),
                response_tx,
                shutdown: shutdown_rx.clone(),
                use_multicast: config.use_multicast,
                server,
            }
            .run(),
        );
        let data_task = tokio::spawn(
            DataLoop {
                socket: data_socket.clone(),
                session: session_rx.clone(),
                handler,
                shutdown: shutdown_rx,
                timeout: config.data_timeout,
            }
            .run(),
        );

        let client = Self {
            config,
            server,
            command_socket,
            data_socket,
            session: session_rx,
            session_tx,
            responses: Mutex::new(response_rx),
            shutdown: shutdown_tx,
            command_task,
            data_task,
        };
        client.send_connect().await?;
        Ok(client)
    }

    async fn send_connect(&self) -> Result<(), NatnetError> {
        // With no explicit request the CONNECT still has to carry a
        // concrete version; the snapshot later adopts whatever stream
        // version SERVERINFO reports.
        let requested = if self.config.requested_version.is_unknown() {
            ProtocolVersion::new(4, 1, 0, 0)
        } else {
            self.config.requested_version
        };
        let packet = Connect { requested };
        let mut body = Vec::new();
        packet.encode_body(&mut body);
        let mut message = Vec::with_capacity(4 + body.len());
        encode_message(MessageId::Connect, &body, &mut message);
        tracing::info!(server = %self.server, version = %requested, "connecting");
        self.command_socket.send_to(&message, self.server).await?;
        Ok(())
    }

    /// True once the server has answered CONNECT with its identity.
    pub fn connected(&self) -> bool {
        self.session.borrow().ready()
    }

    /// Current view of the negotiated session.
    pub fn session(&self) -> SessionSnapshot {
        self.session.borrow().clone()
    }

    /// True while both receive loops are still running.
    pub fn running(&self) -> bool {
        !self.command_task.is_finished() && !self.data_task.is_finished()
    }

    /// Local address of the data socket.
    pub fn local_data_addr(&self) -> std::io::Result<SocketAddr> {
        self.data_socket.local_addr()
    }

    /// Sends a text REQUEST and awaits the server's response code.
    ///
    /// Send failures are retried a few times; exhausting the retries
    /// or a silent server yields -1.
    pub async fn send_command(&self, command: &str) -> i32 {
        let payload = control::request_payload(command);
        let mut message = Vec::with_capacity(4 + payload.len());
        encode_message(MessageId::Request, &payload, &mut message);

        let mut responses = self.responses.lock().await;
        // Drop codes left over from commands whose caller gave up.
        while responses.try_recv().is_ok() {}

        for attempt in 1..=COMMAND_SEND_ATTEMPTS {
            if let Err(e) = self.command_socket.send_to(&message, self.server).await {
                tracing::warn!(command = %command, attempt, error = %e, "command send failed");
                continue;
            }
            return match time::timeout(COMMAND_TIMEOUT, responses.recv()).await {
                Ok(Some(code)) => code,
                Ok(None) | Err(_) => {
                    tracing::warn!(command = %command, "no response to command");
                    -1
                }
            };
        }
        -1
    }

    /// Sends a sequence of commands back to back, logging each code.
    pub async fn send_commands(&self, commands: &[&str]) {
        for command in commands {
            let code = self.send_command(command).await;
            tracing::debug!(command = %command, code, "batch command");
        }
    }

    /// Asks the server to send the model definitions once.
    pub async fn request_model_definitions(&self) -> Result<(), NatnetError> {
        self.send_empty(MessageId::RequestModelDef).await
    }

    /// Asks the server for a single frame of data.
    pub async fn request_frame(&self) -> Result<(), NatnetError> {
        self.send_empty(MessageId::RequestFrameOfData).await
    }

    async fn send_empty(&self, id: MessageId) -> Result<(), NatnetError> {
        let mut message = Vec::with_capacity(4);
        encode_message(id, &[], &mut message);
        self.command_socket.send_to(&message, self.server).await?;
        Ok(())
    }

    /// Requests a bitstream version change and returns the server's
    /// response code.
    ///
    /// Requesting the version already in effect is a no-op: nothing is
    /// sent and Ok(-1) is returned. Servers that cannot change
    /// bitstream are rejected before anything is sent. On acceptance
    /// the new version is published to the data loop and the server's
    /// timeline is bounced so it resumes streaming under the new
    /// bitstream.
    pub async fn change_version(&self, major: u8, minor: u8) -> Result<i32, NatnetError> {
        let snapshot = self.session.borrow().clone();
        let current = snapshot.requested_version;
        if current.major == major && current.minor == minor {
            tracing::debug!(major, minor, "bitstream version already in effect");
            return Ok(-1);
        }
        if !snapshot.can_change_bitstream {
            tracing::warn!(major, minor, "server cannot change bitstream version");
            return Err(NatnetError::VersionChangeRejected);
        }

        let code = self
            .send_command(&control::bitstream_request(major, minor))
            .await;
        if code < 0 {
            tracing::warn!(major, minor, code, "bitstream change request failed");
            return Ok(code);
        }

        self.session_tx.send_modify(|snapshot| {
            snapshot.requested_version = ProtocolVersion::new(major, minor, 0, 0);
        });
        tracing::info!(major, minor, "bitstream version changed");

        // Bounce the timeline so the server restarts the stream under
        // the new bitstream.
        self.send_command("TimelinePlay").await;
        time::sleep(BITSTREAM_SETTLE_SHORT).await;
        self.send_commands(&[
            "TimelinePlay",
            "TimelineStop",
            "SetPlaybackCurrentFrame,0",
            "TimelineStop",
        ])
        .await;
        time::sleep(BITSTREAM_SETTLE_LONG).await;
        Ok(code)
    }

    /// Stops both receive loops and waits for them to exit, surfacing
    /// any fatal error a loop died with.
    pub async fn shutdown(self) -> Result<(), NatnetError> {
        tracing::debug!("shutdown requested");
        let _ = self.shutdown.send(true);
        for task in [self.command_task, self.data_task] {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => return Err(e),
                Err(e) => tracing::error!(error = %e, "receive loop aborted"),
            }
        }
        Ok(())
    }
}
