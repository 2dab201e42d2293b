use thiserror::Error;

/// Errors surfaced by the transport layer and client surface.
///
/// Codec-level truncation and corruption never appear here; the frame
/// decoders absorb those, since UDP loss is expected and must not take
/// down a receive loop.
#[derive(Error, Debug)]
pub enum NatnetError {
    /// Socket creation, bind, or multicast join failed during setup,
    /// or a receive call failed while a loop was running.
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// A channel with a receive timeout configured saw persistent
    /// silence; in multicast mode this means the server is gone.
    #[error("server not responding on the {channel} channel")]
    ServerNotResponding { channel: &'static str },

    /// The server does not accept bitstream changes, so the version
    /// change request was not sent.
    #[error("server rejected the bitstream version change")]
    VersionChangeRejected,
}
