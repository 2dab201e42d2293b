use thiserror::Error;

/// Errors that may occur while decoding NatNet values or packets.
///
/// Frame record decoders recover from truncation internally and never
/// surface `UnexpectedEof`; it is reserved for the strict paths
/// (envelope, control packets, primitives).
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The buffer did not contain enough bytes to decode the requested value.
    #[error("unexpected EoF, not enough bytes to read requested type")]
    UnexpectedEof,

    /// A message id that does not map to any known NatNet message.
    #[error("unknown NatNet message id: {0}")]
    UnknownId(i16),

    /// A count field was negative or exceeded the sanity ceiling.
    ///
    /// Frame decoders treat this as corruption and abandon the
    /// remainder of the payload rather than allocating from it.
    #[error("malformed count field: {0}")]
    MalformedCount(i32),
}
