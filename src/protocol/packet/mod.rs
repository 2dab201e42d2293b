pub mod control;
mod error;
pub mod frame;

pub use control::{Connect, Response, ServerInfo};
pub use error::DecodeError;
pub use frame::MoCapFrame;

use bytes::{Buf, BufMut, Bytes};

/// NatNet message ids carried in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i16)]
pub enum MessageId {
    Connect = 0,
    ServerInfo = 1,
    Request = 2,
    Response = 3,
    RequestModelDef = 4,
    ModelDef = 5,
    RequestFrameOfData = 6,
    FrameOfData = 7,
    MessageString = 8,
    Disconnect = 9,
    KeepAlive = 10,
    UnrecognizedRequest = 100,
}

impl MessageId {
    pub fn from_wire(raw: i16) -> Result<Self, DecodeError> {
        Ok(match raw {
            0 => MessageId::Connect,
            1 => MessageId::ServerInfo,
            2 => MessageId::Request,
            3 => MessageId::Response,
            4 => MessageId::RequestModelDef,
            5 => MessageId::ModelDef,
            6 => MessageId::RequestFrameOfData,
            7 => MessageId::FrameOfData,
            8 => MessageId::MessageString,
            9 => MessageId::Disconnect,
            10 => MessageId::KeepAlive,
            100 => MessageId::UnrecognizedRequest,
            other => return Err(DecodeError::UnknownId(other)),
        })
    }
}

/// Trait implemented by concrete NatNet control packet body types.
///
/// Implementations encode/decode only the packet body; the 4-byte
/// envelope is handled by [`Envelope`] and [`encode_message`].
pub trait ControlPacket: Sized {
    /// The message id identifying this packet on the wire.
    const ID: MessageId;

    /// Encode the body of this packet into the destination buffer.
    fn encode_body(&self, dst: &mut impl BufMut);

    /// Decode the body of this packet from the source buffer.
    fn decode_body(src: &mut impl Buf) -> Result<Self, DecodeError>;
}

/// A decoded message envelope: `message_id: i16 LE`, `length: i16 LE`,
/// then the payload.
///
/// The declared length is clamped to the bytes actually present, so a
/// short datagram yields a short payload rather than a read past the
/// end; the frame decoders are built to tolerate the truncation.
#[derive(Debug, Clone)]
pub struct Envelope {
    pub id: MessageId,
    pub payload: Bytes,
}

impl Envelope {
    pub fn decode(datagram: &mut Bytes) -> Result<Self, DecodeError> {
        if datagram.remaining() < 4 {
            return Err(DecodeError::UnexpectedEof);
        }
        let id = MessageId::from_wire(datagram.get_i16_le())?;
        let declared = datagram.get_i16_le().max(0) as usize;
        let take = declared.min(datagram.remaining());
        let payload = datagram.copy_to_bytes(take);
        Ok(Self { id, payload })
    }
}

/// Encodes a complete message: envelope followed by the payload.
pub fn encode_message(id: MessageId, payload: &[u8], dst: &mut impl BufMut) {
    dst.put_i16_le(id as i16);
    dst.put_i16_le(payload.len() as i16);
    dst.put_slice(payload);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn envelope_roundtrip() {
        let mut buf = BytesMut::new();
        encode_message(MessageId::Request, b"FrameRate\0", &mut buf);
        let mut datagram = buf.freeze();
        let env = Envelope::decode(&mut datagram).unwrap();
        assert_eq!(env.id, MessageId::Request);
        assert_eq!(&env.payload[..], b"FrameRate\0");
    }

    #[test]
    fn envelope_length_is_clamped_to_datagram() {
        // Declares 100 payload bytes but only carries 2.
        let mut datagram = Bytes::from_static(&[7, 0, 100, 0, 0xAA, 0xBB]);
        let env = Envelope::decode(&mut datagram).unwrap();
        assert_eq!(env.id, MessageId::FrameOfData);
        assert_eq!(env.payload.len(), 2);
    }

    #[test]
    fn unknown_message_id_is_rejected() {
        let mut datagram = Bytes::from_static(&[42, 0, 0, 0]);
        assert!(matches!(
            Envelope::decode(&mut datagram),
            Err(DecodeError::UnknownId(42))
        ));
    }

    #[test]
    fn short_datagram_is_eof() {
        let mut datagram = Bytes::from_static(&[7, 0, 1]);
        assert!(matches!(
            Envelope::decode(&mut datagram),
            Err(DecodeError::UnexpectedEof)
        ));
    }
}
