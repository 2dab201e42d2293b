//! NatNet control packets exchanged on the command channel.

use bytes::{Buf, BufMut, Bytes};

use crate::protocol::{
    constants::{
        CONNECT_MAGIC, CONNECT_PAYLOAD_SIZE, CONNECT_VERSION_OFFSET, MAX_BITSTREAM_RESPONSE_LEN,
        SERVER_INFO_NAME_SIZE,
    },
    packet::{ControlPacket, DecodeError, MessageId},
    version::ProtocolVersion,
    wire::{NatnetEncodable, put_fixed_cstring, read_cstring, read_fixed_cstring},
};

/// Connection request sent to the server's command port.
///
/// A fixed 270-byte payload: ASCII `"Ping"` at the head, a zero byte
/// at offset 264, the requested version components at 265..269, and
/// zeros everywhere else.
#[derive(Debug, Clone)]
pub struct Connect {
    pub requested: ProtocolVersion,
}

impl ControlPacket for Connect {
    const ID: MessageId = MessageId::Connect;

    fn encode_body(&self, dst: &mut impl BufMut) {
        dst.put_slice(CONNECT_MAGIC);
        dst.put_bytes(0, CONNECT_VERSION_OFFSET - CONNECT_MAGIC.len());
        dst.put_u8(self.requested.major);
        dst.put_u8(self.requested.minor);
        dst.put_u8(self.requested.build);
        dst.put_u8(self.requested.revision);
        dst.put_u8(0);
    }

    fn decode_body(src: &mut impl Buf) -> Result<Self, DecodeError> {
        if src.remaining() < CONNECT_PAYLOAD_SIZE {
            return Err(DecodeError::UnexpectedEof);
        }
        let mut raw = [0u8; CONNECT_PAYLOAD_SIZE];
        src.copy_to_slice(&mut raw);
        Ok(Self {
            requested: ProtocolVersion::new(
                raw[CONNECT_VERSION_OFFSET],
                raw[CONNECT_VERSION_OFFSET + 1],
                raw[CONNECT_VERSION_OFFSET + 2],
                raw[CONNECT_VERSION_OFFSET + 3],
            ),
        })
    }
}

/// Identity of the streaming server, sent in reply to [`Connect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    /// Application name, e.g. "Motive".
    pub application_name: String,
    /// Version of the server application itself.
    pub server_version: ProtocolVersion,
    /// Highest NatNet stream version the server can emit.
    pub stream_version: ProtocolVersion,
}

fn decode_version_bytes(src: &mut impl Buf) -> Result<ProtocolVersion, DecodeError> {
    Ok(ProtocolVersion::new(
        u8::decode_natnet(src)?,
        u8::decode_natnet(src)?,
        u8::decode_natnet(src)?,
        u8::decode_natnet(src)?,
    ))
}

fn encode_version_bytes(v: ProtocolVersion, dst: &mut impl BufMut) {
    dst.put_u8(v.major);
    dst.put_u8(v.minor);
    dst.put_u8(v.build);
    dst.put_u8(v.revision);
}

impl ControlPacket for ServerInfo {
    const ID: MessageId = MessageId::ServerInfo;

    fn encode_body(&self, dst: &mut impl BufMut) {
        put_fixed_cstring(&self.application_name, SERVER_INFO_NAME_SIZE, dst);
        encode_version_bytes(self.server_version, dst);
        encode_version_bytes(self.stream_version, dst);
    }

    fn decode_body(src: &mut impl Buf) -> Result<Self, DecodeError> {
        Ok(Self {
            application_name: read_fixed_cstring(src, SERVER_INFO_NAME_SIZE)?,
            server_version: decode_version_bytes(src)?,
            stream_version: decode_version_bytes(src)?,
        })
    }
}

/// Server reply to a REQUEST: either a bare response code or a
/// null-terminated message string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Code(i32),
    Message(String),
}

impl Response {
    /// Parses a RESPONSE payload. A 4-byte payload is a signed
    /// response code; anything else is a string.
    pub fn parse(payload: &Bytes) -> Result<Self, DecodeError> {
        let mut src = payload.clone();
        if payload.len() == 4 {
            return Ok(Response::Code(i32::decode_natnet(&mut src)?));
        }
        Ok(Response::Message(read_cstring(&mut src)?))
    }

    /// Extracts the server's accepted bitstream version from a
    /// `Bitstream,<major>.<minor>` response message, if this is one.
    pub fn bitstream_version(&self) -> Option<ProtocolVersion> {
        let Response::Message(message) = self else {
            return None;
        };
        if message.len() >= MAX_BITSTREAM_RESPONSE_LEN {
            return None;
        }
        let mut parts = message.split(',');
        if parts.next() != Some("Bitstream") {
            return None;
        }
        let mut components = parts.next()?.split('.');
        let major = components.next()?.trim().parse().ok()?;
        let minor = components
            .next()
            .and_then(|c| c.trim().parse().ok())
            .unwrap_or(0);
        Some(ProtocolVersion::new(major, minor, 0, 0))
    }
}

/// Builds the REQUEST text asking the server to switch bitstreams.
pub fn bitstream_request(major: u8, minor: u8) -> String {
    format!("Bitstream,{major}.{minor}")
}

/// Builds the payload of a text REQUEST: the command plus terminator.
pub fn request_payload(command: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(command.len() + 1);
    payload.extend_from_slice(command.as_bytes());
    payload.push(0);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn connect_payload_layout() {
        let pkt = Connect {
            requested: ProtocolVersion::new(4, 1, 0, 0),
        };
        let mut buf = BytesMut::new();
        pkt.encode_body(&mut buf);

        assert_eq!(buf.len(), CONNECT_PAYLOAD_SIZE);
        assert_eq!(&buf[0..4], b"Ping");
        assert_eq!(buf[264], 0);
        assert_eq!(&buf[265..269], &[4, 1, 0, 0]);
        assert!(buf[4..264].iter().all(|&b| b == 0));

        let mut slice = buf.freeze();
        let decoded = Connect::decode_body(&mut slice).unwrap();
        assert_eq!(decoded.requested, pkt.requested);
    }

    #[test]
    fn server_info_roundtrip() {
        let pkt = ServerInfo {
            application_name: "Motive".into(),
            server_version: ProtocolVersion::new(3, 1, 0, 0),
            stream_version: ProtocolVersion::new(4, 1, 0, 0),
        };
        let mut buf = BytesMut::new();
        pkt.encode_body(&mut buf);
        assert_eq!(buf.len(), SERVER_INFO_NAME_SIZE + 8);
        let mut slice = buf.freeze();
        let decoded = ServerInfo::decode_body(&mut slice).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn response_code_parses_from_four_bytes() {
        let payload = Bytes::from_static(&[5, 0, 0, 0]);
        assert_eq!(Response::parse(&payload).unwrap(), Response::Code(5));
    }

    #[test]
    fn bitstream_response_yields_version() {
        let payload = Bytes::from_static(b"Bitstream,3.1\0");
        let response = Response::parse(&payload).unwrap();
        assert_eq!(
            response.bitstream_version(),
            Some(ProtocolVersion::new(3, 1, 0, 0))
        );
    }

    #[test]
    fn non_bitstream_message_yields_none() {
        let payload = Bytes::from_static(b"FrameRate,120\0");
        let response = Response::parse(&payload).unwrap();
        assert_eq!(response.bitstream_version(), None);
    }

    #[test]
    fn request_payload_is_null_terminated() {
        assert_eq!(request_payload("TimelineStop"), b"TimelineStop\0");
    }
}
