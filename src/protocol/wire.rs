//! Low-level NatNet wire encoding.
//!
//! NatNet is a little-endian protocol; every primitive read is bounds
//! checked against the remaining buffer so truncated datagrams surface
//! as [`DecodeError::UnexpectedEof`] instead of reading out of range.

use crate::protocol::packet::DecodeError;
use bytes::{Buf, BufMut};
use std::mem;

/// A 3-component position vector as it appears on the wire.
pub type Vec3 = [f32; 3];

/// A quaternion in wire order (x, y, z, w).
pub type Quat = [f32; 4];

/// Trait for types that encode/decode themselves in NatNet wire format.
pub trait NatnetEncodable: Sized {
    /// Encode this value into the destination buffer.
    fn encode_natnet(&self, dst: &mut impl BufMut);

    /// Decode a value of this type from the source buffer.
    fn decode_natnet(src: &mut impl Buf) -> Result<Self, DecodeError>;
}

macro_rules! impl_natnet_int {
    ($ty:ty, $put:ident, $get:ident) => {
        impl NatnetEncodable for $ty {
            fn encode_natnet(&self, dst: &mut impl BufMut) {
                dst.$put(*self);
            }

            fn decode_natnet(src: &mut impl Buf) -> Result<Self, DecodeError> {
                if src.remaining() < mem::size_of::<$ty>() {
                    return Err(DecodeError::UnexpectedEof);
                }
                Ok(src.$get())
            }
        }
    };
}

// Little-endian ints and floats:
impl_natnet_int!(i16, put_i16_le, get_i16_le);
impl_natnet_int!(i32, put_i32_le, get_i32_le);
impl_natnet_int!(i64, put_i64_le, get_i64_le);
impl_natnet_int!(f32, put_f32_le, get_f32_le);
impl_natnet_int!(f64, put_f64_le, get_f64_le);

impl NatnetEncodable for u8 {
    fn encode_natnet(&self, dst: &mut impl BufMut) {
        dst.put_u8(*self);
    }

    fn decode_natnet(src: &mut impl Buf) -> Result<Self, DecodeError> {
        if !src.has_remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok(src.get_u8())
    }
}

impl NatnetEncodable for Vec3 {
    fn encode_natnet(&self, dst: &mut impl BufMut) {
        for c in self {
            dst.put_f32_le(*c);
        }
    }

    fn decode_natnet(src: &mut impl Buf) -> Result<Self, DecodeError> {
        if src.remaining() < 12 {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok([src.get_f32_le(), src.get_f32_le(), src.get_f32_le()])
    }
}

impl NatnetEncodable for Quat {
    fn encode_natnet(&self, dst: &mut impl BufMut) {
        for c in self {
            dst.put_f32_le(*c);
        }
    }

    fn decode_natnet(src: &mut impl Buf) -> Result<Self, DecodeError> {
        if src.remaining() < 16 {
            return Err(DecodeError::UnexpectedEof);
        }
        Ok([
            src.get_f32_le(),
            src.get_f32_le(),
            src.get_f32_le(),
            src.get_f32_le(),
        ])
    }
}

/// Reads bytes up to and including a null terminator.
///
/// Fails with `UnexpectedEof` if the buffer runs out before the
/// terminator; anything non-UTF-8 is replaced rather than rejected,
/// since model names come from an untrusted stream.
pub fn read_cstring(src: &mut impl Buf) -> Result<String, DecodeError> {
    let mut raw = Vec::new();
    loop {
        if !src.has_remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let b = src.get_u8();
        if b == 0 {
            break;
        }
        raw.push(b);
    }
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

/// Writes a string followed by a null terminator.
pub fn put_cstring(s: &str, dst: &mut impl BufMut) {
    dst.put_slice(s.as_bytes());
    dst.put_u8(0);
}

/// Reads a fixed-width field containing a null-terminated string,
/// always consuming exactly `width` bytes.
pub fn read_fixed_cstring(src: &mut impl Buf, width: usize) -> Result<String, DecodeError> {
    if src.remaining() < width {
        return Err(DecodeError::UnexpectedEof);
    }
    let mut raw = vec![0u8; width];
    src.copy_to_slice(&mut raw);
    let end = raw.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

/// Writes a string into a fixed-width, zero-padded field.
pub fn put_fixed_cstring(s: &str, width: usize, dst: &mut impl BufMut) {
    let bytes = s.as_bytes();
    let len = bytes.len().min(width.saturating_sub(1));
    dst.put_slice(&bytes[..len]);
    dst.put_bytes(0, width - len);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;

    #[test]
    fn ints_are_little_endian() {
        let mut buf = BytesMut::new();
        0x0102_0304_i32.encode_natnet(&mut buf);
        assert_eq!(&buf[..], &[0x04, 0x03, 0x02, 0x01]);
        let mut slice = buf.freeze();
        assert_eq!(i32::decode_natnet(&mut slice).unwrap(), 0x0102_0304);
    }

    #[test]
    fn short_buffer_is_eof_not_panic() {
        let mut slice: &[u8] = &[0x01, 0x02];
        assert!(matches!(
            i32::decode_natnet(&mut slice),
            Err(DecodeError::UnexpectedEof)
        ));
        let mut slice: &[u8] = &[0u8; 11];
        assert!(matches!(
            Vec3::decode_natnet(&mut slice),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn cstring_roundtrip() {
        let mut buf = BytesMut::new();
        put_cstring("RigidBody 1", &mut buf);
        let mut slice = buf.freeze();
        assert_eq!(read_cstring(&mut slice).unwrap(), "RigidBody 1");
        assert!(!slice.has_remaining());
    }

    #[test]
    fn unterminated_cstring_is_eof() {
        let mut slice: &[u8] = b"no terminator";
        assert!(matches!(
            read_cstring(&mut slice),
            Err(DecodeError::UnexpectedEof)
        ));
    }

    #[test]
    fn fixed_cstring_consumes_full_width() {
        let mut buf = BytesMut::new();
        put_fixed_cstring("Motive", 16, &mut buf);
        assert_eq!(buf.len(), 16);
        let mut slice = buf.freeze();
        assert_eq!(read_fixed_cstring(&mut slice, 16).unwrap(), "Motive");
        assert!(!slice.has_remaining());
    }
}
