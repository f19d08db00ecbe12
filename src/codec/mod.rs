//! MQTT v3.1.1 wire codec
//!
//! [`Encoder`] writes what the harness sends and [`Decoder`] reads what a
//! broker sends back. Framing and the PUBLISH body are the same in both
//! directions, so they are public for in-process test brokers to reuse.

mod decode;
mod encode;
mod publish;


pub use decode::Decoder;
pub use encode::Encoder;
pub use publish::{decode_publish, encode_publish};

use bytes::{BufMut, BytesMut};

use crate::protocol::{DecodeError, EncodeError, PacketType};

/// Largest remaining length a fixed header can express
pub const MAX_REMAINING_LENGTH: usize = 268_435_455;

/// Largest packet body the decoder accepts by default
pub const DEFAULT_MAX_PACKET_SIZE: usize = 1024 * 1024;

/// One complete control packet at the front of a read buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    /// High nibble of the fixed header
    pub packet_type: u8,
    /// Low nibble of the fixed header
    pub flags: u8,
    /// Variable header and payload
    pub body: &'a [u8],
    /// Bytes the frame occupies, fixed header included
    pub len: usize,
}

impl Frame<'_> {
    /// Resolve the packet type and check its fixed header flags
    pub fn kind(&self) -> Result<PacketType, DecodeError> {
        let kind = PacketType::try_from(self.packet_type).map_err(DecodeError::InvalidPacketType)?;
        match kind.fixed_flags() {
            Some(expected) if expected != self.flags => Err(DecodeError::InvalidFlags(kind)),
            _ => Ok(kind),
        }
    }
}

/// Slice the next frame off `buf`. `None` until the whole frame is buffered.
pub fn split_frame(buf: &[u8], max_body: usize) -> Result<Option<Frame<'_>>, DecodeError> {
    let Some(&first) = buf.first() else {
        return Ok(None);
    };

    let (body_len, len_bytes) = match read_variable_int(&buf[1..]) {
        Ok((value, used)) => (value as usize, used),
        Err(DecodeError::Truncated) => return Ok(None),
        Err(e) => return Err(e),
    };
    if body_len > max_body {
        return Err(DecodeError::PacketTooLarge(body_len));
    }

    let header_len = 1 + len_bytes;
    let len = header_len + body_len;
    if buf.len() < len {
        return Ok(None);
    }

    Ok(Some(Frame {
        packet_type: first >> 4,
        flags: first & 0x0F,
        body: &buf[header_len..len],
        len,
    }))
}

/// Write a fixed header for a body of `remaining` bytes
pub fn put_header(
    buf: &mut BytesMut,
    kind: PacketType,
    flags: u8,
    remaining: usize,
) -> Result<(), EncodeError> {
    if remaining > MAX_REMAINING_LENGTH {
        return Err(EncodeError::PacketTooLarge(remaining));
    }
    buf.put_u8(((kind as u8) << 4) | (flags & 0x0F));
    write_variable_int(buf, remaining as u32);
    Ok(())
}

/// Read a variable byte integer; returns `(value, bytes used)`
pub fn read_variable_int(buf: &[u8]) -> Result<(u32, usize), DecodeError> {
    let mut value: u32 = 0;
    for (i, &byte) in buf.iter().enumerate() {
        if i == 4 {
            return Err(DecodeError::InvalidRemainingLength);
        }
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= 4 {
        return Err(DecodeError::InvalidRemainingLength);
    }
    Err(DecodeError::Truncated)
}

/// Write a variable byte integer. `value` must not exceed [`MAX_REMAINING_LENGTH`].
pub fn write_variable_int(buf: &mut BytesMut, mut value: u32) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            buf.put_u8(byte);
            return;
        }
        buf.put_u8(byte | 0x80);
    }
}

/// Read a big-endian two byte integer
pub fn read_u16(buf: &[u8]) -> Result<u16, DecodeError> {
    match buf {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(DecodeError::Truncated),
    }
}

/// Read a length-prefixed UTF-8 string; returns `(string, bytes used)`
pub fn read_string(buf: &[u8]) -> Result<(&str, usize), DecodeError> {
    let len = usize::from(read_u16(buf)?);
    let end = 2 + len;
    let raw = buf.get(2..end).ok_or(DecodeError::Truncated)?;
    let s = std::str::from_utf8(raw).map_err(|_| DecodeError::InvalidUtf8)?;

    // MQTT-1.5.3-2
    if s.contains('\0') {
        return Err(DecodeError::Malformed("string contains U+0000"));
    }
    Ok((s, end))
}

/// Write a length-prefixed UTF-8 string
pub fn write_string(buf: &mut BytesMut, s: &str) -> Result<(), EncodeError> {
    write_binary(buf, s.as_bytes())
}

/// Write length-prefixed binary data
pub fn write_binary(buf: &mut BytesMut, data: &[u8]) -> Result<(), EncodeError> {
    let len = u16::try_from(data.len()).map_err(|_| EncodeError::FieldTooLong(data.len()))?;
    buf.put_u16(len);
    buf.put_slice(data);
    Ok(())
}

/// Bytes a length-prefixed field occupies on the wire
pub(crate) fn field_len(data: &[u8]) -> usize {
    2 + data.len()
}
