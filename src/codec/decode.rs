//! Decoder for the packets a broker sends to the harness

use super::{decode_publish, read_u16, split_frame, DEFAULT_MAX_PACKET_SIZE};
use crate::protocol::{
    ConnAck, ConnectReturnCode, DecodeError, Incoming, PacketType, SubAck, SubAckReturnCode,
};

/// MQTT v3.1.1 client-side decoder
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    max_packet_size: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
        }
    }

    pub fn with_max_packet_size(max_packet_size: usize) -> Self {
        Self { max_packet_size }
    }

    /// Decode the packet at the front of `buf`.
    ///
    /// Returns the packet and the bytes it used, or `None` while the buffer
    /// does not yet hold a complete frame.
    pub fn decode(&self, buf: &[u8]) -> Result<Option<(Incoming, usize)>, DecodeError> {
        let Some(frame) = split_frame(buf, self.max_packet_size)? else {
            return Ok(None);
        };

        let packet = match frame.kind()? {
            PacketType::ConnAck => Incoming::ConnAck(decode_connack(frame.body)?),
            PacketType::Publish => Incoming::Publish(decode_publish(frame.flags, frame.body)?),
            PacketType::SubAck => Incoming::SubAck(decode_suback(frame.body)?),
            PacketType::PingResp if frame.body.is_empty() => Incoming::PingResp,
            PacketType::PingResp => return Err(DecodeError::Malformed("PINGRESP has a body")),
            other => return Err(DecodeError::UnexpectedPacket(other)),
        };
        Ok(Some((packet, frame.len)))
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_connack(body: &[u8]) -> Result<ConnAck, DecodeError> {
    let [ack_flags, code] = body else {
        return Err(DecodeError::Malformed("CONNACK body must be 2 bytes"));
    };
    // Only the session present bit may be set
    if ack_flags & 0xFE != 0 {
        return Err(DecodeError::InvalidFlags(PacketType::ConnAck));
    }
    let return_code =
        ConnectReturnCode::try_from(*code).map_err(DecodeError::InvalidReturnCode)?;

    Ok(ConnAck {
        session_present: ack_flags & 0x01 != 0,
        return_code,
    })
}

fn decode_suback(body: &[u8]) -> Result<SubAck, DecodeError> {
    let packet_id = read_u16(body)?;
    let codes = &body[2..];
    if codes.is_empty() {
        return Err(DecodeError::Malformed("SUBACK without return codes"));
    }

    let return_codes = codes
        .iter()
        .map(|&code| SubAckReturnCode::try_from(code).map_err(DecodeError::InvalidReturnCode))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SubAck {
        packet_id,
        return_codes,
    })
}
