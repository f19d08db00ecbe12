//! Broker side of the wire
//!
//! The library only encodes what a client sends and decodes what a broker
//! sends. The fake broker needs the opposite directions, built here on the
//! library's framing and PUBLISH body.

use bytes::{BufMut, Bytes, BytesMut};

use lampcheck::codec::{
    decode_publish, encode_publish, put_header, read_string, read_u16, split_frame,
    DEFAULT_MAX_PACKET_SIZE,
};
use lampcheck::protocol::{
    Connect, DecodeError, EncodeError, Incoming, Outgoing, PacketType, QoS, SubAckReturnCode,
    Subscribe, PROTOCOL_LEVEL, PROTOCOL_NAME,
};

/// Decode the client packet at the front of `buf`
pub fn decode(buf: &[u8]) -> Result<Option<(Outgoing, usize)>, DecodeError> {
    let Some(frame) = split_frame(buf, DEFAULT_MAX_PACKET_SIZE)? else {
        return Ok(None);
    };

    let packet = match frame.kind()? {
        PacketType::Connect => Outgoing::Connect(decode_connect(frame.body)?),
        PacketType::Publish => Outgoing::Publish(decode_publish(frame.flags, frame.body)?),
        PacketType::PubAck => Outgoing::PubAck {
            packet_id: read_u16(frame.body)?,
        },
        PacketType::Subscribe => Outgoing::Subscribe(decode_subscribe(frame.body)?),
        PacketType::PingReq => Outgoing::PingReq,
        PacketType::Disconnect => Outgoing::Disconnect,
        other => return Err(DecodeError::UnexpectedPacket(other)),
    };
    Ok(Some((packet, frame.len)))
}

/// Encode a broker packet
pub fn encode(packet: &Incoming, buf: &mut BytesMut) -> Result<(), EncodeError> {
    match packet {
        Incoming::ConnAck(ack) => {
            put_header(buf, PacketType::ConnAck, 0, 2)?;
            buf.put_u8(u8::from(ack.session_present));
            buf.put_u8(ack.return_code as u8);
        }
        Incoming::Publish(publish) => encode_publish(publish, buf)?,
        Incoming::SubAck(ack) => {
            put_header(buf, PacketType::SubAck, 0, 2 + ack.return_codes.len())?;
            buf.put_u16(ack.packet_id);
            for code in &ack.return_codes {
                buf.put_u8(match code {
                    SubAckReturnCode::Granted(qos) => *qos as u8,
                    SubAckReturnCode::Failure => 0x80,
                });
            }
        }
        Incoming::PingResp => put_header(buf, PacketType::PingResp, 0, 0)?,
    }
    Ok(())
}

fn decode_connect(body: &[u8]) -> Result<Connect, DecodeError> {
    let (name, mut pos) = read_string(body)?;
    if name != PROTOCOL_NAME {
        return Err(DecodeError::Malformed("unknown protocol name"));
    }
    let &[level, flags, ..] = &body[pos..] else {
        return Err(DecodeError::Truncated);
    };
    if level != PROTOCOL_LEVEL {
        return Err(DecodeError::Malformed("only MQTT v3.1.1 is served"));
    }
    if flags & 0x01 != 0 {
        return Err(DecodeError::InvalidFlags(PacketType::Connect));
    }
    if flags & 0x3C != 0 {
        return Err(DecodeError::Malformed("will messages are not served"));
    }
    pos += 2;

    let keep_alive = read_u16(&body[pos..])?;
    pos += 2;

    let (client_id, used) = read_string(&body[pos..])?;
    pos += used;

    let username = if flags & 0x80 != 0 {
        let (username, used) = read_string(&body[pos..])?;
        pos += used;
        Some(username.to_string())
    } else {
        None
    };

    let password = if flags & 0x40 != 0 {
        let len = usize::from(read_u16(&body[pos..])?);
        let raw = body
            .get(pos + 2..pos + 2 + len)
            .ok_or(DecodeError::Truncated)?;
        Some(Bytes::copy_from_slice(raw))
    } else {
        None
    };

    Ok(Connect {
        client_id: client_id.to_string(),
        clean_session: flags & 0x02 != 0,
        keep_alive,
        username,
        password,
    })
}

/// The harness subscribes to exactly one filter per SUBSCRIBE
fn decode_subscribe(body: &[u8]) -> Result<Subscribe, DecodeError> {
    let packet_id = read_u16(body)?;
    let (filter, used) = read_string(&body[2..])?;

    let qos = match &body[2 + used..] {
        [options] => QoS::try_from(*options).map_err(DecodeError::InvalidQoS)?,
        [] => return Err(DecodeError::Truncated),
        _ => return Err(DecodeError::Malformed("more than one filter")),
    };

    Ok(Subscribe {
        packet_id,
        filter: filter.to_string(),
        qos,
    })
}
