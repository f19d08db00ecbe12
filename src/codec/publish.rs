//! PUBLISH body, identical in both directions

use bytes::{BufMut, Bytes, BytesMut};

use super::{field_len, put_header, read_string, read_u16, write_string};
use crate::protocol::{DecodeError, EncodeError, PacketType, Publish, QoS};

fn is_topic_name(topic: &str) -> bool {
    !topic.is_empty() && !topic.contains(|c| c == '+' || c == '#')
}

/// Encode a complete PUBLISH packet
pub fn encode_publish(publish: &Publish, buf: &mut BytesMut) -> Result<(), EncodeError> {
    if !is_topic_name(&publish.topic) {
        return Err(EncodeError::InvalidTopic(publish.topic.clone()));
    }

    let packet_id = match publish.qos {
        QoS::AtMostOnce => None,
        _ => Some(
            publish
                .packet_id
                .filter(|&id| id != 0)
                .ok_or(EncodeError::MissingPacketId)?,
        ),
    };

    let mut flags = (publish.qos as u8) << 1;
    if publish.dup {
        flags |= 0x08;
    }
    if publish.retain {
        flags |= 0x01;
    }

    let remaining = field_len(publish.topic.as_bytes())
        + packet_id.map_or(0, |_| 2)
        + publish.payload.len();
    put_header(buf, PacketType::Publish, flags, remaining)?;
    write_string(buf, &publish.topic)?;
    if let Some(id) = packet_id {
        buf.put_u16(id);
    }
    buf.put_slice(&publish.payload);
    Ok(())
}

/// Decode a PUBLISH body given its fixed header flags
pub fn decode_publish(flags: u8, body: &[u8]) -> Result<Publish, DecodeError> {
    let qos_bits = (flags >> 1) & 0x03;
    let qos = QoS::try_from(qos_bits).map_err(DecodeError::InvalidQoS)?;
    let dup = flags & 0x08 != 0;
    if dup && qos == QoS::AtMostOnce {
        return Err(DecodeError::Malformed("DUP set on a QoS 0 PUBLISH"));
    }

    let (topic, mut pos) = read_string(body)?;
    if !is_topic_name(topic) {
        return Err(DecodeError::Malformed("PUBLISH topic is empty or has a wildcard"));
    }

    let packet_id = if qos == QoS::AtMostOnce {
        None
    } else {
        let id = read_u16(&body[pos..])?;
        if id == 0 {
            return Err(DecodeError::Malformed("PUBLISH packet id is 0"));
        }
        pos += 2;
        Some(id)
    };

    Ok(Publish {
        dup,
        qos,
        retain: flags & 0x01 != 0,
        topic: topic.to_string(),
        packet_id,
        payload: Bytes::copy_from_slice(&body[pos..]),
    })
}
