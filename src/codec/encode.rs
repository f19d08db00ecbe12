//! Encoder for the packets the harness sends

use bytes::{BufMut, BytesMut};

use super::{encode_publish, field_len, put_header, write_binary, write_string};
use crate::protocol::{
    Connect, EncodeError, Outgoing, PacketType, Subscribe, PROTOCOL_LEVEL, PROTOCOL_NAME,
};

const CONNECT_CLEAN_SESSION: u8 = 0x02;
const CONNECT_PASSWORD: u8 = 0x40;
const CONNECT_USERNAME: u8 = 0x80;

/// MQTT v3.1.1 client-side encoder
#[derive(Debug, Default, Clone, Copy)]
pub struct Encoder;

impl Encoder {
    pub fn new() -> Self {
        Self
    }

    /// Append one packet to `buf`
    pub fn encode(&self, packet: &Outgoing, buf: &mut BytesMut) -> Result<(), EncodeError> {
        match packet {
            Outgoing::Connect(connect) => encode_connect(connect, buf),
            Outgoing::Publish(publish) => encode_publish(publish, buf),
            Outgoing::PubAck { packet_id } => {
                put_header(buf, PacketType::PubAck, 0, 2)?;
                buf.put_u16(*packet_id);
                Ok(())
            }
            Outgoing::Subscribe(subscribe) => encode_subscribe(subscribe, buf),
            Outgoing::PingReq | Outgoing::Disconnect => {
                put_header(buf, packet.packet_type(), 0, 0)
            }
        }
    }
}

fn encode_connect(connect: &Connect, buf: &mut BytesMut) -> Result<(), EncodeError> {
    if connect.password.is_some() && connect.username.is_none() {
        return Err(EncodeError::PasswordWithoutUsername);
    }

    let mut flags = 0;
    if connect.clean_session {
        flags |= CONNECT_CLEAN_SESSION;
    }
    // protocol name, level, flags, keep alive, client id
    let mut remaining = field_len(PROTOCOL_NAME.as_bytes()) + 1 + 1 + 2;
    remaining += field_len(connect.client_id.as_bytes());
    if let Some(username) = &connect.username {
        flags |= CONNECT_USERNAME;
        remaining += field_len(username.as_bytes());
    }
    if let Some(password) = &connect.password {
        flags |= CONNECT_PASSWORD;
        remaining += field_len(password);
    }

    put_header(buf, PacketType::Connect, 0, remaining)?;
    write_string(buf, PROTOCOL_NAME)?;
    buf.put_u8(PROTOCOL_LEVEL);
    buf.put_u8(flags);
    buf.put_u16(connect.keep_alive);
    write_string(buf, &connect.client_id)?;
    if let Some(username) = &connect.username {
        write_string(buf, username)?;
    }
    if let Some(password) = &connect.password {
        write_binary(buf, password)?;
    }
    Ok(())
}

fn encode_subscribe(subscribe: &Subscribe, buf: &mut BytesMut) -> Result<(), EncodeError> {
    let remaining = 2 + field_len(subscribe.filter.as_bytes()) + 1;
    let flags = PacketType::Subscribe.fixed_flags().unwrap_or_default();

    put_header(buf, PacketType::Subscribe, flags, remaining)?;
    buf.put_u16(subscribe.packet_id);
    write_string(buf, &subscribe.filter)?;
    buf.put_u8(subscribe.qos as u8);
    Ok(())
}
