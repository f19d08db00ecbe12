//! MQTT protocol definitions
//!
//! The harness speaks MQTT v3.1.1 as a plain subscribing client, so the
//! packet model is split by direction: [`Outgoing`] is everything it sends,
//! [`Incoming`] everything it accepts from a broker.

mod error;
mod packet;

pub use error::{DecodeError, EncodeError};
pub use packet::*;

use std::fmt;

/// Protocol name carried in CONNECT
pub const PROTOCOL_NAME: &str = "MQTT";

/// Protocol level byte sent in CONNECT for MQTT v3.1.1
pub const PROTOCOL_LEVEL: u8 = 4;

/// Control packet types the harness or its brokers put on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    Connect = 1,
    ConnAck = 2,
    Publish = 3,
    PubAck = 4,
    Subscribe = 8,
    SubAck = 9,
    PingReq = 12,
    PingResp = 13,
    Disconnect = 14,
}

impl PacketType {
    const ALL: [PacketType; 9] = [
        PacketType::Connect,
        PacketType::ConnAck,
        PacketType::Publish,
        PacketType::PubAck,
        PacketType::Subscribe,
        PacketType::SubAck,
        PacketType::PingReq,
        PacketType::PingResp,
        PacketType::Disconnect,
    ];

    /// Fixed header flags required by the protocol, `None` for PUBLISH
    pub fn fixed_flags(self) -> Option<u8> {
        match self {
            PacketType::Publish => None,
            PacketType::Subscribe => Some(0x02),
            _ => Some(0x00),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PacketType::Connect => "CONNECT",
            PacketType::ConnAck => "CONNACK",
            PacketType::Publish => "PUBLISH",
            PacketType::PubAck => "PUBACK",
            PacketType::Subscribe => "SUBSCRIBE",
            PacketType::SubAck => "SUBACK",
            PacketType::PingReq => "PINGREQ",
            PacketType::PingResp => "PINGRESP",
            PacketType::Disconnect => "DISCONNECT",
        };
        f.write_str(name)
    }
}

/// Maps the high nibble of a fixed header; the error is the unknown nibble
impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(nibble: u8) -> Result<Self, u8> {
        Self::ALL
            .into_iter()
            .find(|&kind| kind as u8 == nibble)
            .ok_or(nibble)
    }
}

/// Delivery guarantee of a PUBLISH or requested by a SUBSCRIBE
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum QoS {
    #[default]
    AtMostOnce = 0,
    AtLeastOnce = 1,
    /// Never requested by the harness, but a broker may still deliver it
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = u8;

    fn try_from(level: u8) -> Result<Self, u8> {
        Ok(match level {
            0 => QoS::AtMostOnce,
            1 => QoS::AtLeastOnce,
            2 => QoS::ExactlyOnce,
            _ => return Err(level),
        })
    }
}

/// CONNACK return code (MQTT v3.1.1 section 3.2.2.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ConnectReturnCode {
    #[default]
    Accepted = 0x00,
    UnacceptableProtocolVersion = 0x01,
    IdentifierRejected = 0x02,
    ServerUnavailable = 0x03,
    BadUserNameOrPassword = 0x04,
    NotAuthorized = 0x05,
}

impl TryFrom<u8> for ConnectReturnCode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        use ConnectReturnCode::*;
        [
            Accepted,
            UnacceptableProtocolVersion,
            IdentifierRejected,
            ServerUnavailable,
            BadUserNameOrPassword,
            NotAuthorized,
        ]
        .into_iter()
        .find(|&rc| rc as u8 == code)
        .ok_or(code)
    }
}

impl fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ConnectReturnCode::Accepted => "accepted",
            ConnectReturnCode::UnacceptableProtocolVersion => "broker refused MQTT v3.1.1",
            ConnectReturnCode::IdentifierRejected => "client id rejected",
            ConnectReturnCode::ServerUnavailable => "broker unavailable",
            ConnectReturnCode::BadUserNameOrPassword => "bad username or password",
            ConnectReturnCode::NotAuthorized => "not authorized",
        };
        f.write_str(reason)
    }
}

/// Per-filter SUBACK outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubAckReturnCode {
    /// Granted at this maximum QoS
    Granted(QoS),
    Failure,
}

impl TryFrom<u8> for SubAckReturnCode {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, u8> {
        match code {
            0x80 => Ok(SubAckReturnCode::Failure),
            _ => QoS::try_from(code).map(SubAckReturnCode::Granted),
        }
    }
}
