//! Packets, split by the direction the harness sees them travel

use bytes::Bytes;

use super::{ConnectReturnCode, PacketType, QoS, SubAckReturnCode};

/// What the harness sends to a broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    Connect(Connect),
    Publish(Publish),
    /// Acknowledges a QoS 1 delivery
    PubAck { packet_id: u16 },
    Subscribe(Subscribe),
    PingReq,
    Disconnect,
}

impl Outgoing {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Outgoing::Connect(_) => PacketType::Connect,
            Outgoing::Publish(_) => PacketType::Publish,
            Outgoing::PubAck { .. } => PacketType::PubAck,
            Outgoing::Subscribe(_) => PacketType::Subscribe,
            Outgoing::PingReq => PacketType::PingReq,
            Outgoing::Disconnect => PacketType::Disconnect,
        }
    }
}

/// What the harness accepts from a broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Incoming {
    ConnAck(ConnAck),
    Publish(Publish),
    SubAck(SubAck),
    PingResp,
}

impl Incoming {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Incoming::ConnAck(_) => PacketType::ConnAck,
            Incoming::Publish(_) => PacketType::Publish,
            Incoming::SubAck(_) => PacketType::SubAck,
            Incoming::PingResp => PacketType::PingResp,
        }
    }
}

/// Session request. The harness never sends a will message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connect {
    /// Empty lets the broker assign one
    pub client_id: String,
    pub clean_session: bool,
    /// Seconds; 0 disables keep-alive
    pub keep_alive: u16,
    pub username: Option<String>,
    pub password: Option<Bytes>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnAck {
    pub session_present: bool,
    pub return_code: ConnectReturnCode,
}

/// Application message, in either direction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Publish {
    pub dup: bool,
    pub qos: QoS,
    pub retain: bool,
    pub topic: String,
    /// Present only for QoS > 0
    pub packet_id: Option<u16>,
    pub payload: Bytes,
}

/// Subscription to a single topic filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscribe {
    pub packet_id: u16,
    pub filter: String,
    pub qos: QoS,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubAck {
    pub packet_id: u16,
    /// One per requested filter, in request order
    pub return_codes: Vec<SubAckReturnCode>,
}

impl SubAck {
    /// True if the broker refused any filter
    pub fn has_failure(&self) -> bool {
        self.return_codes.contains(&SubAckReturnCode::Failure)
    }
}
