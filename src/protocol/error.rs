//! Wire errors

use std::fmt;

use super::PacketType;

/// A frame from the broker could not be turned into an [`Incoming`](super::Incoming) packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Header nibble names no MQTT v3.1.1 packet
    InvalidPacketType(u8),
    /// A valid packet that a broker never sends to a client
    UnexpectedPacket(PacketType),
    /// Remaining length runs past four bytes
    InvalidRemainingLength,
    /// Remaining length above the decoder limit
    PacketTooLarge(usize),
    InvalidFlags(PacketType),
    InvalidQoS(u8),
    InvalidReturnCode(u8),
    InvalidUtf8,
    /// A field runs past the end of its packet
    Truncated,
    Malformed(&'static str),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPacketType(t) => write!(f, "unknown packet type {}", t),
            Self::UnexpectedPacket(t) => write!(f, "{} is not sent by brokers", t),
            Self::InvalidRemainingLength => write!(f, "remaining length longer than 4 bytes"),
            Self::PacketTooLarge(len) => write!(f, "packet of {} bytes exceeds limit", len),
            Self::InvalidFlags(t) => write!(f, "invalid {} header flags", t),
            Self::InvalidQoS(q) => write!(f, "invalid QoS {}", q),
            Self::InvalidReturnCode(r) => write!(f, "invalid return code 0x{:02x}", r),
            Self::InvalidUtf8 => write!(f, "string is not valid UTF-8"),
            Self::Truncated => write!(f, "field runs past end of packet"),
            Self::Malformed(msg) => write!(f, "malformed packet: {}", msg),
        }
    }
}

impl std::error::Error for DecodeError {}

/// An [`Outgoing`](super::Outgoing) packet could not be put on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// Remaining length above the protocol maximum
    PacketTooLarge(usize),
    /// String or binary field above 65535 bytes
    FieldTooLong(usize),
    /// Topic is empty or carries a wildcard
    InvalidTopic(String),
    /// QoS > 0 PUBLISH without a non-zero packet id
    MissingPacketId,
    /// MQTT-3.1.2-22
    PasswordWithoutUsername,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PacketTooLarge(len) => write!(f, "packet of {} bytes is too large", len),
            Self::FieldTooLong(len) => write!(f, "field of {} bytes is too long", len),
            Self::InvalidTopic(topic) => write!(f, "cannot publish to '{}'", topic),
            Self::MissingPacketId => write!(f, "QoS 1 and 2 PUBLISH need a packet id"),
            Self::PasswordWithoutUsername => write!(f, "password set without username"),
        }
    }
}

impl std::error::Error for EncodeError {}
