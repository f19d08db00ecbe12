//! Harness error types

use std::fmt;

use crate::protocol::{ConnectReturnCode, DecodeError, EncodeError};

/// Errors raised inside the harness
///
/// Connection-level variants never reach test code: `connect()` logs them and
/// reports `false`. Test functions may return them, in which case the
/// orchestrator records a single failing result.
#[derive(Debug)]
pub enum HarnessError {
    /// Broker unreachable or connection lost
    Connection(String),
    /// Broker refused the CONNECT
    Rejected(ConnectReturnCode),
    /// Expected condition not observed in time
    Timeout,
    /// Packet encoding failed
    Encode(EncodeError),
    /// Packet decoding failed
    Decode(DecodeError),
    /// Socket I/O error
    Io(std::io::Error),
    /// Unexpected fault inside a test body
    Fault(String),
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HarnessError::Connection(msg) => write!(f, "Connection error: {}", msg),
            HarnessError::Rejected(code) => write!(f, "Connection rejected: {}", code),
            HarnessError::Timeout => write!(f, "Operation timed out"),
            HarnessError::Encode(e) => write!(f, "Encode error: {}", e),
            HarnessError::Decode(e) => write!(f, "Decode error: {}", e),
            HarnessError::Io(e) => write!(f, "IO error: {}", e),
            HarnessError::Fault(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for HarnessError {}

impl From<EncodeError> for HarnessError {
    fn from(e: EncodeError) -> Self {
        HarnessError::Encode(e)
    }
}

impl From<DecodeError> for HarnessError {
    fn from(e: DecodeError) -> Self {
        HarnessError::Decode(e)
    }
}

impl From<std::io::Error> for HarnessError {
    fn from(e: std::io::Error) -> Self {
        HarnessError::Io(e)
    }
}
