//! Error types for adapter communication.

use std::io;
use thiserror::Error;

/// Errors that can occur while talking to an adapter.
#[derive(Error, Debug)]
pub enum NeoError {
    /// I/O error while writing to the transport.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A hardware record could not be decoded.
    #[error("Malformed frame: {reason}")]
    MalformedFrame { reason: String },

    /// A message cannot be represented on the target hardware.
    #[error("Unsupported frame: {reason}")]
    UnsupportedFrame { reason: String },

    /// A region read was requested with a misaligned position or length.
    #[error(
        "Invalid alignment: pos={pos} amount={amount} (block size bounds {min}..={max})"
    )]
    InvalidAlignment {
        pos: u64,
        amount: u64,
        min: u64,
        max: u64,
    },

    /// A value does not fit the width of its wire field.
    #[error("Overflow: {what}")]
    Overflow { what: String },

    /// Operation timed out.
    #[error("Operation timed out")]
    Timeout,

    /// The device replied with something the protocol does not allow.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// The transport is no longer accepting frames.
    #[error("Transport closed")]
    TransportClosed,

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, NeoError>;

impl NeoError {
    /// Create a new malformed frame error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedFrame {
            reason: reason.into(),
        }
    }

    /// Create a new unsupported frame error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedFrame {
            reason: reason.into(),
        }
    }

    /// Create a new overflow error.
    pub fn overflow(what: impl Into<String>) -> Self {
        Self::Overflow { what: what.into() }
    }

    /// Create a new protocol error.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolError(msg.into())
    }

    /// Check if this error is recoverable (transient).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if e.kind() == io::ErrorKind::WouldBlock
                || e.kind() == io::ErrorKind::TimedOut
                || e.kind() == io::ErrorKind::Interrupted
        ) || matches!(self, Self::Timeout)
    }
}
