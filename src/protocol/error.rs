//! Errors raised while decoding or encoding protocol messages.

use thiserror::Error;

use super::MessageType;
use crate::error::ErrorKind;

/// Reasons a buffer could not be decoded into a [`Message`](super::Message).
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Fewer bytes than a header were received.
    #[error("buffer holds {available} bytes, shorter than the {needed}-byte header")]
    Truncated { needed: usize, available: usize },
    /// The first byte was not the frame marker.
    #[error("bad frame marker {0:#04x}")]
    BadMarker(u8),
    /// The type byte names no known message.
    #[error("unknown message type {0:#04x}")]
    UnknownMessageType(u8),
    /// Header and declared payload do not fit in the received bytes.
    #[error("declared payload of {declared} bytes exceeds the {available} bytes received")]
    PayloadLengthMismatch { declared: usize, available: usize },
    /// An image chunk's data length disagrees with its payload length.
    #[error("chunk declares {declared} data bytes but payload carries {actual}")]
    ChunkLengthMismatch { declared: usize, actual: usize },
    /// The payload does not follow the layout of its message type.
    #[error("malformed {message_type:?} payload: {reason}")]
    Malformed {
        message_type: MessageType,
        reason: &'static str,
    },
    /// An enumeration byte is outside its range.
    #[error("invalid {field} value {value}")]
    InvalidEnum { field: &'static str, value: u8 },
    /// Text bytes are not valid UTF-8.
    #[error("text is not valid UTF-8")]
    InvalidUtf8,
}

impl DecodeError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownMessageType(_) => ErrorKind::UnknownMessageType,
            Self::PayloadLengthMismatch { .. } | Self::ChunkLengthMismatch { .. } => {
                ErrorKind::PayloadLengthMismatch
            }
            Self::Truncated { .. }
            | Self::BadMarker(_)
            | Self::Malformed { .. }
            | Self::InvalidEnum { .. }
            | Self::InvalidUtf8 => ErrorKind::InvalidFormat,
        }
    }
}

/// A message holds a field too large for its wire encoding.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("{field} of {len} exceeds the wire maximum of {max}")]
pub struct EncodeError {
    /// Name of the oversized field.
    pub field: &'static str,
    /// Actual size.
    pub len: usize,
    /// Largest encodable size.
    pub max: usize,
}
