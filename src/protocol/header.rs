//! The fixed five-byte header that opens every message.

use super::{DecodeError, MessageType};
use crate::byte_order::{read_wire_u16, write_wire_u16};

/// Start-of-frame marker.
pub const FRAME_MARKER: u8 = 0x7E;
/// Bytes occupied by marker, type, id and payload length.
pub const HEADER_LEN: usize = 5;
/// Largest payload a header can declare.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Parsed message header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MessageHeader {
    /// Message type tag.
    pub message_type: MessageType,
    /// Sender-chosen id echoed in replies.
    pub message_id: u8,
    /// Number of payload bytes following the header.
    pub payload_len: u16,
}

impl MessageHeader {
    /// Parse the header at the start of `bytes` and return it with the
    /// payload it declares. Bytes past the declared payload are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Truncated`] or [`DecodeError::BadMarker`] for an
    /// unreadable header, [`DecodeError::UnknownMessageType`] for an unknown
    /// type byte and [`DecodeError::PayloadLengthMismatch`] when the declared
    /// payload runs past the end of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<(Self, &[u8]), DecodeError> {
        let Some(&[marker, type_byte, message_id, len_hi, len_lo]) = bytes.first_chunk::<HEADER_LEN>()
        else {
            return Err(DecodeError::Truncated {
                needed: HEADER_LEN,
                available: bytes.len(),
            });
        };
        if marker != FRAME_MARKER {
            return Err(DecodeError::BadMarker(marker));
        }
        let message_type =
            MessageType::from_wire(type_byte).ok_or(DecodeError::UnknownMessageType(type_byte))?;
        let payload_len = read_wire_u16([len_hi, len_lo]);
        let end = HEADER_LEN + usize::from(payload_len);
        let payload = bytes
            .get(HEADER_LEN..end)
            .ok_or(DecodeError::PayloadLengthMismatch {
                declared: usize::from(payload_len),
                available: bytes.len() - HEADER_LEN,
            })?;
        Ok((
            Self {
                message_type,
                message_id,
                payload_len,
            },
            payload,
        ))
    }

    /// Wire bytes of this header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let [len_hi, len_lo] = write_wire_u16(self.payload_len);
        [
            FRAME_MARKER,
            self.message_type.as_wire(),
            self.message_id,
            len_hi,
            len_lo,
        ]
    }
}

/// Message id of a buffer whose header is at least readable, or 0.
///
/// Used to address error replies when full decoding fails.
///
/// ```
/// use mediaframe::protocol::peek_message_id;
///
/// assert_eq!(peek_message_id(&[0x7E, 0x01, 0x09, 0x00, 0x00]), 9);
/// assert_eq!(peek_message_id(&[0x00, 0x01, 0x09, 0x00, 0x00]), 0);
/// assert_eq!(peek_message_id(&[0x7E]), 0);
/// ```
#[must_use]
pub fn peek_message_id(bytes: &[u8]) -> u8 {
    match bytes.first_chunk::<HEADER_LEN>() {
        Some(&[FRAME_MARKER, _, message_id, _, _]) => message_id,
        _ => 0,
    }
}
