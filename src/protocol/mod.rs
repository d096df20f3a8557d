//! Wire protocol spoken by the peripheral link.
//!
//! Every transport transaction carries one message: a five-byte
//! [`MessageHeader`] followed by a payload whose layout depends on the
//! message type. [`decode`] turns the occupied bytes of a transport buffer
//! into a [`Message`] that borrows image data from that buffer; [`encode`]
//! and the reply helpers build frames for the peer.

pub mod decode;
pub mod encode;
pub mod error;
pub mod header;
pub mod message;
pub mod types;

pub use decode::decode;
pub use encode::{ack_frame, encode, error_frame};
pub use error::{DecodeError, EncodeError};
pub use header::{FRAME_MARKER, HEADER_LEN, MAX_PAYLOAD_LEN, MessageHeader, peek_message_id};
pub use message::{ErrorReport, ImageChunk, ImageStart, Message, Payload, TextBatch, TextItem};
pub use types::{
    ErrorCode,
    FontId,
    ImageFormat,
    ImageId,
    ImageResolution,
    MessageType,
    Rotation,
    pack_format,
};
