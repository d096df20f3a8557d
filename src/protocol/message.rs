//! Typed protocol messages.
//!
//! Image data borrows from the transport buffer it was decoded from, so a
//! [`Message`] cannot outlive that buffer. Text is copied since items are
//! variable length.

use super::{ErrorCode, FontId, ImageFormat, ImageId, ImageResolution, MessageType, Rotation};

/// One decoded protocol unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message<'a> {
    /// Sender-chosen id, echoed in replies.
    pub id: u8,
    /// Typed payload.
    pub payload: Payload<'a>,
}

impl<'a> Message<'a> {
    /// Construct a message from its id and payload.
    #[must_use]
    pub const fn new(id: u8, payload: Payload<'a>) -> Self { Self { id, payload } }

    /// Type tag implied by the payload variant.
    #[must_use]
    pub const fn message_type(&self) -> MessageType { self.payload.message_type() }
}

/// Payload variants, one per message type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload<'a> {
    TextBatch(TextBatch),
    ImageStart(ImageStart<'a>),
    ImageChunk(ImageChunk<'a>),
    ImageEnd(ImageId),
    BacklightOn,
    BacklightOff,
    PingRequest,
    PingResponse,
    Ack(ErrorCode),
    Error(ErrorReport),
}

impl Payload<'_> {
    /// Type tag for this variant.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::TextBatch(_) => MessageType::TextBatch,
            Self::ImageStart(_) => MessageType::ImageStart,
            Self::ImageChunk(_) => MessageType::ImageChunk,
            Self::ImageEnd(_) => MessageType::ImageEnd,
            Self::BacklightOn => MessageType::BacklightOn,
            Self::BacklightOff => MessageType::BacklightOff,
            Self::PingRequest => MessageType::PingRequest,
            Self::PingResponse => MessageType::PingResponse,
            Self::Ack(_) => MessageType::Ack,
            Self::Error(_) => MessageType::Error,
        }
    }
}

/// Positioned text items sharing background, colour and rotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBatch {
    pub bg_color: u16,
    pub font_color: u16,
    pub rotation: Rotation,
    pub items: Vec<TextItem>,
}

/// One string drawn at a screen position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextItem {
    pub x: u16,
    pub y: u16,
    pub font: FontId,
    pub color: u16,
    pub text: String,
}

/// Announces an image transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageStart<'a> {
    pub image_id: ImageId,
    pub format: ImageFormat,
    pub resolution: ImageResolution,
    /// Display duration in milliseconds.
    pub delay_ms: u8,
    /// Size of the complete payload in bytes.
    pub total_size: u32,
    /// Number of chunks the payload is split into.
    pub chunk_count: u8,
    pub rotation: Rotation,
    /// Chunk 0 carried inline; empty when the first chunk arrives separately.
    pub embedded: &'a [u8],
}

/// One fragment of image data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageChunk<'a> {
    pub image_id: ImageId,
    pub chunk_id: u8,
    /// Byte offset the sender placed this chunk at.
    pub offset: u32,
    pub data: &'a [u8],
}

/// Diagnostic sent with a negative acknowledgement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub text: String,
}
