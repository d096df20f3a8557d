//! Errors produced while reassembling image transfers.

use thiserror::Error;

use crate::{
    error::ErrorKind,
    protocol::{ImageFormat, ImageId},
};

/// Reasons an image message could not be applied.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ReassemblyError {
    /// No active transfer has this id.
    #[error("no active transfer for image {image_id}")]
    ImageIdMismatch { image_id: ImageId },
    /// A chunk id is not below the transfer's chunk count.
    #[error("chunk {chunk_id} of image {image_id} is outside 0..{expected}")]
    ChunkOutOfRange {
        image_id: ImageId,
        chunk_id: u8,
        expected: u8,
    },
    /// An image start announced zero chunks.
    #[error("image {image_id} announced no chunks")]
    EmptyTransfer { image_id: ImageId },
    /// Chunk data would run past the announced total size.
    #[error("image {image_id} overflows: {attempted} bytes of {total}")]
    Overflow {
        image_id: ImageId,
        attempted: usize,
        total: usize,
    },
    /// Every chunk arrived but the byte count is wrong.
    #[error("image {image_id} complete with {received} bytes, expected {total}")]
    LengthDisagreement {
        image_id: ImageId,
        received: usize,
        total: usize,
    },
    /// The transfer ended before every chunk arrived.
    #[error("image {image_id} ended with {received} of {expected} chunks")]
    IncompleteTransfer {
        image_id: ImageId,
        received: u32,
        expected: u8,
    },
    /// The announced size exceeds the configured maximum.
    #[error("image {image_id} of {size} bytes exceeds the {max}-byte limit")]
    TooLarge {
        image_id: ImageId,
        size: usize,
        max: usize,
    },
    /// Payload or surface storage could not be allocated.
    #[error("out of memory allocating image {image_id}")]
    OutOfMemory { image_id: ImageId },
    /// The image format cannot be displayed.
    #[error("image {image_id} has unsupported format {format:?}")]
    UnsupportedFormat {
        image_id: ImageId,
        format: ImageFormat,
    },
}

impl ReassemblyError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::ImageIdMismatch { .. } => ErrorKind::ImageIdMismatch,
            Self::ChunkOutOfRange { .. } | Self::EmptyTransfer { .. } => ErrorKind::InvalidFormat,
            Self::Overflow { .. }
            | Self::LengthDisagreement { .. }
            | Self::IncompleteTransfer { .. } => ErrorKind::PayloadLengthMismatch,
            Self::TooLarge { .. } | Self::OutOfMemory { .. } => ErrorKind::OutOfMemory,
            Self::UnsupportedFormat { .. } => ErrorKind::UnsupportedImageFormat,
        }
    }

    /// Image the error refers to.
    #[must_use]
    pub const fn image_id(&self) -> ImageId {
        match *self {
            Self::ImageIdMismatch { image_id }
            | Self::ChunkOutOfRange { image_id, .. }
            | Self::EmptyTransfer { image_id }
            | Self::Overflow { image_id, .. }
            | Self::LengthDisagreement { image_id, .. }
            | Self::IncompleteTransfer { image_id, .. }
            | Self::TooLarge { image_id, .. }
            | Self::OutOfMemory { image_id }
            | Self::UnsupportedFormat { image_id, .. } => image_id,
        }
    }
}
