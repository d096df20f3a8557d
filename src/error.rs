//! Canonical error taxonomy and result types for the crate.
//!
//! Every component reports failures through its own `thiserror` enum; each of
//! those maps onto an [`ErrorKind`] so statistics, metrics and replies to the
//! protocol peer share a single vocabulary. [`MediaframeError`] is the
//! umbrella used where several components meet.

use thiserror::Error;

use crate::{
    config::ConfigError,
    media::CodecError,
    pool::PoolError,
    protocol::{DecodeError, ErrorCode},
    reassembly::ReassemblyError,
    scheduler::EnqueueError,
};

/// Classification shared by every failure the pipeline can observe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Framing or payload layout is malformed.
    InvalidFormat,
    /// The message-type byte does not name a known message.
    UnknownMessageType,
    /// A declared length disagrees with the bytes actually available.
    PayloadLengthMismatch,
    /// An image id has no active transfer, or collides with one.
    ImageIdMismatch,
    /// Storage for an image transfer could not be allocated.
    OutOfMemory,
    /// No transport buffer is free.
    PoolExhausted,
    /// A transfer exceeded its time budget.
    TransferTimeout,
    /// The image codec rejected or failed to decode a payload.
    CodecFailure,
    /// The image format is recognised but not supported.
    UnsupportedImageFormat,
    /// A bounded queue refused an item.
    QueueFull,
    /// Invariant violations and collaborator failures.
    Internal,
}

impl ErrorKind {
    /// Stable label used for metrics and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidFormat => "invalid_format",
            Self::UnknownMessageType => "unknown_message_type",
            Self::PayloadLengthMismatch => "payload_length_mismatch",
            Self::ImageIdMismatch => "image_id_mismatch",
            Self::OutOfMemory => "out_of_memory",
            Self::PoolExhausted => "pool_exhausted",
            Self::TransferTimeout => "transfer_timeout",
            Self::CodecFailure => "codec_failure",
            Self::UnsupportedImageFormat => "unsupported_image_format",
            Self::QueueFull => "queue_full",
            Self::Internal => "internal",
        }
    }

    /// Wire code reported to the protocol peer for this kind of failure.
    ///
    /// ```
    /// use mediaframe::{ErrorKind, protocol::ErrorCode};
    ///
    /// assert_eq!(ErrorKind::ImageIdMismatch.error_code(), ErrorCode::ImageIdMismatch);
    /// assert_eq!(ErrorKind::TransferTimeout.error_code(), ErrorCode::InternalError);
    /// ```
    #[must_use]
    pub const fn error_code(self) -> ErrorCode {
        match self {
            Self::InvalidFormat => ErrorCode::InvalidFormat,
            Self::UnknownMessageType => ErrorCode::UnknownMessageType,
            Self::PayloadLengthMismatch => ErrorCode::PayloadLengthMismatch,
            Self::ImageIdMismatch => ErrorCode::ImageIdMismatch,
            Self::OutOfMemory => ErrorCode::OutOfMemory,
            Self::UnsupportedImageFormat => ErrorCode::UnsupportedImageFormat,
            Self::PoolExhausted
            | Self::TransferTimeout
            | Self::CodecFailure
            | Self::QueueFull
            | Self::Internal => ErrorCode::InternalError,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Top-level error type exposed by `mediaframe`.
#[derive(Debug, Error)]
pub enum MediaframeError {
    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A transport buffer operation failed.
    #[error("buffer pool error: {0}")]
    Pool(#[from] PoolError),
    /// A buffer did not hold a valid protocol message.
    #[error("protocol error: {0}")]
    Decode(#[from] DecodeError),
    /// An image transfer could not be applied.
    #[error("reassembly error: {0}")]
    Reassembly(#[from] ReassemblyError),
    /// Image decoding failed.
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
    /// The display queue rejected an item.
    #[error("scheduler error: {0}")]
    Enqueue(#[from] EnqueueError),
}

impl MediaframeError {
    /// Classify the error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) => ErrorKind::Internal,
            Self::Pool(error) => error.kind(),
            Self::Decode(error) => error.kind(),
            Self::Reassembly(error) => error.kind(),
            Self::Codec(_) => ErrorKind::CodecFailure,
            Self::Enqueue(error) => error.kind(),
        }
    }
}

/// Canonical result alias used by `mediaframe` public APIs.
pub type Result<T> = std::result::Result<T, MediaframeError>;
