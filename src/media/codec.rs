//! Compressed-image codec collaborator.
//!
//! The pixel-level codec lives outside this crate. It is opened over a
//! complete payload and streams decoded blocks into a callback that returns
//! `false` to stop early.

use thiserror::Error;

use super::DecodedBlock;
use crate::error::ErrorKind;

/// Factory for decode sessions over a complete compressed payload.
pub trait ImageCodec: Send + Sync {
    /// Parse the payload's headers and prepare to decode.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] if the payload is not decodable.
    fn open<'a>(&self, payload: &'a [u8]) -> Result<Box<dyn CodecSession + 'a>, CodecError>;
}

/// One running decode.
pub trait CodecSession {
    /// Decode the whole image, passing each block to `sink`. Stops when
    /// `sink` returns `false`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError`] when decoding fails part way.
    fn decode(&mut self, sink: &mut dyn FnMut(DecodedBlock<'_>) -> bool) -> Result<(), CodecError>;
}

/// Ways an image decode can fail.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The codec refused to open the payload.
    #[error("codec rejected payload: {0}")]
    Rejected(String),
    /// The codec failed while decoding.
    #[error("decoding failed: {0}")]
    Failed(String),
    /// A block's pixel count disagrees with its dimensions.
    #[error("block declares {expected} pixels but carries {actual}")]
    BlockSize { expected: usize, actual: usize },
    /// A block does not fit the surface.
    #[error("block {width}x{height} at ({x}, {y}) falls outside the surface")]
    BlockOutOfBounds {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
    },
    /// A raw payload is not exactly one frame.
    #[error("raw payload holds {actual} bytes, expected {expected}")]
    RawSize { expected: usize, actual: usize },
    /// The background decode task panicked.
    #[error("decode task panicked: {0}")]
    Panicked(String),
    /// The background decode task was cancelled.
    #[error("decode task cancelled")]
    Cancelled,
}

impl CodecError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind { ErrorKind::CodecFailure }
}
