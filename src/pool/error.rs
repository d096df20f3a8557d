//! Errors reported by the buffer pool.

use thiserror::Error;

use super::{Ownership, SlotId};
use crate::error::ErrorKind;

/// Failures of [`BufferPool`](super::BufferPool) operations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Every buffer is with the transport or the pipeline.
    #[error("no free transport buffer")]
    PoolExhausted,
    /// The transport refused a submission; the buffer is free again.
    #[error("transport rejected buffer {slot}")]
    TransportRejected { slot: SlotId },
    /// A completion reported more bytes than the buffer holds.
    #[error("buffer {slot} received {len} bytes, capacity is {capacity}")]
    LengthOutOfBounds {
        slot: SlotId,
        len: usize,
        capacity: usize,
    },
    /// A buffer changed hands from a stage that did not own it.
    #[error("buffer {slot} is owned by {actual:?}, expected {expected:?}")]
    OwnershipViolation {
        slot: SlotId,
        expected: Ownership,
        actual: Ownership,
    },
    /// A buffer was released that the pipeline does not hold.
    #[error("buffer {slot} released while not held by the pipeline")]
    DoubleRelease { slot: SlotId },
}

impl PoolError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PoolExhausted | Self::TransportRejected { .. } => ErrorKind::PoolExhausted,
            Self::LengthOutOfBounds { .. } => ErrorKind::PayloadLengthMismatch,
            Self::OwnershipViolation { .. } | Self::DoubleRelease { .. } => ErrorKind::Internal,
        }
    }
}
