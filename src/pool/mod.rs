//! Pool of transport buffers circulating between the transport and the
//! pipeline.
//!
//! The pool allocates every buffer up front and afterwards only moves them
//! between three owners: the free list, the [`Transport`] collaborator and
//! the pipeline. A ledger behind the pool's lock records the owner of each
//! slot, so a buffer can never be resubmitted to the transport while the
//! pipeline still reads it.

mod buffer;
mod error;

use std::sync::{Arc, PoisonError};
#[cfg(not(loom))]
use std::sync::Mutex;

pub use buffer::{SlotId, TransportBuffer};
pub use error::PoolError;
use log::{debug, error, warn};
#[cfg(loom)]
use loom::sync::Mutex;

/// Largest number of buffers a pool can hold.
pub const MAX_BUFFERS: usize = u8::MAX as usize + 1;

/// Stage currently holding a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// On the free list.
    Free,
    /// Queued with or filled by the transport.
    Transport,
    /// Being decoded by the pipeline.
    Pipeline,
}

/// Receive side of the peripheral link.
///
/// `submit` queues a buffer for the next receive. A transport that cannot
/// take another buffer hands it back. Completions are reported to the
/// pipeline's [`CompletionPort`](crate::pipeline::CompletionPort).
pub trait Transport: Send + Sync {
    /// Queue `buffer` for a future receive.
    ///
    /// # Errors
    ///
    /// Returns the buffer when the transport's queue is full.
    fn submit(&self, buffer: TransportBuffer) -> Result<(), TransportBuffer>;
}

#[derive(Debug)]
struct Ledger {
    owners: Vec<Ownership>,
    free: Vec<TransportBuffer>,
}

/// Fixed set of transport buffers with an ownership ledger.
pub struct BufferPool {
    ledger: Mutex<Ledger>,
    transport: Arc<dyn Transport>,
    buffer_capacity: usize,
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("buffer_capacity", &self.buffer_capacity)
            .finish_non_exhaustive()
    }
}

impl BufferPool {
    /// Allocate `count` buffers of `buffer_capacity` bytes, all free.
    ///
    /// `count` is clamped to [`MAX_BUFFERS`].
    #[must_use]
    pub fn new(count: usize, buffer_capacity: usize, transport: Arc<dyn Transport>) -> Self {
        let count = count.min(MAX_BUFFERS);
        // pop() hands out slot 0 first
        let free = (0..count)
            .rev()
            .filter_map(|slot| u8::try_from(slot).ok())
            .map(|slot| TransportBuffer::new(SlotId::new(slot), buffer_capacity))
            .collect::<Vec<_>>();
        Self {
            ledger: Mutex::new(Ledger {
                owners: vec![Ownership::Free; free.len()],
                free,
            }),
            transport,
            buffer_capacity,
        }
    }

    fn ledger(&self) -> impl std::ops::DerefMut<Target = Ledger> + '_ {
        self.ledger.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of buffers the pool manages.
    #[must_use]
    pub fn capacity(&self) -> usize { self.ledger().owners.len() }

    /// Size in bytes of each buffer.
    #[must_use]
    pub fn buffer_capacity(&self) -> usize { self.buffer_capacity }

    /// Number of buffers on the free list.
    #[must_use]
    pub fn free_count(&self) -> usize { self.ledger().free.len() }

    /// Recorded owner of `slot`, or `None` for a slot outside the pool.
    #[must_use]
    pub fn ownership(&self, slot: SlotId) -> Option<Ownership> {
        self.ledger().owners.get(slot.index()).copied()
    }

    /// Take a free buffer for submission to the transport.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::PoolExhausted`] when no buffer is free. This never
    /// blocks.
    pub fn acquire_free(&self) -> Result<TransportBuffer, PoolError> {
        let mut ledger = self.ledger();
        let buffer = ledger.free.pop().ok_or(PoolError::PoolExhausted)?;
        ledger.owners[buffer.slot().index()] = Ownership::Transport;
        Ok(buffer)
    }

    /// Hand an acquired buffer to the transport for the next receive.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::TransportRejected`] if the transport refuses the
    /// buffer, which is then back on the free list.
    pub fn submit_to_transport(&self, buffer: TransportBuffer) -> Result<(), PoolError> {
        let slot = buffer.slot();
        match self.transport.submit(buffer) {
            Ok(()) => {
                debug!("buffer submitted to transport: slot={slot}");
                Ok(())
            }
            Err(mut buffer) => {
                warn!("transport rejected buffer: slot={slot}");
                buffer.set_len(0);
                let mut ledger = self.ledger();
                ledger.owners[slot.index()] = Ownership::Free;
                ledger.free.push(buffer);
                Err(PoolError::TransportRejected { slot })
            }
        }
    }

    /// Record that the transport filled `len` bytes of `buffer`; the
    /// pipeline now owns it.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::LengthOutOfBounds`] if `len` exceeds the buffer's
    /// capacity and [`PoolError::OwnershipViolation`] if the ledger does not
    /// record the buffer with the transport. In both cases the buffer returns
    /// to the free list.
    pub fn mark_received(
        &self,
        mut buffer: TransportBuffer,
        len: usize,
    ) -> Result<TransportBuffer, PoolError> {
        let slot = buffer.slot();
        let capacity = buffer.capacity();
        let mut ledger = self.ledger();
        let Some(&actual) = ledger.owners.get(slot.index()) else {
            error!("completion for a buffer outside the pool: slot={slot}");
            return Err(PoolError::OwnershipViolation {
                slot,
                expected: Ownership::Transport,
                actual: Ownership::Free,
            });
        };
        let outcome = if actual != Ownership::Transport {
            Err(PoolError::OwnershipViolation {
                slot,
                expected: Ownership::Transport,
                actual,
            })
        } else if len > capacity {
            Err(PoolError::LengthOutOfBounds {
                slot,
                len,
                capacity,
            })
        } else {
            Ok(())
        };
        match outcome {
            Ok(()) => {
                ledger.owners[slot.index()] = Ownership::Pipeline;
                buffer.set_len(len);
                Ok(buffer)
            }
            Err(e) => {
                warn!("completion refused; buffer returned to free list: error={e}");
                buffer.set_len(0);
                ledger.owners[slot.index()] = Ownership::Free;
                ledger.free.push(buffer);
                Err(e)
            }
        }
    }

    /// Return a buffer the pipeline has finished with to the free list.
    ///
    /// Releasing a buffer the ledger does not record as pipeline-owned is a
    /// bug: debug builds panic, release builds log the violation, leave the
    /// ledger untouched and drop the handle.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::DoubleRelease`] for such a release.
    pub fn release(&self, mut buffer: TransportBuffer) -> Result<(), PoolError> {
        let slot = buffer.slot();
        let mut ledger = self.ledger();
        match ledger.owners.get(slot.index()) {
            Some(Ownership::Pipeline) => {
                buffer.set_len(0);
                ledger.owners[slot.index()] = Ownership::Free;
                ledger.free.push(buffer);
                Ok(())
            }
            owner => {
                error!("buffer released while not held by the pipeline: slot={slot}, owner={owner:?}");
                drop(ledger);
                if cfg!(debug_assertions) {
                    panic!("double release of transport buffer {slot}");
                }
                Err(PoolError::DoubleRelease { slot })
            }
        }
    }

    /// Release `buffer` and immediately resubmit a free buffer to the
    /// transport.
    ///
    /// # Errors
    ///
    /// Propagates the [`PoolError`] of the release or of the resubmission.
    pub fn recycle(&self, buffer: TransportBuffer) -> Result<(), PoolError> {
        self.release(buffer)?;
        let next = self.acquire_free()?;
        self.submit_to_transport(next)
    }

    /// Submit every free buffer to the transport, stopping at the first
    /// rejection. Returns how many buffers were submitted.
    pub fn replenish(&self) -> usize {
        let mut submitted = 0;
        while let Ok(buffer) = self.acquire_free() {
            if self.submit_to_transport(buffer).is_err() {
                break;
            }
            submitted += 1;
        }
        submitted
    }
}

#[cfg(test)]
mod tests;
