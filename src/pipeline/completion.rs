//! Hand-off from the transport's completion context.

use std::sync::Arc;

use log::{debug, warn};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    metrics,
    pool::{BufferPool, TransportBuffer},
    stats::PipelineStats,
};

/// Result the transport reports with a finished receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferStatus {
    /// The buffer holds received bytes.
    Complete,
    /// The receive failed; the buffer content is meaningless.
    Failed,
}

/// Entry point the transport calls when a receive completes.
///
/// [`complete`](Self::complete) never blocks or awaits, so it is safe to call
/// from the transport's own completion context. When the decode context is
/// behind, the newest buffer is dropped and immediately resubmitted.
#[derive(Clone)]
pub struct CompletionPort {
    pool: Arc<BufferPool>,
    tx: mpsc::Sender<TransportBuffer>,
    stats: Arc<PipelineStats>,
}

impl std::fmt::Debug for CompletionPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionPort")
            .field("queued", &(self.tx.max_capacity() - self.tx.capacity()))
            .finish_non_exhaustive()
    }
}

impl CompletionPort {
    pub(crate) fn new(
        pool: Arc<BufferPool>,
        tx: mpsc::Sender<TransportBuffer>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self { pool, tx, stats }
    }

    /// Report that `buffer` finished receiving `byte_count` bytes.
    pub fn complete(&self, buffer: TransportBuffer, byte_count: usize, status: TransferStatus) {
        self.stats.buffer_received();
        metrics::inc_buffers_received();
        let Ok(buffer) = self.pool.mark_received(buffer, byte_count) else {
            // The pool has already put the buffer back on its free list.
            self.pool.replenish();
            return;
        };
        if status == TransferStatus::Failed {
            warn!("transport reported a failed receive: slot={}", buffer.slot());
            self.recycle(buffer);
            return;
        }
        match self.tx.try_send(buffer) {
            Ok(()) => {}
            Err(TrySendError::Full(buffer)) => {
                warn!(
                    "decode queue full; dropping received buffer: slot={}, len={}",
                    buffer.slot(),
                    buffer.len()
                );
                self.stats.transport_overflow();
                metrics::inc_transport_overflows();
                self.recycle(buffer);
            }
            Err(TrySendError::Closed(buffer)) => {
                debug!("pipeline stopped; returning buffer: slot={}", buffer.slot());
                if let Err(e) = self.pool.release(buffer) {
                    warn!("buffer release failed: error={e}");
                }
            }
        }
    }

    fn recycle(&self, buffer: TransportBuffer) {
        if let Err(e) = self.pool.recycle(buffer) {
            warn!("buffer recycle failed: error={e}");
        }
    }
}
