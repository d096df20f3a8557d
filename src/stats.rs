//! Pipeline counters, available with or without the `metrics` feature.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Live counters updated by every pipeline context.
#[derive(Debug, Default)]
pub struct PipelineStats {
    buffers_received: AtomicU64,
    buffers_processed: AtomicU64,
    bytes_processed: AtomicU64,
    transport_overflows: AtomicU64,
    decode_failures: AtomicU64,
    reassembly_errors: AtomicU64,
    codec_failures: AtomicU64,
    media_dropped: AtomicU64,
    queue_depth: AtomicUsize,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Completions reported by the transport.
    pub buffers_received: u64,
    /// Buffers the decode context finished with.
    pub buffers_processed: u64,
    /// Occupied bytes of processed buffers.
    pub bytes_processed: u64,
    /// Buffers dropped because the decode channel was full.
    pub transport_overflows: u64,
    /// Buffers that did not decode into a message.
    pub decode_failures: u64,
    /// Messages refused by the reassembler.
    pub reassembly_errors: u64,
    /// Images whose codec run failed.
    pub codec_failures: u64,
    /// Media discarded because a downstream queue was full.
    pub media_dropped: u64,
    /// Items waiting in the display queue.
    pub queue_depth: usize,
}

impl PipelineStats {
    pub(crate) fn buffer_received(&self) { self.buffers_received.fetch_add(1, Ordering::Relaxed); }

    pub(crate) fn buffer_processed(&self, bytes: usize) {
        self.buffers_processed.fetch_add(1, Ordering::Relaxed);
        self.bytes_processed
            .fetch_add(u64::try_from(bytes).unwrap_or(u64::MAX), Ordering::Relaxed);
    }

    pub(crate) fn transport_overflow(&self) {
        self.transport_overflows.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn decode_failure(&self) { self.decode_failures.fetch_add(1, Ordering::Relaxed); }

    pub(crate) fn reassembly_error(&self) {
        self.reassembly_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn codec_failure(&self) { self.codec_failures.fetch_add(1, Ordering::Relaxed); }

    pub(crate) fn media_dropped(&self) { self.media_dropped.fetch_add(1, Ordering::Relaxed); }

    pub(crate) fn set_queue_depth(&self, depth: usize) {
        self.queue_depth.store(depth, Ordering::Relaxed);
    }

    /// Copy every counter.
    #[must_use]
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            buffers_received: self.buffers_received.load(Ordering::Relaxed),
            buffers_processed: self.buffers_processed.load(Ordering::Relaxed),
            bytes_processed: self.bytes_processed.load(Ordering::Relaxed),
            transport_overflows: self.transport_overflows.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            reassembly_errors: self.reassembly_errors.load(Ordering::Relaxed),
            codec_failures: self.codec_failures.load(Ordering::Relaxed),
            media_dropped: self.media_dropped.load(Ordering::Relaxed),
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PipelineStats, StatsSnapshot};

    #[test]
    fn snapshot_reflects_updates() {
        let stats = PipelineStats::default();
        stats.buffer_received();
        stats.buffer_processed(120);
        stats.buffer_processed(30);
        stats.transport_overflow();
        stats.set_queue_depth(3);
        assert_eq!(
            stats.snapshot(),
            StatsSnapshot {
                buffers_received: 1,
                buffers_processed: 2,
                bytes_processed: 150,
                transport_overflows: 1,
                queue_depth: 3,
                ..StatsSnapshot::default()
            }
        );
    }
}
