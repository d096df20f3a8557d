//! Tests for buffer ownership transitions.

use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};

use super::*;

/// Transport that accepts up to `limit` buffers and lets tests complete them.
#[derive(Default)]
struct QueueTransport {
    limit: usize,
    queued: Mutex<Vec<TransportBuffer>>,
}

impl QueueTransport {
    fn with_limit(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            limit,
            queued: Mutex::default(),
        })
    }

    fn take(&self) -> TransportBuffer {
        self.queued
            .lock()
            .expect("transport lock")
            .pop()
            .expect("a queued buffer")
    }

    fn queued(&self) -> usize { self.queued.lock().expect("transport lock").len() }
}

impl Transport for QueueTransport {
    fn submit(&self, buffer: TransportBuffer) -> Result<(), TransportBuffer> {
        let mut queued = self.queued.lock().expect("transport lock");
        if queued.len() >= self.limit {
            return Err(buffer);
        }
        queued.push(buffer);
        Ok(())
    }
}

#[fixture]
fn transport() -> Arc<QueueTransport> { QueueTransport::with_limit(8) }

fn pool_of(count: usize, transport: &Arc<QueueTransport>) -> BufferPool {
    BufferPool::new(count, 64, transport.clone())
}

#[rstest]
fn fifth_acquire_from_four_buffers_is_exhausted(transport: Arc<QueueTransport>) {
    let pool = pool_of(4, &transport);
    for _ in 0..4 {
        let buffer = pool.acquire_free().expect("free buffer");
        pool.submit_to_transport(buffer).expect("transport accepts");
    }
    assert_eq!(pool.acquire_free().unwrap_err(), PoolError::PoolExhausted);

    for len in [5, 6, 7, 8] {
        let received = pool.mark_received(transport.take(), len).expect("completion");
        assert_eq!(received.len(), len);
        pool.release(received).expect("pipeline owned");
    }
    assert_eq!(pool.free_count(), 4);
    assert!(pool.acquire_free().is_ok());
}

#[rstest]
fn ownership_follows_each_transition(transport: Arc<QueueTransport>) {
    let pool = pool_of(2, &transport);
    let buffer = pool.acquire_free().expect("free buffer");
    let slot = buffer.slot();
    assert_eq!(pool.ownership(slot), Some(Ownership::Transport));

    pool.submit_to_transport(buffer).expect("transport accepts");
    let received = pool.mark_received(transport.take(), 3).expect("completion");
    assert_eq!(pool.ownership(slot), Some(Ownership::Pipeline));

    pool.release(received).expect("pipeline owned");
    assert_eq!(pool.ownership(slot), Some(Ownership::Free));
    assert_eq!(pool.ownership(SlotId::new(9)), None);
}

#[test]
fn rejected_submission_returns_buffer_to_free_list() {
    let transport = QueueTransport::with_limit(0);
    let pool = pool_of(1, &transport);
    let buffer = pool.acquire_free().expect("free buffer");
    let slot = buffer.slot();

    assert_eq!(
        pool.submit_to_transport(buffer),
        Err(PoolError::TransportRejected { slot })
    );
    assert_eq!(pool.free_count(), 1);
    assert_eq!(pool.ownership(slot), Some(Ownership::Free));
}

#[rstest]
fn oversized_completion_is_refused(transport: Arc<QueueTransport>) {
    let pool = pool_of(1, &transport);
    pool.replenish();
    let err = pool
        .mark_received(transport.take(), 65)
        .expect_err("larger than capacity");
    assert!(matches!(err, PoolError::LengthOutOfBounds { len: 65, capacity: 64, .. }));
    assert_eq!(pool.free_count(), 1);
}

#[rstest]
fn received_bytes_are_the_occupied_prefix(transport: Arc<QueueTransport>) {
    let pool = pool_of(1, &transport);
    pool.replenish();
    let mut buffer = transport.take();
    buffer.receive_region()[..3].copy_from_slice(b"abc");
    let received = pool.mark_received(buffer, 3).expect("completion");
    assert_eq!(received.as_bytes(), b"abc");
    assert_eq!(received.capacity(), 64);
}

#[rstest]
#[cfg_attr(debug_assertions, should_panic(expected = "double release"))]
fn releasing_a_transport_owned_buffer_is_refused(transport: Arc<QueueTransport>) {
    let pool = pool_of(1, &transport);
    let buffer = pool.acquire_free().expect("free buffer");
    let slot = buffer.slot();
    assert_eq!(pool.release(buffer), Err(PoolError::DoubleRelease { slot }));
    assert_eq!(pool.ownership(slot), Some(Ownership::Transport));
}

#[rstest]
fn recycle_resubmits_immediately(transport: Arc<QueueTransport>) {
    let pool = pool_of(2, &transport);
    assert_eq!(pool.replenish(), 2);
    let received = pool.mark_received(transport.take(), 1).expect("completion");
    assert_eq!(transport.queued(), 1);

    pool.recycle(received).expect("recycled");
    assert_eq!(transport.queued(), 2);
    assert_eq!(pool.free_count(), 0);
}

#[test]
fn replenish_stops_at_first_rejection() {
    let transport = QueueTransport::with_limit(3);
    let pool = pool_of(5, &transport);
    assert_eq!(pool.replenish(), 3);
    assert_eq!(pool.free_count(), 2);
}

#[test]
fn pool_size_is_clamped_to_slot_space() {
    let pool = BufferPool::new(MAX_BUFFERS + 10, 8, QueueTransport::with_limit(0));
    assert_eq!(pool.capacity(), MAX_BUFFERS);
}
