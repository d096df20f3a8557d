#![cfg(all(feature = "advanced-tests", loom))]
//! Concurrency tests for the buffer pool using loom.
//!
//! A completion thread hands buffers back while another thread acquires and
//! submits; loom explores the interleavings to show the ownership ledger
//! never loses or duplicates a buffer.

use std::sync::Arc;

use loom::{model, sync::Mutex, thread};
use mediaframe::{
    BufferPool,
    PoolError,
    Transport,
    TransportBuffer,
    pool::Ownership,
};

struct QueueTransport {
    queued: Mutex<Vec<TransportBuffer>>,
}

impl QueueTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            queued: Mutex::new(Vec::new()),
        })
    }

    fn take(&self) -> Option<TransportBuffer> {
        self.queued.lock().expect("transport lock").pop()
    }
}

impl Transport for QueueTransport {
    fn submit(&self, buffer: TransportBuffer) -> Result<(), TransportBuffer> {
        self.queued.lock().expect("transport lock").push(buffer);
        Ok(())
    }
}

#[test]
fn concurrent_release_and_acquire_conserve_buffers() {
    model(|| {
        let transport = QueueTransport::new();
        let pool = Arc::new(BufferPool::new(2, 8, transport.clone()));
        assert_eq!(pool.replenish(), 2);
        let first = transport.take().expect("first buffer queued");
        let slot = first.slot();

        let completer = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                let received = pool.mark_received(first, 4).expect("completion accepted");
                pool.release(received).expect("pipeline owned");
            })
        };
        let acquirer = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || match pool.acquire_free() {
                Ok(buffer) => pool.submit_to_transport(buffer).map(|()| true),
                Err(PoolError::PoolExhausted) => Ok(false),
                Err(e) => Err(e),
            })
        };

        completer.join().expect("completer thread");
        let resubmitted = acquirer
            .join()
            .expect("acquirer thread")
            .expect("no ledger violation");

        let expected = if resubmitted {
            Ownership::Transport
        } else {
            Ownership::Free
        };
        assert_eq!(pool.ownership(slot), Some(expected));
        assert_eq!(pool.free_count(), usize::from(!resubmitted));
    });
}

#[test]
fn concurrent_completions_never_double_free() {
    model(|| {
        let transport = QueueTransport::new();
        let pool = Arc::new(BufferPool::new(2, 8, transport.clone()));
        pool.replenish();

        let handles = [transport.take(), transport.take()]
            .into_iter()
            .map(|buffer| {
                let pool = Arc::clone(&pool);
                let buffer = buffer.expect("buffer queued");
                thread::spawn(move || {
                    let received = pool.mark_received(buffer, 1).expect("completion accepted");
                    pool.recycle(received).expect("recycled");
                })
            })
            .collect::<Vec<_>>();
        for handle in handles {
            handle.join().expect("completion thread");
        }

        assert_eq!(pool.free_count(), 0);
        assert_eq!(transport.queued.lock().expect("transport lock").len(), 2);
    });
}
