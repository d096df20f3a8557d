//! Fixed-capacity transport buffers.

use derive_more::{Display, From, Into};

/// Index of a buffer within its pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct SlotId(u8);

impl SlotId {
    /// Wrap a raw slot index.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the raw slot index.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }

    pub(crate) const fn index(self) -> usize { self.0 as usize }
}

/// A reusable byte region owned by exactly one stage at a time.
///
/// Buffers are created by [`BufferPool`](super::BufferPool) and cannot be
/// cloned; moving a `TransportBuffer` is the ownership handoff. The region is
/// allocated once and never copied while it circulates.
#[derive(Debug)]
pub struct TransportBuffer {
    slot: SlotId,
    data: Box<[u8]>,
    len: usize,
}

impl TransportBuffer {
    pub(crate) fn new(slot: SlotId, capacity: usize) -> Self {
        Self {
            slot,
            data: vec![0; capacity].into_boxed_slice(),
            len: 0,
        }
    }

    /// Slot this buffer occupies in its pool.
    #[must_use]
    pub const fn slot(&self) -> SlotId { self.slot }

    /// Size of the whole region in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize { self.data.len() }

    /// Bytes written by the last receive.
    #[must_use]
    pub const fn len(&self) -> usize { self.len }

    /// Whether the last receive wrote no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool { self.len == 0 }

    /// Occupied bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] { &self.data[..self.len] }

    /// Whole region, for the transport to receive into.
    pub fn receive_region(&mut self) -> &mut [u8] { &mut self.data }

    pub(crate) fn set_len(&mut self, len: usize) { self.len = len; }
}
