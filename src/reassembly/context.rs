//! Bookkeeping for one in-flight image transfer.

use std::time::Duration;

use log::debug;
use tokio::time::Instant;

use super::{ChunkMask, ReassemblyError};
use crate::{
    media::{DecodeJob, Media, PixelSurface},
    protocol::ImageId,
};

/// Outcome of applying one chunk.
#[derive(Debug)]
pub(crate) enum Progress {
    /// More chunks are needed.
    Pending,
    /// The chunk was already received; nothing changed.
    Duplicate,
    /// Every chunk and every byte has arrived.
    Complete,
}

/// State of a multi-chunk image while its chunks arrive.
#[derive(Debug)]
pub struct TransferContext {
    image_id: ImageId,
    media: Media,
    expected_chunks: u8,
    received: ChunkMask,
    payload: Vec<u8>,
    received_bytes: usize,
    total_size: usize,
    surface: PixelSurface,
    started_at: Instant,
    timeout: Duration,
}

impl TransferContext {
    pub(crate) fn new(
        image_id: ImageId,
        media: Media,
        expected_chunks: u8,
        total_size: usize,
        (payload, surface): (Vec<u8>, PixelSurface),
        started_at: Instant,
        timeout: Duration,
    ) -> Self {
        Self {
            image_id,
            media,
            expected_chunks,
            received: ChunkMask::default(),
            payload,
            received_bytes: 0,
            total_size,
            surface,
            started_at,
            timeout,
        }
    }

    /// Image being assembled.
    #[must_use]
    pub fn media(&self) -> &Media { &self.media }

    /// Chunks announced by the image start.
    #[must_use]
    pub fn expected_chunks(&self) -> u8 { self.expected_chunks }

    /// Chunk ids received so far.
    #[must_use]
    pub fn received(&self) -> ChunkMask { self.received }

    /// Bytes written by accepted chunks so far.
    #[must_use]
    pub fn received_bytes(&self) -> usize { self.received_bytes }

    /// When the transfer started.
    #[must_use]
    pub fn started_at(&self) -> Instant { self.started_at }

    /// Time budget of the transfer.
    #[must_use]
    pub fn timeout(&self) -> Duration { self.timeout }

    /// Whether the budget ran out at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) > self.timeout
    }

    /// Record chunk `chunk_id` and copy `data` to `offset` in the payload.
    ///
    /// The caller has already checked `chunk_id < expected_chunks`. The
    /// payload is `total_size` bytes long, so chunks land in place whatever
    /// order they arrive in.
    pub(crate) fn apply(
        &mut self,
        chunk_id: u8,
        offset: u32,
        data: &[u8],
    ) -> Result<Progress, ReassemblyError> {
        if self.received.contains(chunk_id) {
            return Ok(Progress::Duplicate);
        }
        let image_id = self.image_id;
        let start = offset as usize;
        let attempted = start.saturating_add(data.len());
        let Some(region) = self.payload.get_mut(start..attempted) else {
            return Err(ReassemblyError::Overflow {
                image_id,
                attempted,
                total: self.total_size,
            });
        };
        region.copy_from_slice(data);
        self.received.insert(chunk_id);
        self.received_bytes += data.len();
        debug!(
            "chunk applied: image={image_id}, chunk={chunk_id}, offset={offset}, len={}",
            data.len()
        );

        if !self.received.covers(self.expected_chunks) {
            return Ok(Progress::Pending);
        }
        if self.received_bytes != self.total_size {
            return Err(ReassemblyError::LengthDisagreement {
                image_id,
                received: self.received_bytes,
                total: self.total_size,
            });
        }
        Ok(Progress::Complete)
    }

    /// Id of the image being assembled.
    #[must_use]
    pub fn image_id(&self) -> ImageId { self.image_id }

    /// Hand payload and surface to a decode job.
    pub(crate) fn into_job(self) -> DecodeJob {
        DecodeJob::new(self.media, self.payload, self.surface)
    }
}
