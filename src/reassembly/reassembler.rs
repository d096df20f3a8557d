//! Keyed image reassembly with timeout-based eviction.
//!
//! [`Reassembler`] keeps one [`TransferContext`] per in-flight image id
//! behind a single lock. Chunks may arrive in any order; a transfer completes
//! once every announced chunk and every announced byte has arrived, at which
//! point its payload moves into a [`DecodeJob`](crate::media::DecodeJob) and the image is returned for
//! scheduling. Transfers that outlive their budget are torn down and their
//! images expired.

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use log::{debug, warn};
use tokio::time::Instant;

use super::{ChunkMask, ReassemblyError, TransferContext, context::Progress};
use crate::{
    config::PipelineConfig,
    error::ErrorKind,
    media::{Image, ImageDecoder, Media, MediaContainer, MediaStatus, PixelSurface},
    metrics,
    protocol::{ImageChunk, ImageFormat, ImageId, ImageStart},
};

#[derive(Debug, Default)]
struct Transfers {
    active: HashMap<ImageId, TransferContext>,
    completed: ChunkMask,
    timed_out: ChunkMask,
}

/// Limits applied to every transfer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReassemblyLimits {
    /// Fixed part of the time budget.
    pub timeout_base: Duration,
    /// Budget added per expected chunk.
    pub timeout_per_chunk: Duration,
    /// Largest accepted payload.
    pub max_image_size: usize,
    /// Width of the decode surface.
    pub surface_width: u16,
    /// Height of the decode surface.
    pub surface_height: u16,
}

impl From<&PipelineConfig> for ReassemblyLimits {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            timeout_base: config.transfer_timeout_base,
            timeout_per_chunk: config.transfer_timeout_per_chunk,
            max_image_size: config.max_image_size,
            surface_width: config.screen_width,
            surface_height: config.screen_height,
        }
    }
}

impl ReassemblyLimits {
    /// Budget for a transfer of `expected_chunks` chunks.
    #[must_use]
    pub fn budget(&self, expected_chunks: u8) -> Duration {
        self.timeout_base
            .saturating_add(self.timeout_per_chunk.saturating_mul(u32::from(expected_chunks)))
    }
}

/// Image reassembler shared by the decode context.
#[derive(Debug)]
pub struct Reassembler {
    transfers: Mutex<Transfers>,
    decoder: ImageDecoder,
    limits: ReassemblyLimits,
}

impl Reassembler {
    /// Create a reassembler that hands completed payloads to `decoder`.
    #[must_use]
    pub fn new(limits: ReassemblyLimits, decoder: ImageDecoder) -> Self {
        Self {
            transfers: Mutex::new(Transfers::default()),
            decoder,
            limits,
        }
    }

    fn transfers(&self) -> MutexGuard<'_, Transfers> {
        self.transfers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Limits in force.
    #[must_use]
    pub fn limits(&self) -> ReassemblyLimits { self.limits }

    /// Number of in-flight transfers.
    #[must_use]
    pub fn active_count(&self) -> usize { self.transfers().active.len() }

    /// Whether a transfer for `image_id` is in flight.
    #[must_use]
    pub fn is_active(&self, image_id: ImageId) -> bool {
        self.transfers().active.contains_key(&image_id)
    }

    /// Image being assembled under `image_id`.
    #[must_use]
    pub fn media(&self, image_id: ImageId) -> Option<Media> {
        self.transfers()
            .active
            .get(&image_id)
            .map(|context| context.media().clone())
    }

    /// Begin a transfer using the runtime clock.
    ///
    /// # Errors
    ///
    /// See [`on_image_start_at`](Self::on_image_start_at).
    pub fn on_image_start(&self, start: &ImageStart<'_>) -> Result<Option<Media>, ReassemblyError> {
        self.on_image_start_at(start, Instant::now())
    }

    /// Begin a transfer, replacing any transfer with the same id.
    ///
    /// Returns the image when the embedded chunk alone completes it.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError`] for unsupported formats, empty or
    /// oversized transfers, failed allocations and embedded data that does not
    /// fit the announced size. The image is expired in each case.
    pub fn on_image_start_at(
        &self,
        start: &ImageStart<'_>,
        now: Instant,
    ) -> Result<Option<Media>, ReassemblyError> {
        let image_id = start.image_id;
        let mut transfers = self.transfers();
        transfers.completed.remove(image_id.get());
        transfers.timed_out.remove(image_id.get());
        if let Some(previous) = transfers.active.remove(&image_id) {
            warn!(
                "image id reused while transfer active; discarding previous: image={image_id}, \
                 received_chunks={}",
                previous.received().count()
            );
            previous.media().expire();
        }
        drop(transfers);

        let media = MediaContainer::image(
            Image::from_start(start),
            Duration::from_millis(u64::from(start.delay_ms)),
        );
        let mut context = match self.open_context(start, &media, now) {
            Ok(context) => context,
            Err(e) => {
                media.expire();
                return Err(e);
            }
        };
        debug!(
            "image transfer started: image={image_id}, chunks={}, size={}",
            start.chunk_count, start.total_size
        );

        if !start.embedded.is_empty() {
            match context.apply(0, 0, start.embedded) {
                Ok(Progress::Complete) => return Ok(Some(self.complete(image_id, context))),
                Ok(Progress::Pending | Progress::Duplicate) => {}
                Err(e) => {
                    warn!("embedded chunk rejected: error={e}");
                    media.expire();
                    return Err(e);
                }
            }
        }
        self.transfers().active.insert(image_id, context);
        Ok(None)
    }

    fn open_context(
        &self,
        start: &ImageStart<'_>,
        media: &Media,
        now: Instant,
    ) -> Result<TransferContext, ReassemblyError> {
        let image_id = start.image_id;
        if !matches!(start.format, ImageFormat::Jpeg | ImageFormat::Rgb565) {
            return Err(ReassemblyError::UnsupportedFormat {
                image_id,
                format: start.format,
            });
        }
        if start.chunk_count == 0 {
            return Err(ReassemblyError::EmptyTransfer { image_id });
        }
        let total_size = start.total_size as usize;
        if total_size > self.limits.max_image_size {
            return Err(ReassemblyError::TooLarge {
                image_id,
                size: total_size,
                max: self.limits.max_image_size,
            });
        }
        let mut payload = Vec::new();
        if payload.try_reserve_exact(total_size).is_err() {
            warn!("payload allocation failed: image={image_id}, size={total_size}");
            return Err(ReassemblyError::OutOfMemory { image_id });
        }
        payload.resize(total_size, 0);
        let Ok(surface) = PixelSurface::try_new(self.limits.surface_width, self.limits.surface_height)
        else {
            warn!("surface allocation failed: image={image_id}");
            return Err(ReassemblyError::OutOfMemory { image_id });
        };
        Ok(TransferContext::new(
            image_id,
            media.clone(),
            start.chunk_count,
            total_size,
            (payload, surface),
            now,
            self.limits.budget(start.chunk_count),
        ))
    }

    /// Apply a chunk using the runtime clock.
    ///
    /// # Errors
    ///
    /// See [`on_image_chunk_at`](Self::on_image_chunk_at).
    pub fn on_image_chunk(&self, chunk: &ImageChunk<'_>) -> Result<Option<Media>, ReassemblyError> {
        self.on_image_chunk_at(chunk, Instant::now())
    }

    /// Apply one chunk, returning the image if it completes the transfer.
    ///
    /// A transfer past its budget is torn down first, so its chunks are
    /// rejected like those of an unknown id.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::ImageIdMismatch`] for an unknown id and
    /// [`ReassemblyError::ChunkOutOfRange`] for a chunk id beyond the
    /// announced count; neither touches the transfer. An overflow or a byte
    /// count that disagrees once every chunk arrived aborts the transfer and
    /// expires the image.
    pub fn on_image_chunk_at(
        &self,
        chunk: &ImageChunk<'_>,
        now: Instant,
    ) -> Result<Option<Media>, ReassemblyError> {
        let image_id = chunk.image_id;
        let mut transfers = self.transfers();
        Self::expire_if_late(&mut transfers, image_id, now);
        let Some(context) = transfers.active.get_mut(&image_id) else {
            debug!("chunk for unknown image: image={image_id}, chunk={}", chunk.chunk_id);
            return Err(ReassemblyError::ImageIdMismatch { image_id });
        };
        if chunk.chunk_id >= context.expected_chunks() {
            return Err(ReassemblyError::ChunkOutOfRange {
                image_id,
                chunk_id: chunk.chunk_id,
                expected: context.expected_chunks(),
            });
        }
        match context.apply(chunk.chunk_id, chunk.offset, chunk.data) {
            Ok(Progress::Pending) => Ok(None),
            Ok(Progress::Duplicate) => {
                debug!("duplicate chunk ignored: image={image_id}, chunk={}", chunk.chunk_id);
                Ok(None)
            }
            Ok(Progress::Complete) => {
                let Some(context) = transfers.active.remove(&image_id) else {
                    return Err(ReassemblyError::ImageIdMismatch { image_id });
                };
                drop(transfers);
                Ok(Some(self.complete(image_id, context)))
            }
            Err(e) => {
                warn!("transfer aborted: error={e}");
                if let Some(context) = transfers.active.remove(&image_id) {
                    context.media().expire();
                }
                Err(e)
            }
        }
    }

    /// Handle the end-of-transfer message for `image_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ReassemblyError::IncompleteTransfer`] if the transfer is
    /// still waiting for chunks, which expires the image, and
    /// [`ReassemblyError::ImageIdMismatch`] if no transfer with this id is
    /// active or recently completed.
    pub fn on_image_end(&self, image_id: ImageId) -> Result<(), ReassemblyError> {
        let mut transfers = self.transfers();
        if transfers.completed.remove(image_id.get()) {
            return Ok(());
        }
        let Some(context) = transfers.active.remove(&image_id) else {
            return Err(ReassemblyError::ImageIdMismatch { image_id });
        };
        drop(transfers);
        context.media().expire();
        let error = ReassemblyError::IncompleteTransfer {
            image_id,
            received: context.received().count(),
            expected: context.expected_chunks(),
        };
        warn!("transfer ended early: error={error}");
        Err(error)
    }

    fn complete(&self, image_id: ImageId, context: TransferContext) -> Media {
        let media = context.media().clone();
        self.transfers().completed.insert(image_id.get());
        debug!(
            "image transfer complete: image={image_id}, bytes={}",
            context.received_bytes()
        );
        self.decoder.start(context.into_job());
        media
    }

    fn expire_if_late(transfers: &mut Transfers, image_id: ImageId, now: Instant) -> bool {
        let late = transfers
            .active
            .get(&image_id)
            .is_some_and(|context| context.is_expired_at(now));
        if late {
            if let Some(context) = transfers.active.remove(&image_id) {
                warn!(
                    "image transfer timed out: image={image_id}, received_chunks={}, expected={}",
                    context.received().count(),
                    context.expected_chunks()
                );
                context.media().expire();
                transfers.timed_out.insert(image_id.get());
                metrics::inc_errors(ErrorKind::TransferTimeout);
            }
        }
        late
    }

    /// Tear down the transfer for `image_id` if its budget ran out at `now`.
    /// Returns whether it was torn down.
    pub fn check_timeout(&self, image_id: ImageId, now: Instant) -> bool {
        Self::expire_if_late(&mut self.transfers(), image_id, now)
    }

    /// Remove every transfer past its budget using the runtime clock.
    pub fn purge_expired(&self) -> Vec<ImageId> { self.purge_expired_at(Instant::now()) }

    /// Remove every transfer past its budget at `now`.
    ///
    /// Returns the ids of the transfers that were torn down.
    pub fn purge_expired_at(&self, now: Instant) -> Vec<ImageId> {
        let mut transfers = self.transfers();
        let late = transfers
            .active
            .iter()
            .filter(|(_, context)| context.is_expired_at(now))
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        for id in &late {
            Self::expire_if_late(&mut transfers, *id, now);
        }
        late
    }

    /// Status of the image being assembled under `image_id`, after tearing
    /// it down if it is late.
    ///
    /// A transfer torn down for running out of time reads as
    /// [`MediaStatus::Expired`] until the id is started again. `None` when
    /// no transfer is active or timed out under this id.
    #[must_use]
    pub fn status(&self, image_id: ImageId, now: Instant) -> Option<MediaStatus> {
        let mut transfers = self.transfers();
        Self::expire_if_late(&mut transfers, image_id, now);
        match transfers.active.get(&image_id) {
            Some(context) => Some(context.media().status_at(now)),
            None if transfers.timed_out.contains(image_id.get()) => Some(MediaStatus::Expired),
            None => None,
        }
    }
}
