//! Background image decoding.
//!
//! A completed transfer becomes a [`DecodeJob`] that owns the payload and the
//! target surface. [`ImageDecoder::start`] moves the job onto Tokio's
//! blocking pool, where the codec streams blocks into the surface. On success
//! the surface is installed on the image and it becomes `Ready`; a codec
//! error, a panic or a cancelled task expires it. RGB565 payloads are pixels
//! already and are copied synchronously.

use std::sync::Arc;

use log::{debug, warn};
use tokio_util::task::TaskTracker;

use super::{CodecError, DecodedBlock, ImageCodec, Media, PixelSurface};
use crate::{metrics, panic::format_panic, protocol::ImageFormat, stats::PipelineStats};

/// Everything a decode needs, moved into the task that runs it.
#[derive(Debug)]
pub struct DecodeJob {
    media: Media,
    payload: Vec<u8>,
    surface: PixelSurface,
}

impl DecodeJob {
    /// Bundle an image with its complete payload and target surface.
    #[must_use]
    pub fn new(media: Media, payload: Vec<u8>, surface: PixelSurface) -> Self {
        Self {
            media,
            payload,
            surface,
        }
    }

    /// The image being decoded.
    #[must_use]
    pub fn media(&self) -> &Media { &self.media }

    /// Decode into the surface and settle the image's status.
    fn run(self, codec: &dyn ImageCodec) -> Result<(), CodecError> {
        let Self {
            media,
            payload,
            mut surface,
        } = self;
        let Some(image) = media.as_image() else {
            return Ok(());
        };
        let side = image.resolution().side();
        let scale = image.resolution().scale();
        let result = if image.format() == ImageFormat::Rgb565 {
            surface.copy_raw(&payload, side, scale)
        } else {
            let mut failure = None;
            let decoded = {
                let mut sink = |block: DecodedBlock<'_>| match surface.write_block(&block, scale) {
                    Ok(()) => true,
                    Err(e) => {
                        failure = Some(e);
                        false
                    }
                };
                codec
                    .open(&payload)
                    .and_then(|mut session| session.decode(&mut sink))
            };
            match failure {
                Some(e) => Err(e),
                None => decoded,
            }
        };
        match result {
            Ok(()) => {
                image.install_surface(surface);
                media.lifecycle().mark_ready();
                debug!("image decoded: id={}", image.id());
                Ok(())
            }
            Err(e) => {
                media.expire();
                Err(e)
            }
        }
    }
}

/// Starts decode jobs and accounts for their failures.
#[derive(Clone)]
pub struct ImageDecoder {
    codec: Arc<dyn ImageCodec>,
    tracker: TaskTracker,
    stats: Arc<PipelineStats>,
}

impl std::fmt::Debug for ImageDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageDecoder").finish_non_exhaustive()
    }
}

impl ImageDecoder {
    /// Decode with `codec`, spawning background work on `tracker`.
    #[must_use]
    pub fn new(codec: Arc<dyn ImageCodec>, tracker: TaskTracker, stats: Arc<PipelineStats>) -> Self {
        Self {
            codec,
            tracker,
            stats,
        }
    }

    /// Move the image to `Decoding` and run its job.
    ///
    /// RGB565 images are settled before this returns. Other formats are
    /// decoded on the blocking pool, which requires a Tokio runtime.
    pub fn start(&self, job: DecodeJob) {
        job.media.lifecycle().start_decoding();
        let raw = job
            .media
            .as_image()
            .is_some_and(|image| image.format() == ImageFormat::Rgb565);
        if raw {
            let media = job.media.clone();
            if let Err(e) = job.run(self.codec.as_ref()) {
                self.record_failure(&media, &e);
            }
            return;
        }

        let decoder = self.clone();
        self.tracker.spawn(async move {
            let media = job.media.clone();
            let codec = decoder.codec.clone();
            let result = match tokio::task::spawn_blocking(move || job.run(codec.as_ref())).await {
                Ok(result) => result,
                Err(e) if e.is_panic() => {
                    Err(CodecError::Panicked(format_panic(e.into_panic()).to_string()))
                }
                Err(_) => Err(CodecError::Cancelled),
            };
            if let Err(e) = result {
                media.expire();
                decoder.record_failure(&media, &e);
            }
        });
    }

    fn record_failure(&self, media: &Media, error: &CodecError) {
        let id = media.as_image().map(|image| image.id().get());
        warn!("image decode failed: id={id:?}, error={error}");
        self.stats.codec_failure();
        metrics::inc_codec_failures();
    }
}
