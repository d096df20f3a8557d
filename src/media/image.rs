//! Image media.

use std::sync::{Mutex, PoisonError};

use super::PixelSurface;
use crate::protocol::{ImageFormat, ImageId, ImageResolution, ImageStart, Rotation};

/// An image announced by an ImageStart message.
///
/// The decoded surface is installed by the decode task once the codec
/// succeeds; until then [`with_surface`](Self::with_surface) yields nothing.
#[derive(Debug)]
pub struct Image {
    id: ImageId,
    format: ImageFormat,
    resolution: ImageResolution,
    rotation: Rotation,
    total_size: usize,
    chunk_count: u8,
    surface: Mutex<Option<PixelSurface>>,
}

impl Image {
    /// Describe the image announced by `start`.
    #[must_use]
    pub fn from_start(start: &ImageStart<'_>) -> Self {
        Self {
            id: start.image_id,
            format: start.format,
            resolution: start.resolution,
            rotation: start.rotation,
            total_size: start.total_size as usize,
            chunk_count: start.chunk_count,
            surface: Mutex::new(None),
        }
    }

    #[must_use]
    pub fn id(&self) -> ImageId { self.id }

    #[must_use]
    pub fn format(&self) -> ImageFormat { self.format }

    #[must_use]
    pub fn resolution(&self) -> ImageResolution { self.resolution }

    #[must_use]
    pub fn rotation(&self) -> Rotation { self.rotation }

    /// Compressed payload size in bytes.
    #[must_use]
    pub fn total_size(&self) -> usize { self.total_size }

    /// Number of chunks the payload was split into.
    #[must_use]
    pub fn chunk_count(&self) -> u8 { self.chunk_count }

    /// Whether a decoded surface is installed.
    #[must_use]
    pub fn is_decoded(&self) -> bool { self.lock().is_some() }

    /// Run `f` over the decoded surface, if any.
    pub fn with_surface<R>(&self, f: impl FnOnce(&PixelSurface) -> R) -> Option<R> {
        self.lock().as_ref().map(f)
    }

    pub(crate) fn install_surface(&self, surface: PixelSurface) { *self.lock() = Some(surface); }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<PixelSurface>> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
