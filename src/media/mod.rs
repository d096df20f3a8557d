//! Displayable media and their lifecycle.
//!
//! A [`MediaContainer`] is the unit the display scheduler shows: a single
//! [`Text`], a [`TextGroup`] or an [`Image`]. Containers are shared as
//! [`Media`] between the reassembler, the background decode task and the
//! scheduler; each carries its own [`Lifecycle`] lock.

mod codec;
mod decode;
mod image;
mod lifecycle;
mod surface;
mod text;

use std::{sync::Arc, time::Duration};

pub use codec::{CodecError, CodecSession, ImageCodec};
pub use decode::{DecodeJob, ImageDecoder};
pub use image::Image;
pub use lifecycle::{Lifecycle, MediaStatus};
pub use surface::{DecodedBlock, PixelSurface};
pub use text::{Text, TextGroup};
use tokio::time::Instant;

/// Shared handle to a media item.
pub type Media = Arc<MediaContainer>;

/// Kind-specific content of a media item.
#[derive(Debug)]
pub enum MediaKind {
    Text(Text),
    TextGroup(TextGroup),
    Image(Image),
}

/// A displayable item with its lifecycle.
#[derive(Debug)]
pub struct MediaContainer {
    kind: MediaKind,
    lifecycle: Lifecycle,
}

impl MediaContainer {
    /// A single text, ready immediately.
    #[must_use]
    pub fn text(text: Text, duration: Duration) -> Media {
        Self::shared(MediaKind::Text(text), MediaStatus::Ready, duration)
    }

    /// A group of texts, ready immediately.
    #[must_use]
    pub fn text_group(group: TextGroup, duration: Duration) -> Media {
        Self::shared(MediaKind::TextGroup(group), MediaStatus::Ready, duration)
    }

    /// An image whose payload has not yet been received.
    #[must_use]
    pub fn image(image: Image, duration: Duration) -> Media {
        Self::shared(MediaKind::Image(image), MediaStatus::NotReceived, duration)
    }

    fn shared(kind: MediaKind, status: MediaStatus, duration: Duration) -> Media {
        Arc::new(Self {
            kind,
            lifecycle: Lifecycle::new(status, duration),
        })
    }

    #[must_use]
    pub fn kind(&self) -> &MediaKind { &self.kind }

    #[must_use]
    pub fn as_text(&self) -> Option<&Text> {
        match &self.kind {
            MediaKind::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text_group(&self) -> Option<&TextGroup> {
        match &self.kind {
            MediaKind::TextGroup(group) => Some(group),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_image(&self) -> Option<&Image> {
        match &self.kind {
            MediaKind::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Lifecycle of this item.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle { &self.lifecycle }

    /// Current status, see [`Lifecycle::status_at`].
    #[must_use]
    pub fn status_at(&self, now: Instant) -> MediaStatus { self.lifecycle.status_at(now) }

    /// Current status using the runtime clock.
    #[must_use]
    pub fn status(&self) -> MediaStatus { self.lifecycle.status() }

    /// Requested display duration.
    #[must_use]
    pub fn duration(&self) -> Duration { self.lifecycle.duration() }

    /// When the item was first displayed.
    #[must_use]
    pub fn started_at(&self) -> Option<Instant> { self.lifecycle.started_at() }

    /// Force the item to `Expired`.
    pub fn expire(&self) -> bool { self.lifecycle.expire() }
}
