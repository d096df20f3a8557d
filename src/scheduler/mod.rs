//! Timed presentation of media.
//!
//! [`DisplayScheduler`] is a bounded FIFO with a single "current" slot. Each
//! display tick calls [`DisplayScheduler::update`]: stale entries at the head
//! of the queue are discarded, and once the current item has run for its
//! duration the next ready item replaces it. At most one item is ever
//! displaying.

mod render;

use std::collections::VecDeque;

use log::debug;
pub use render::RenderSurface;
use thiserror::Error;
use tokio::time::Instant;

use crate::{
    error::ErrorKind,
    media::{Media, MediaStatus},
};

/// Errors returned by [`DisplayScheduler::enqueue`].
#[derive(Debug, Error)]
pub enum EnqueueError {
    /// The queue was at capacity; the rejected item is handed back.
    #[error("display queue full")]
    QueueFull(Media),
}

impl EnqueueError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::QueueFull(_) => ErrorKind::QueueFull,
        }
    }

    /// Recover the rejected item.
    #[must_use]
    pub fn into_inner(self) -> Media {
        match self {
            Self::QueueFull(media) => media,
        }
    }
}

/// Bounded display queue plus the item currently on screen.
pub struct DisplayScheduler<S> {
    queue: VecDeque<Media>,
    current: Option<Media>,
    capacity: usize,
    surface: S,
}

impl<S: RenderSurface> DisplayScheduler<S> {
    /// Create a scheduler holding at most `capacity` waiting items.
    #[must_use]
    pub fn new(capacity: usize, surface: S) -> Self {
        Self {
            queue: VecDeque::with_capacity(capacity),
            current: None,
            capacity,
            surface,
        }
    }

    /// Append `media` to the queue.
    ///
    /// # Errors
    ///
    /// Returns [`EnqueueError::QueueFull`] carrying `media` when the queue is
    /// at capacity.
    pub fn enqueue(&mut self, media: Media) -> Result<(), EnqueueError> {
        if self.queue.len() >= self.capacity {
            return Err(EnqueueError::QueueFull(media));
        }
        self.queue.push_back(media);
        Ok(())
    }

    /// Advance the display using the runtime clock.
    pub fn update(&mut self) -> bool { self.update_at(Instant::now()) }

    /// Advance the display at `now`. Returns whether a new item was shown.
    pub fn update_at(&mut self, now: Instant) -> bool {
        while let Some(front) = self.queue.front() {
            let status = front.status_at(now);
            if status <= MediaStatus::Ready {
                break;
            }
            debug!("discarding stale queued media: status={status:?}");
            self.queue.pop_front();
        }

        let idle = self
            .current
            .as_ref()
            .is_none_or(|current| current.status_at(now) == MediaStatus::Expired);
        let front_ready = self
            .queue
            .front()
            .is_some_and(|front| front.status_at(now) == MediaStatus::Ready);
        if !(idle && front_ready) {
            return false;
        }
        let Some(next) = self.queue.pop_front() else {
            return false;
        };
        render::render(&mut self.surface, &next);
        next.lifecycle().begin_display_at(now);
        self.current = Some(next);
        true
    }

    /// Items waiting behind the current one.
    #[must_use]
    pub fn queue_depth(&self) -> usize { self.queue.len() }

    /// Maximum number of waiting items.
    #[must_use]
    pub fn capacity(&self) -> usize { self.capacity }

    /// Item most recently put on screen.
    #[must_use]
    pub fn current(&self) -> Option<&Media> { self.current.as_ref() }

    /// Switch the backlight of the output device.
    pub fn set_backlight(&mut self, on: bool) { self.surface.set_backlight(on); }

    #[must_use]
    pub fn surface(&self) -> &S { &self.surface }

    /// Consume the scheduler, returning the output device.
    #[must_use]
    pub fn into_surface(self) -> S { self.surface }
}

impl<S> std::fmt::Debug for DisplayScheduler<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayScheduler")
            .field("queued", &self.queue.len())
            .field("capacity", &self.capacity)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}
