//! Per-item lifecycle state machine.
//!
//! A media item only ever moves forward through
//! `NotReceived → Decoding → Ready → Displaying → Expired`; `Expired` may be
//! forced from any state and is absorbing. A displaying item expires lazily
//! the first time its status is read after its duration has elapsed.

use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};

use tokio::time::Instant;

/// Lifecycle status of a media item, ordered by progression.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MediaStatus {
    /// Image payload still arriving.
    NotReceived,
    /// Payload complete; the codec is running.
    Decoding,
    /// Can be shown.
    Ready,
    /// On screen since the latched start time.
    Displaying,
    /// Finished or failed; never shown again.
    Expired,
}

#[derive(Debug)]
struct State {
    status: MediaStatus,
    started_at: Option<Instant>,
}

/// Status of one media item behind its own lock.
#[derive(Debug)]
pub struct Lifecycle {
    state: Mutex<State>,
    duration: Duration,
}

impl Lifecycle {
    /// Start in `initial` with a display `duration`.
    #[must_use]
    pub fn new(initial: MediaStatus, duration: Duration) -> Self {
        Self {
            state: Mutex::new(State {
                status: initial,
                started_at: None,
            }),
            duration,
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requested display duration.
    #[must_use]
    pub fn duration(&self) -> Duration { self.duration }

    /// When the item was first displayed.
    #[must_use]
    pub fn started_at(&self) -> Option<Instant> { self.state().started_at }

    /// Current status, expiring a displaying item whose time is up.
    #[must_use]
    pub fn status_at(&self, now: Instant) -> MediaStatus {
        let mut state = self.state();
        if state.status == MediaStatus::Displaying
            && state
                .started_at
                .is_some_and(|start| now.saturating_duration_since(start) >= self.duration)
        {
            state.status = MediaStatus::Expired;
        }
        state.status
    }

    /// Current status using the runtime clock.
    #[must_use]
    pub fn status(&self) -> MediaStatus { self.status_at(Instant::now()) }

    /// Status as last recorded, without lazy expiry.
    #[must_use]
    pub fn recorded(&self) -> MediaStatus { self.state().status }

    fn advance(&self, from: &[MediaStatus], to: MediaStatus) -> bool {
        let mut state = self.state();
        if from.contains(&state.status) && state.status < to {
            state.status = to;
            true
        } else {
            false
        }
    }

    /// `NotReceived → Decoding`.
    pub fn start_decoding(&self) -> bool {
        self.advance(&[MediaStatus::NotReceived], MediaStatus::Decoding)
    }

    /// `NotReceived | Decoding → Ready`.
    pub fn mark_ready(&self) -> bool {
        self.advance(
            &[MediaStatus::NotReceived, MediaStatus::Decoding],
            MediaStatus::Ready,
        )
    }

    /// `Ready → Displaying`, latching `now` as the start time. Happens at
    /// most once.
    pub fn begin_display_at(&self, now: Instant) -> bool {
        let mut state = self.state();
        if state.status != MediaStatus::Ready {
            return false;
        }
        state.status = MediaStatus::Displaying;
        state.started_at = Some(now);
        true
    }

    /// Force `Expired`. Returns `false` if already expired.
    pub fn expire(&self) -> bool {
        let mut state = self.state();
        if state.status == MediaStatus::Expired {
            return false;
        }
        state.status = MediaStatus::Expired;
        true
    }
}
