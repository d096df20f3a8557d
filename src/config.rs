//! Pipeline configuration.
//!
//! [`PipelineConfig`] gathers every tunable the pipeline reads: pool sizing,
//! channel and queue bounds, timing of the display tick and transfer
//! deadlines, and the geometry of the decode surface. Values can be built in
//! code with the `with_*` setters or deserialised with `serde`.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Width and height in pixels of the default 480×480 panel.
pub const DEFAULT_SCREEN_SIDE: u16 = 480;

/// Errors returned by [`PipelineConfig::validate`].
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A count or capacity that must be positive was zero.
    #[error("{field} must be greater than zero")]
    ZeroValue {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A duration that must be positive was zero.
    #[error("{field} must be a non-zero duration")]
    ZeroDuration {
        /// Name of the offending field.
        field: &'static str,
    },
    /// The pool cannot hold more slots than the slot id space.
    #[error("buffer_count {count} exceeds the maximum of {max}")]
    TooManyBuffers {
        /// Requested number of buffers.
        count: usize,
        /// Largest supported number of buffers.
        max: usize,
    },
    /// Transport buffers must at least hold a message header.
    #[error("buffer_capacity {capacity} is smaller than the {min}-byte header")]
    BufferTooSmall {
        /// Requested capacity.
        capacity: usize,
        /// Smallest usable capacity.
        min: usize,
    },
}

/// Tunables for the ingestion and display pipeline.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use mediaframe::config::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_buffer_count(8)
///     .with_text_duration(Duration::from_secs(2));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.buffer_count, 8);
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of transport buffers in the pool.
    pub buffer_count: usize,
    /// Capacity in bytes of each transport buffer.
    pub buffer_capacity: usize,
    /// Bound of the channel between the completion and decode contexts.
    pub decode_queue_capacity: usize,
    /// Bound of the channel between the decode and display contexts.
    pub media_channel_capacity: usize,
    /// Bound of the scheduler's FIFO.
    pub display_queue_capacity: usize,
    /// Period of the display tick.
    pub display_tick: Duration,
    /// Period of the timed-out transfer sweep in the decode context.
    pub cleanup_interval: Duration,
    /// How long a text batch stays on screen.
    pub text_duration: Duration,
    /// Fixed part of every transfer's time budget.
    pub transfer_timeout_base: Duration,
    /// Additional budget granted per expected chunk.
    pub transfer_timeout_per_chunk: Duration,
    /// Largest compressed image accepted, in bytes.
    pub max_image_size: usize,
    /// Width of the decode surface.
    pub screen_width: u16,
    /// Height of the decode surface.
    pub screen_height: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            buffer_count: 4,
            buffer_capacity: 4096,
            decode_queue_capacity: 16,
            media_channel_capacity: 8,
            display_queue_capacity: 8,
            display_tick: Duration::from_millis(33),
            cleanup_interval: Duration::from_secs(1),
            text_duration: Duration::from_secs(5),
            transfer_timeout_base: Duration::from_secs(1),
            transfer_timeout_per_chunk: Duration::from_millis(500),
            max_image_size: 1024 * 1024,
            screen_width: DEFAULT_SCREEN_SIDE,
            screen_height: DEFAULT_SCREEN_SIDE,
        }
    }
}

impl PipelineConfig {
    /// Set the number of transport buffers.
    #[must_use]
    pub fn with_buffer_count(mut self, count: usize) -> Self {
        self.buffer_count = count;
        self
    }

    /// Set the capacity of each transport buffer.
    #[must_use]
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the completion → decode channel bound.
    #[must_use]
    pub fn with_decode_queue_capacity(mut self, capacity: usize) -> Self {
        self.decode_queue_capacity = capacity;
        self
    }

    /// Set the decode → display channel bound.
    #[must_use]
    pub fn with_media_channel_capacity(mut self, capacity: usize) -> Self {
        self.media_channel_capacity = capacity;
        self
    }

    /// Set the scheduler FIFO bound.
    #[must_use]
    pub fn with_display_queue_capacity(mut self, capacity: usize) -> Self {
        self.display_queue_capacity = capacity;
        self
    }

    /// Set the display tick period.
    #[must_use]
    pub fn with_display_tick(mut self, tick: Duration) -> Self {
        self.display_tick = tick;
        self
    }

    /// Set the transfer sweep period.
    #[must_use]
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set how long text batches are displayed.
    #[must_use]
    pub fn with_text_duration(mut self, duration: Duration) -> Self {
        self.text_duration = duration;
        self
    }

    /// Set the transfer budget as `base + per_chunk × expected_chunks`.
    #[must_use]
    pub fn with_transfer_timeout(mut self, base: Duration, per_chunk: Duration) -> Self {
        self.transfer_timeout_base = base;
        self.transfer_timeout_per_chunk = per_chunk;
        self
    }

    /// Set the largest accepted compressed image.
    #[must_use]
    pub fn with_max_image_size(mut self, bytes: usize) -> Self {
        self.max_image_size = bytes;
        self
    }

    /// Set the decode surface geometry.
    #[must_use]
    pub fn with_screen_size(mut self, width: u16, height: u16) -> Self {
        self.screen_width = width;
        self.screen_height = height;
        self
    }

    /// Time budget granted to a transfer expecting `expected_chunks` chunks.
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use mediaframe::config::PipelineConfig;
    ///
    /// let config = PipelineConfig::default()
    ///     .with_transfer_timeout(Duration::from_secs(1), Duration::from_millis(250));
    /// assert_eq!(config.transfer_budget(4), Duration::from_secs(2));
    /// ```
    #[must_use]
    pub fn transfer_budget(&self, expected_chunks: u8) -> Duration {
        crate::reassembly::ReassemblyLimits::from(self).budget(expected_chunks)
    }

    /// Check that every field holds a usable value.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] encountered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("buffer_count", self.buffer_count),
            ("decode_queue_capacity", self.decode_queue_capacity),
            ("media_channel_capacity", self.media_channel_capacity),
            ("display_queue_capacity", self.display_queue_capacity),
            ("max_image_size", self.max_image_size),
            ("screen_width", usize::from(self.screen_width)),
            ("screen_height", usize::from(self.screen_height)),
        ];
        if let Some((field, _)) = counts.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::ZeroValue { field });
        }
        let durations = [
            ("display_tick", self.display_tick),
            ("cleanup_interval", self.cleanup_interval),
            ("transfer_timeout_base", self.transfer_timeout_base),
        ];
        if let Some((field, _)) = durations.iter().find(|(_, value)| value.is_zero()) {
            return Err(ConfigError::ZeroDuration { field });
        }
        if self.buffer_count > crate::pool::MAX_BUFFERS {
            return Err(ConfigError::TooManyBuffers {
                count: self.buffer_count,
                max: crate::pool::MAX_BUFFERS,
            });
        }
        if self.buffer_capacity < crate::protocol::HEADER_LEN {
            return Err(ConfigError::BufferTooSmall {
                capacity: self.buffer_capacity,
                min: crate::protocol::HEADER_LEN,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::rstest;

    use super::{ConfigError, PipelineConfig};

    #[test]
    fn defaults_are_valid() { assert_eq!(PipelineConfig::default().validate(), Ok(())); }

    #[rstest]
    #[case::buffers(PipelineConfig::default().with_buffer_count(0), "buffer_count")]
    #[case::display(PipelineConfig::default().with_display_queue_capacity(0), "display_queue_capacity")]
    #[case::screen(PipelineConfig::default().with_screen_size(0, 480), "screen_width")]
    fn zero_counts_are_rejected(#[case] config: PipelineConfig, #[case] field: &'static str) {
        assert_eq!(config.validate(), Err(ConfigError::ZeroValue { field }));
    }

    #[test]
    fn zero_tick_is_rejected() {
        let config = PipelineConfig::default().with_display_tick(Duration::ZERO);
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroDuration { field: "display_tick" })
        );
    }

    #[test]
    fn undersized_buffers_are_rejected() {
        let config = PipelineConfig::default().with_buffer_capacity(3);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BufferTooSmall { capacity: 3, .. })
        ));
    }

    #[test]
    fn budget_grows_with_chunk_count() {
        let config = PipelineConfig::default();
        assert!(config.transfer_budget(8) > config.transfer_budget(2));
        assert_eq!(config.transfer_budget(0), config.transfer_timeout_base);
    }

    #[test]
    fn missing_fields_take_defaults_when_deserialised() {
        use serde::{Deserialize, de::value::{Error, MapDeserializer}};

        let fields = vec![("buffer_count", 8_usize), ("max_image_size", 4096)];
        let config =
            PipelineConfig::deserialize(MapDeserializer::<_, Error>::new(fields.into_iter()))
                .expect("config map deserialises");
        assert_eq!(
            config,
            PipelineConfig::default()
                .with_buffer_count(8)
                .with_max_image_size(4096)
        );
    }
}
