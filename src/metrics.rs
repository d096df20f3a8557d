//! Metric helpers for `mediaframe`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! the helpers compile to no-ops.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

use crate::error::ErrorKind;

/// Name of the counter tracking transport completions.
pub const BUFFERS_RECEIVED: &str = "mediaframe_buffers_received_total";
/// Name of the counter tracking handled messages by outcome.
pub const MESSAGES_TOTAL: &str = "mediaframe_messages_total";
/// Name of the counter tracking errors by kind.
pub const ERRORS_TOTAL: &str = "mediaframe_errors_total";
/// Name of the counter tracking buffers dropped on a full decode channel.
pub const TRANSPORT_OVERFLOWS: &str = "mediaframe_transport_overflows_total";
/// Name of the counter tracking failed image decodes.
pub const CODEC_FAILURES: &str = "mediaframe_codec_failures_total";
/// Name of the gauge tracking display queue depth.
pub const DISPLAY_QUEUE_DEPTH: &str = "mediaframe_display_queue_depth";

/// Result of handling one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Handled and acknowledged.
    Accepted,
    /// Refused with an error reply.
    Rejected,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Accepted => "accepted",
            Outcome::Rejected => "rejected",
        }
    }
}

/// Record a transport completion.
pub fn inc_buffers_received() {
    #[cfg(feature = "metrics")]
    counter!(BUFFERS_RECEIVED).increment(1);
}

/// Record a handled message.
pub fn inc_messages(outcome: Outcome) {
    #[cfg(feature = "metrics")]
    counter!(MESSAGES_TOTAL, "outcome" => outcome.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = outcome.as_str();
}

/// Record an error of the given kind.
pub fn inc_errors(kind: ErrorKind) {
    #[cfg(feature = "metrics")]
    counter!(ERRORS_TOTAL, "kind" => kind.as_str()).increment(1);
    #[cfg(not(feature = "metrics"))]
    let _ = kind;
}

/// Record a buffer dropped because the decode channel was full.
pub fn inc_transport_overflows() {
    #[cfg(feature = "metrics")]
    counter!(TRANSPORT_OVERFLOWS).increment(1);
}

/// Record a failed image decode.
pub fn inc_codec_failures() {
    #[cfg(feature = "metrics")]
    counter!(CODEC_FAILURES).increment(1);
}

/// Publish the display queue depth.
#[expect(
    clippy::cast_precision_loss,
    reason = "queue depth is bounded by configuration"
)]
pub fn set_display_queue_depth(depth: usize) {
    #[cfg(feature = "metrics")]
    gauge!(DISPLAY_QUEUE_DEPTH).set(depth as f64);
    #[cfg(not(feature = "metrics"))]
    let _ = depth as f64;
}
