//! Test doubles and helpers for exercising a `mediaframe` pipeline in memory.
//!
//! ```rust
//! use mediaframe_testing::{FakeTransport, ping_frame};
//!
//! let transport = FakeTransport::new(4);
//! assert_eq!(transport.queued(), 0);
//! assert_eq!(ping_frame(3)[2], 3);
//! ```

#[cfg(not(loom))]
pub mod fakes;
pub mod frames;
#[cfg(not(loom))]
pub mod harness;
pub mod logging;
pub mod metrics;

#[cfg(not(loom))]
pub use fakes::{
    FakeTransport,
    RecordingReplySink,
    RecordingSurface,
    RenderOp,
    StubBehaviour,
    StubCodec,
};
pub use frames::{
    backlight_frame,
    frame,
    image_chunk_frame,
    image_end_frame,
    image_start_frame,
    jpeg_start,
    ping_frame,
    text_batch_frame,
    text_item,
};
#[cfg(not(loom))]
pub use harness::PipelineHarness;
pub use logging::{LoggerHandle, logger};
