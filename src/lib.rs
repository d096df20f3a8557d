#![doc(html_root_url = "https://docs.rs/mediaframe/latest")]
//! Media ingestion and display scheduling for a peripheral-attached screen.
//!
//! Messages arrive in fixed-size transport buffers drawn from a
//! [`BufferPool`](pool::BufferPool). The [`protocol`] decoder turns each
//! buffer into a typed message, the [`reassembly`] layer stitches chunked
//! images back together and hands them to background decoding, and the
//! [`scheduler`] presents text and images for their requested durations.
//! [`pipeline`] runs all of this on Tokio tasks.

pub mod byte_order;
pub mod config;
pub mod error;
pub mod media;
pub mod metrics;
pub mod panic;
#[cfg(not(loom))]
pub mod pipeline;
pub mod pool;
pub mod protocol;
pub mod reassembly;
pub mod scheduler;
pub mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use error::{ErrorKind, MediaframeError, Result};
pub use media::{Media, MediaContainer, MediaKind, MediaStatus};
#[cfg(not(loom))]
pub use pipeline::{Collaborators, CompletionPort, Pipeline, ReplySink, TransferStatus};
pub use pool::{BufferPool, PoolError, Transport, TransportBuffer};
pub use protocol::{DecodeError, Message, Payload};
pub use reassembly::{Reassembler, ReassemblyError};
pub use scheduler::{DisplayScheduler, EnqueueError, RenderSurface};
pub use stats::{PipelineStats, StatsSnapshot};
