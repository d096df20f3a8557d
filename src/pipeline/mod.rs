//! Running pipeline: transport completions in, rendered media out.
//!
//! [`Pipeline::spawn`] wires the buffer pool, the decode context and the
//! display context together:
//!
//! ```text
//! transport ──CompletionPort──▶ decode task ──DisplayCommand──▶ display task
//!     ▲                            │   │                            │
//!     └──── recycled buffers ──────┘   └─▶ background image decode  └─▶ RenderSurface
//! ```
//!
//! Tasks run on a [`TaskTracker`] and stop when [`Pipeline::shutdown`]
//! cancels their token. A panic inside a task is caught and logged.

mod completion;
mod display;
mod reply;
mod worker;

use std::{panic::AssertUnwindSafe, sync::Arc};

pub use completion::{CompletionPort, TransferStatus};
use futures::FutureExt;
use log::debug;
pub use reply::ReplySink;
use tokio::{sync::mpsc, time::Instant};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::PipelineConfig,
    error::Result,
    media::{ImageCodec, ImageDecoder, Media, MediaStatus},
    panic::format_panic,
    pool::{BufferPool, Transport},
    protocol::ImageId,
    reassembly::{Reassembler, ReassemblyLimits},
    scheduler::{DisplayScheduler, RenderSurface},
    stats::{PipelineStats, StatsSnapshot},
};

/// Message from the decode context to the display context.
#[derive(Debug)]
pub(crate) enum DisplayCommand {
    Show(Media),
    Backlight(bool),
}

/// Collaborators the pipeline drives.
pub struct Collaborators<S> {
    /// Peripheral link buffers are submitted to.
    pub transport: Arc<dyn Transport>,
    /// Decoder for compressed images.
    pub codec: Arc<dyn ImageCodec>,
    /// Output device.
    pub surface: S,
    /// Destination for acks and error replies.
    pub replies: Arc<dyn ReplySink>,
}

/// Handle to a running pipeline.
#[derive(Debug)]
pub struct Pipeline {
    pool: Arc<BufferPool>,
    port: CompletionPort,
    reassembler: Arc<Reassembler>,
    stats: Arc<PipelineStats>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Pipeline {
    /// Validate `config`, start the decode and display tasks and hand every
    /// buffer to the transport.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MediaframeError::Config`](crate::MediaframeError::Config) if
    /// `config` fails validation.
    pub fn spawn<S>(config: &PipelineConfig, parts: Collaborators<S>) -> Result<Self>
    where
        S: RenderSurface + 'static,
    {
        config.validate()?;
        let Collaborators {
            transport,
            codec,
            surface,
            replies,
        } = parts;
        let stats = Arc::new(PipelineStats::default());
        let shutdown = CancellationToken::new();
        let tracker = TaskTracker::new();

        let pool = Arc::new(BufferPool::new(
            config.buffer_count,
            config.buffer_capacity,
            transport,
        ));
        let decoder = ImageDecoder::new(codec, tracker.clone(), stats.clone());
        let reassembler = Arc::new(Reassembler::new(ReassemblyLimits::from(config), decoder));
        let (buffer_tx, buffer_rx) = mpsc::channel(config.decode_queue_capacity);
        let (display_tx, display_rx) = mpsc::channel(config.media_channel_capacity);

        let context = worker::DecodeContext {
            pool: pool.clone(),
            reassembler: reassembler.clone(),
            replies,
            display: display_tx,
            stats: stats.clone(),
            text_duration: config.text_duration,
        };
        spawn_guarded(
            &tracker,
            "decode",
            worker::run_decode_loop(
                context,
                buffer_rx,
                shutdown.clone(),
                config.cleanup_interval,
            ),
        );
        spawn_guarded(
            &tracker,
            "display",
            display::run_display_loop(
                DisplayScheduler::new(config.display_queue_capacity, surface),
                display_rx,
                shutdown.clone(),
                config.display_tick,
                stats.clone(),
            ),
        );

        let submitted = pool.replenish();
        debug!(
            "pipeline started: buffers={submitted}/{}, capacity={}",
            pool.capacity(),
            pool.buffer_capacity()
        );
        Ok(Self {
            port: CompletionPort::new(pool.clone(), buffer_tx, stats.clone()),
            pool,
            reassembler,
            stats,
            shutdown,
            tracker,
        })
    }

    /// Port the transport reports completed receives to.
    #[must_use]
    pub fn completion_port(&self) -> CompletionPort { self.port.clone() }

    #[must_use]
    pub fn pool(&self) -> &Arc<BufferPool> { &self.pool }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot { self.stats.snapshot() }

    /// Status of the image being assembled under `image_id`. Late transfers
    /// are torn down first and then read as
    /// [`MediaStatus::Expired`](crate::MediaStatus::Expired); `None` when no
    /// transfer for the id is in flight or timed out.
    #[must_use]
    pub fn transfer_status(&self, image_id: ImageId) -> Option<MediaStatus> {
        self.reassembler.status(image_id, Instant::now())
    }

    /// Number of image transfers in flight.
    #[must_use]
    pub fn active_transfers(&self) -> usize { self.reassembler.active_count() }

    /// Stop every task and wait for in-flight image decodes to settle.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;
        debug!("pipeline stopped");
    }
}

fn spawn_guarded<F>(tracker: &TaskTracker, task: &'static str, body: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    tracker.spawn(async move {
        if let Err(panic) = AssertUnwindSafe(body).catch_unwind().await {
            let panic_msg = format_panic(panic);
            // `log-always` forwards this to `log` as well.
            tracing::error!(panic = %panic_msg, task, "pipeline task panicked");
        }
    });
}
