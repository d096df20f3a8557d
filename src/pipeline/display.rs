//! Display context: the only task that touches the render surface.

use std::{sync::Arc, time::Duration};

use log::{debug, warn};
use tokio::{
    select,
    sync::mpsc,
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

use super::DisplayCommand;
use crate::{
    metrics,
    scheduler::{DisplayScheduler, RenderSurface},
    stats::PipelineStats,
};

/// Apply commands as they arrive and advance the scheduler every `tick`.
pub(crate) async fn run_display_loop<S: RenderSurface>(
    mut scheduler: DisplayScheduler<S>,
    mut commands: mpsc::Receiver<DisplayCommand>,
    shutdown: CancellationToken,
    tick: Duration,
    stats: Arc<PipelineStats>,
) {
    let mut ticker = interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        select! {
            biased;

            () = shutdown.cancelled() => break,
            command = commands.recv() => match command {
                Some(DisplayCommand::Show(media)) => {
                    if let Err(e) = scheduler.enqueue(media) {
                        warn!("display queue full; dropping media: capacity={}", scheduler.capacity());
                        metrics::inc_errors(e.kind());
                        e.into_inner().expire();
                        stats.media_dropped();
                    }
                }
                Some(DisplayCommand::Backlight(on)) => scheduler.set_backlight(on),
                None => break,
            },
            _ = ticker.tick() => {
                if scheduler.update() {
                    debug!("display advanced: queued={}", scheduler.queue_depth());
                }
            }
        }
        let depth = scheduler.queue_depth();
        stats.set_queue_depth(depth);
        metrics::set_display_queue_depth(depth);
    }
    debug!("display context stopped");
}
