//! Decode context: turns received buffers into media and replies.

use std::{sync::Arc, time::Duration};

use bytes::BytesMut;
use log::{debug, warn};
use tokio::{
    select,
    sync::mpsc::{self, error::TrySendError},
    time::{MissedTickBehavior, interval},
};
use tokio_util::sync::CancellationToken;

use super::{
    DisplayCommand,
    reply::{Reply, ReplySink, failure_frame},
};
use crate::{
    error::MediaframeError,
    media::{Media, MediaContainer, TextGroup},
    metrics::{self, Outcome},
    pool::{BufferPool, TransportBuffer},
    protocol::{Message, Payload, decode, peek_message_id},
    reassembly::Reassembler,
    stats::PipelineStats,
};

/// State owned by the decode task.
pub(crate) struct DecodeContext {
    pub(crate) pool: Arc<BufferPool>,
    pub(crate) reassembler: Arc<Reassembler>,
    pub(crate) replies: Arc<dyn ReplySink>,
    pub(crate) display: mpsc::Sender<DisplayCommand>,
    pub(crate) stats: Arc<PipelineStats>,
    pub(crate) text_duration: Duration,
}

impl DecodeContext {
    /// Process one received buffer and give it back to the pool.
    pub(crate) fn handle(&self, buffer: TransportBuffer) {
        let len = buffer.len();
        if let Some(frame) = self.process(buffer.as_bytes()) {
            self.replies.send(frame);
        }
        self.stats.buffer_processed(len);
        if let Err(e) = self.pool.recycle(buffer) {
            warn!("buffer recycle failed: error={e}");
        }
    }

    fn process(&self, bytes: &[u8]) -> Option<BytesMut> {
        let message = match decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                let id = peek_message_id(bytes);
                warn!("message rejected: id={id}, error={e}");
                self.stats.decode_failure();
                return Some(reject(id, &MediaframeError::from(e)));
            }
        };
        let id = message.id;
        let message_type = message.message_type();
        debug!("message received: id={id}, type={message_type:?}");
        match self.dispatch(message) {
            Ok(reply) => {
                metrics::inc_messages(Outcome::Accepted);
                reply.into_frame(id)
            }
            Err(e) => {
                warn!("message failed: id={id}, type={message_type:?}, error={e}");
                if matches!(e, MediaframeError::Reassembly(_)) {
                    self.stats.reassembly_error();
                }
                Some(reject(id, &e))
            }
        }
    }

    fn dispatch(&self, message: Message<'_>) -> Result<Reply, MediaframeError> {
        match message.payload {
            Payload::TextBatch(batch) => {
                let group = TextGroup::from(batch);
                self.show(MediaContainer::text_group(group, self.text_duration));
            }
            Payload::ImageStart(start) => {
                if let Some(media) = self.reassembler.on_image_start(&start)? {
                    self.show(media);
                }
            }
            Payload::ImageChunk(chunk) => {
                if let Some(media) = self.reassembler.on_image_chunk(&chunk)? {
                    self.show(media);
                }
            }
            Payload::ImageEnd(image_id) => self.reassembler.on_image_end(image_id)?,
            Payload::BacklightOn => self.command(DisplayCommand::Backlight(true)),
            Payload::BacklightOff => self.command(DisplayCommand::Backlight(false)),
            Payload::PingRequest => return Ok(Reply::Pong),
            Payload::Error(report) => {
                warn!("peer reported an error: code={:?}, text={}", report.code, report.text);
                return Ok(Reply::Silent);
            }
            Payload::Ack(_) | Payload::PingResponse => return Ok(Reply::Silent),
        }
        Ok(Reply::Ack)
    }

    fn show(&self, media: Media) { self.command(DisplayCommand::Show(media)); }

    fn command(&self, command: DisplayCommand) {
        match self.display.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(DisplayCommand::Show(media))) => {
                warn!("display channel full; dropping media: status={:?}", media.status());
                media.expire();
                self.stats.media_dropped();
            }
            Err(TrySendError::Full(command)) => {
                warn!("display channel full; dropping command: command={command:?}");
            }
            Err(TrySendError::Closed(_)) => debug!("display context stopped; command discarded"),
        }
    }

    fn sweep(&self) {
        let purged = self.reassembler.purge_expired();
        if !purged.is_empty() {
            debug!("expired transfers purged: images={purged:?}");
        }
    }
}

fn reject(id: u8, error: &MediaframeError) -> BytesMut {
    let kind = error.kind();
    metrics::inc_messages(Outcome::Rejected);
    metrics::inc_errors(kind);
    failure_frame(id, kind, error)
}

/// Receive buffers until shutdown, sweeping stale transfers every
/// `cleanup_interval`.
pub(crate) async fn run_decode_loop(
    context: DecodeContext,
    mut buffers: mpsc::Receiver<TransportBuffer>,
    shutdown: CancellationToken,
    cleanup_interval: Duration,
) {
    let mut cleanup = interval(cleanup_interval);
    cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        select! {
            biased;

            () = shutdown.cancelled() => break,
            received = buffers.recv() => match received {
                Some(buffer) => context.handle(buffer),
                None => break,
            },
            _ = cleanup.tick() => context.sweep(),
        }
    }

    buffers.close();
    while let Ok(buffer) = buffers.try_recv() {
        if let Err(e) = context.pool.release(buffer) {
            warn!("buffer release failed during shutdown: error={e}");
        }
    }
    debug!("decode context stopped");
}
