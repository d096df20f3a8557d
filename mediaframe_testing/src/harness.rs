//! A pipeline wired to in-memory collaborators.

use std::{sync::Arc, time::Duration};

use mediaframe::{
    Collaborators,
    CompletionPort,
    Pipeline,
    PipelineConfig,
    media::ImageCodec,
    protocol::{ErrorCode, MessageType, Payload},
};

use crate::{FakeTransport, RecordingReplySink, RecordingSurface, StubBehaviour, StubCodec};

/// Running pipeline plus handles to every fake it talks to.
pub struct PipelineHarness {
    pub pipeline: Pipeline,
    pub port: CompletionPort,
    pub transport: Arc<FakeTransport>,
    pub surface: RecordingSurface,
    pub replies: Arc<RecordingReplySink>,
}

impl PipelineHarness {
    /// Spawn a pipeline with `config` and a solid-green stub codec.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid or no Tokio runtime is running.
    #[must_use]
    pub fn spawn(config: &PipelineConfig) -> Self {
        Self::with_codec(config, StubCodec::new(StubBehaviour::Solid(0x07E0), 480))
    }

    /// Spawn a pipeline decoding images with `codec`.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid or no Tokio runtime is running.
    #[must_use]
    pub fn with_codec(config: &PipelineConfig, codec: Arc<dyn ImageCodec>) -> Self {
        let transport = FakeTransport::new(config.buffer_count);
        let surface = RecordingSurface::default();
        let replies = RecordingReplySink::new();
        let pipeline = Pipeline::spawn(
            config,
            Collaborators {
                transport: transport.clone(),
                codec,
                surface: surface.clone(),
                replies: replies.clone(),
            },
        )
        .expect("valid pipeline configuration");
        Self {
            port: pipeline.completion_port(),
            pipeline,
            transport,
            surface,
            replies,
        }
    }

    /// Deliver `frame` through the fake transport.
    ///
    /// # Panics
    ///
    /// Panics if the transport holds no buffer.
    pub fn send(&self, frame: &[u8]) {
        assert!(
            self.transport.deliver(frame, &self.port),
            "no transport buffer available"
        );
    }

    /// Let the pipeline tasks drain their queues.
    pub async fn settle(&self) { tokio::time::sleep(Duration::from_millis(1)).await; }

    /// Poll `done` until it holds, sleeping `step` between attempts.
    /// Returns whether it held within `attempts` tries.
    pub async fn wait_for(
        &self,
        attempts: usize,
        step: Duration,
        mut done: impl FnMut(&Self) -> bool,
    ) -> bool {
        for _ in 0..attempts {
            if done(self) {
                return true;
            }
            tokio::time::sleep(step).await;
        }
        done(self)
    }

    /// Type of every reply so far.
    #[must_use]
    pub fn reply_types(&self) -> Vec<MessageType> {
        self.replies.messages(|message| message.message_type())
    }

    /// `(message id, code)` of every ack or error reply so far.
    #[must_use]
    pub fn reply_codes(&self) -> Vec<(u8, ErrorCode)> {
        self.replies
            .messages(|message| match &message.payload {
                Payload::Ack(code) => Some((message.id, *code)),
                Payload::Error(report) => Some((message.id, report.code)),
                _ => None,
            })
            .into_iter()
            .flatten()
            .collect()
    }
}
