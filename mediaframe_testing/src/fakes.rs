//! In-memory collaborators for driving a pipeline without hardware.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::BytesMut;
use mediaframe::{
    CompletionPort,
    ReplySink,
    TransferStatus,
    Transport,
    TransportBuffer,
    media::{CodecError, CodecSession, DecodedBlock, ImageCodec, PixelSurface, Text},
    protocol::{Message, Rotation, decode},
    scheduler::RenderSurface,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Transport holding submitted buffers until a test delivers bytes into them.
#[derive(Debug)]
pub struct FakeTransport {
    queued: Mutex<VecDeque<TransportBuffer>>,
    limit: usize,
}

impl FakeTransport {
    /// A transport accepting at most `limit` outstanding buffers.
    #[must_use]
    pub fn new(limit: usize) -> Arc<Self> {
        Arc::new(Self {
            queued: Mutex::new(VecDeque::new()),
            limit,
        })
    }

    /// Buffers waiting for a receive.
    #[must_use]
    pub fn queued(&self) -> usize { lock(&self.queued).len() }

    /// Take the oldest submitted buffer without completing it.
    #[must_use]
    pub fn take(&self) -> Option<TransportBuffer> { lock(&self.queued).pop_front() }

    /// Copy `bytes` into the oldest submitted buffer and report the receive
    /// to `port`. Returns `false` when no buffer is queued.
    ///
    /// Bytes beyond the buffer's capacity are cut off, but the full length is
    /// reported so the pool sees the overrun.
    pub fn deliver(&self, bytes: &[u8], port: &CompletionPort) -> bool {
        let Some(mut buffer) = self.take() else {
            return false;
        };
        let region = buffer.receive_region();
        let copied = bytes.len().min(region.len());
        region[..copied].copy_from_slice(&bytes[..copied]);
        port.complete(buffer, bytes.len(), TransferStatus::Complete);
        true
    }

    /// Report a failed receive on the oldest submitted buffer.
    pub fn fail_next(&self, port: &CompletionPort) -> bool {
        let Some(buffer) = self.take() else {
            return false;
        };
        port.complete(buffer, 0, TransferStatus::Failed);
        true
    }
}

impl Transport for FakeTransport {
    fn submit(&self, buffer: TransportBuffer) -> Result<(), TransportBuffer> {
        let mut queued = lock(&self.queued);
        if queued.len() >= self.limit {
            return Err(buffer);
        }
        queued.push_back(buffer);
        Ok(())
    }
}

/// How [`StubCodec`] treats every payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubBehaviour {
    /// Fill the image with one colour.
    Solid(u16),
    /// Refuse the payload when opening it.
    Reject,
    /// Fail half way through decoding.
    Fail,
    /// Panic while decoding.
    Panic,
}

/// Codec that paints a solid colour in 16×16 blocks, or fails on request.
#[derive(Clone, Copy, Debug)]
pub struct StubCodec {
    behaviour: StubBehaviour,
    side: u16,
}

impl StubCodec {
    /// Codec producing `side`×`side` pixels with `behaviour`.
    #[must_use]
    pub fn new(behaviour: StubBehaviour, side: u16) -> Arc<Self> {
        Arc::new(Self { behaviour, side })
    }
}

impl ImageCodec for StubCodec {
    fn open<'a>(&self, payload: &'a [u8]) -> Result<Box<dyn CodecSession + 'a>, CodecError> {
        if self.behaviour == StubBehaviour::Reject || payload.is_empty() {
            return Err(CodecError::Rejected("stub codec refused payload".into()));
        }
        Ok(Box::new(*self))
    }
}

impl CodecSession for StubCodec {
    fn decode(&mut self, sink: &mut dyn FnMut(DecodedBlock<'_>) -> bool) -> Result<(), CodecError> {
        const BLOCK: u16 = 16;
        let colour = match self.behaviour {
            StubBehaviour::Solid(colour) => colour,
            StubBehaviour::Panic => panic!("stub codec panicked"),
            StubBehaviour::Fail | StubBehaviour::Reject => 0,
        };
        let pixels = vec![colour; usize::from(BLOCK) * usize::from(BLOCK)];
        for y in (0..self.side).step_by(usize::from(BLOCK)) {
            for x in (0..self.side).step_by(usize::from(BLOCK)) {
                if self.behaviour == StubBehaviour::Fail && y > 0 {
                    return Err(CodecError::Failed("stub codec truncated scan".into()));
                }
                let width = BLOCK.min(self.side - x);
                let height = BLOCK.min(self.side - y);
                let len = usize::from(width) * usize::from(height);
                let block = DecodedBlock {
                    x,
                    y,
                    width,
                    height,
                    pixels: &pixels[..len],
                };
                if !sink(block) {
                    return Ok(());
                }
            }
        }
        Ok(())
    }
}

/// One call made on a [`RecordingSurface`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RenderOp {
    /// A frame was blitted; holds its top-left pixel.
    Blit { top_left: Option<u16> },
    /// The screen was filled.
    Fill(u16),
    /// Rotation changed.
    Rotate(Rotation),
    /// A string was drawn.
    Text {
        content: String,
        x: u16,
        y: u16,
        color: u16,
    },
    /// Backlight switched.
    Backlight(bool),
}

/// Surface that records every call in a list shared with the test.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    ops: Arc<Mutex<Vec<RenderOp>>>,
}

impl RecordingSurface {
    /// Copy of every recorded call so far.
    #[must_use]
    pub fn ops(&self) -> Vec<RenderOp> { lock(&self.ops).clone() }

    /// Strings drawn so far, in order.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        lock(&self.ops)
            .iter()
            .filter_map(|op| match op {
                RenderOp::Text { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, op: RenderOp) { lock(&self.ops).push(op); }
}

impl RenderSurface for RecordingSurface {
    fn blit(&mut self, frame: &PixelSurface) {
        self.push(RenderOp::Blit {
            top_left: frame.pixel(0, 0),
        });
    }

    fn fill(&mut self, color: u16) { self.push(RenderOp::Fill(color)); }

    fn set_rotation(&mut self, rotation: Rotation) { self.push(RenderOp::Rotate(rotation)); }

    fn draw_text(&mut self, text: &Text) {
        self.push(RenderOp::Text {
            content: text.content.clone(),
            x: text.x,
            y: text.y,
            color: text.color,
        });
    }

    fn set_backlight(&mut self, on: bool) { self.push(RenderOp::Backlight(on)); }
}

/// Reply sink collecting frames for later inspection.
#[derive(Debug, Default)]
pub struct RecordingReplySink {
    frames: Mutex<Vec<BytesMut>>,
}

impl RecordingReplySink {
    #[must_use]
    pub fn new() -> Arc<Self> { Arc::new(Self::default()) }

    /// Raw frames received so far.
    #[must_use]
    pub fn frames(&self) -> Vec<BytesMut> { lock(&self.frames).clone() }

    /// Apply `f` to each reply decoded as a message.
    ///
    /// # Panics
    ///
    /// Panics if a recorded frame does not decode.
    pub fn messages<R>(&self, mut f: impl FnMut(&Message<'_>) -> R) -> Vec<R> {
        lock(&self.frames)
            .iter()
            .map(|frame| f(&decode(frame).expect("reply frames decode")))
            .collect()
    }
}

impl ReplySink for RecordingReplySink {
    fn send(&self, frame: BytesMut) { lock(&self.frames).push(frame); }
}
