#![cfg(not(loom))]
//! End-to-end tests for the running pipeline.
//!
//! Frames are pushed through a fake transport and the tests observe replies,
//! counters and render calls. Most tests pause Tokio's clock so display ticks
//! and transfer budgets advance deterministically.

use std::time::Duration;

use log::Level;
use mediaframe::{
    ConfigError,
    MediaframeError,
    Pipeline,
    PipelineConfig,
    protocol::{
        ErrorCode,
        ImageFormat,
        ImageResolution,
        MessageType,
        Payload,
        Rotation,
    },
};
use mediaframe_testing::{
    FakeTransport,
    LoggerHandle,
    PipelineHarness,
    RecordingReplySink,
    RecordingSurface,
    RenderOp,
    StubBehaviour,
    StubCodec,
    backlight_frame,
    frame,
    image_chunk_frame,
    image_end_frame,
    image_start_frame,
    jpeg_start,
    logger,
    ping_frame,
    text_batch_frame,
    text_item,
};
use rstest::rstest;
use tokio::time;

const TICK: Duration = Duration::from_millis(33);

#[tokio::test]
async fn ping_is_answered_and_peer_replies_are_not() {
    time::pause();
    let harness = PipelineHarness::spawn(&PipelineConfig::default());
    harness.send(&ping_frame(1));
    harness.send(&frame(2, Payload::Ack(ErrorCode::Success)));
    harness.send(&frame(3, Payload::PingResponse));
    harness.settle().await;

    assert_eq!(harness.reply_types(), vec![MessageType::PingResponse]);
    assert_eq!(harness.replies.messages(|message| message.id), vec![1]);
    let stats = harness.pipeline.stats();
    assert_eq!(stats.buffers_received, 3);
    assert_eq!(stats.buffers_processed, 3);
}

#[rstest]
#[case::unknown_type(vec![0x7E, 0x63, 0x09, 0x00, 0x00], (9, ErrorCode::UnknownMessageType))]
#[case::bad_marker(vec![0x00, 0x01, 0x09, 0x00, 0x00], (0, ErrorCode::InvalidFormat))]
#[case::short_payload(vec![0x7E, 0x0C, 0x04, 0x00, 0x08], (4, ErrorCode::PayloadLengthMismatch))]
#[tokio::test]
async fn undecodable_buffers_get_an_error_reply(
    #[case] bytes: Vec<u8>,
    #[case] expected: (u8, ErrorCode),
) {
    time::pause();
    let config = PipelineConfig::default();
    let harness = PipelineHarness::spawn(&config);
    harness.send(&bytes);
    harness.settle().await;

    assert_eq!(harness.reply_codes(), vec![expected]);
    let stats = harness.pipeline.stats();
    assert_eq!(stats.decode_failures, 1);
    assert_eq!(stats.bytes_processed, 5);
    assert_eq!(harness.transport.queued(), config.buffer_count);
}

#[tokio::test]
async fn chunk_for_unknown_image_is_refused() {
    time::pause();
    let harness = PipelineHarness::spawn(&PipelineConfig::default());
    harness.send(&image_chunk_frame(4, 9, 0, 0, &[1, 2, 3]));
    harness.send(&image_end_frame(5, 9));
    harness.settle().await;

    assert_eq!(
        harness.reply_codes(),
        vec![
            (4, ErrorCode::ImageIdMismatch),
            (5, ErrorCode::ImageIdMismatch)
        ]
    );
    assert_eq!(harness.pipeline.stats().reassembly_errors, 2);
}

#[tokio::test]
async fn ending_an_incomplete_transfer_fails_it() {
    time::pause();
    let harness = PipelineHarness::spawn(&PipelineConfig::default());
    harness.send(&image_start_frame(1, jpeg_start(3, 2, 8, 100)));
    harness.send(&image_chunk_frame(2, 3, 0, 0, &[0; 4]));
    harness.send(&image_end_frame(3, 3));
    harness.settle().await;

    assert_eq!(
        harness.reply_codes(),
        vec![
            (1, ErrorCode::Success),
            (2, ErrorCode::Success),
            (3, ErrorCode::PayloadLengthMismatch),
        ]
    );
    assert_eq!(harness.pipeline.active_transfers(), 0);
}

#[tokio::test]
async fn backlight_reaches_the_surface() {
    time::pause();
    let harness = PipelineHarness::spawn(&PipelineConfig::default());
    harness.send(&backlight_frame(1, false));
    harness.send(&backlight_frame(2, true));
    harness.settle().await;

    assert_eq!(
        harness.surface.ops(),
        vec![RenderOp::Backlight(false), RenderOp::Backlight(true)]
    );
    assert_eq!(
        harness.reply_codes(),
        vec![(1, ErrorCode::Success), (2, ErrorCode::Success)]
    );
}

#[tokio::test]
async fn text_is_replaced_once_its_duration_elapses() {
    time::pause();
    let config = PipelineConfig::default().with_text_duration(Duration::from_millis(100));
    let harness = PipelineHarness::spawn(&config);
    harness.send(&text_batch_frame(1, Rotation::Deg0, vec![text_item(0, 0, 1, "first")]));
    harness.send(&text_batch_frame(2, Rotation::Deg0, vec![text_item(0, 0, 1, "second")]));

    time::sleep(TICK + Duration::from_millis(10)).await;
    assert_eq!(harness.surface.texts(), vec!["first"]);
    assert_eq!(harness.pipeline.stats().queue_depth, 1);

    time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.surface.texts(), vec!["first"]);

    time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.surface.texts(), vec!["first", "second"]);
    assert_eq!(harness.pipeline.stats().queue_depth, 0);
}

#[tokio::test]
async fn raw_image_is_displayed_after_reassembly() {
    time::pause();
    let harness = PipelineHarness::spawn(&PipelineConfig::default());
    let side = ImageResolution::Sq240.side();
    let payload = [0xF8_u8, 0x00].repeat(usize::from(side) * usize::from(side));
    let chunks = payload.chunks(3840).collect::<Vec<_>>();
    let mut start = jpeg_start(2, u8::try_from(chunks.len()).expect("chunk count"), 0, 250);
    start.format = ImageFormat::Rgb565;
    start.resolution = ImageResolution::Sq240;
    start.rotation = Rotation::Deg90;
    start.total_size = u32::try_from(payload.len()).expect("payload size");

    harness.send(&image_start_frame(0, start));
    harness.settle().await;
    let mut offset = 0;
    for (chunk_id, data) in chunks.iter().enumerate() {
        let chunk_id = u8::try_from(chunk_id).expect("chunk id");
        harness.send(&image_chunk_frame(chunk_id + 1, 2, chunk_id, offset, data));
        harness.settle().await;
        offset += u32::try_from(data.len()).expect("chunk size");
    }
    time::sleep(TICK * 2).await;

    assert_eq!(
        harness.surface.ops(),
        vec![
            RenderOp::Rotate(Rotation::Deg90),
            RenderOp::Blit {
                top_left: Some(0xF800)
            },
        ]
    );
    assert!(harness.reply_codes().iter().all(|(_, code)| *code == ErrorCode::Success));
    assert_eq!(harness.pipeline.active_transfers(), 0);
}

#[tokio::test]
async fn raw_image_chunks_land_at_their_offsets() {
    time::pause();
    let harness = PipelineHarness::spawn(&PipelineConfig::default());
    let side = usize::from(ImageResolution::Sq240.side());
    let mut payload = [0x00_u8, 0x1F].repeat(side * side);
    payload[..2].copy_from_slice(&[0xF8, 0x00]);
    let chunks = payload.chunks(3840).collect::<Vec<_>>();
    let mut start = jpeg_start(4, u8::try_from(chunks.len()).expect("chunk count"), 0, 250);
    start.format = ImageFormat::Rgb565;
    start.resolution = ImageResolution::Sq240;
    start.total_size = u32::try_from(payload.len()).expect("payload size");

    harness.send(&image_start_frame(0, start));
    harness.settle().await;
    for (chunk_id, data) in chunks.iter().enumerate().rev() {
        let offset = u32::try_from(chunk_id * 3840).expect("offset");
        let chunk_id = u8::try_from(chunk_id).expect("chunk id");
        harness.send(&image_chunk_frame(chunk_id + 1, 4, chunk_id, offset, data));
        harness.settle().await;
    }
    time::sleep(TICK * 2).await;

    assert_eq!(
        harness.surface.ops(),
        vec![
            RenderOp::Rotate(Rotation::Deg0),
            RenderOp::Blit {
                top_left: Some(0xF800)
            },
        ]
    );
}

#[rstest]
#[tokio::test]
async fn full_decode_queue_drops_the_newest_buffer(mut logger: LoggerHandle) {
    time::pause();
    let config = PipelineConfig::default().with_decode_queue_capacity(1);
    let harness = PipelineHarness::spawn(&config);
    for id in 0..4 {
        harness.send(&ping_frame(id));
    }
    harness.settle().await;

    let stats = harness.pipeline.stats();
    assert_eq!(stats.buffers_received, 4);
    assert_eq!(stats.transport_overflows, 3);
    assert_eq!(stats.buffers_processed, 1);
    assert_eq!(harness.replies.messages(|message| message.id), vec![0]);
    assert_eq!(harness.transport.queued(), config.buffer_count);
    assert!(logger.saw(Level::Warn, "decode queue full"));
}

#[tokio::test]
async fn full_display_queue_drops_media() {
    time::pause();
    let config = PipelineConfig::default()
        .with_display_queue_capacity(1)
        .with_display_tick(Duration::from_secs(10));
    let harness = PipelineHarness::spawn(&config);
    for id in 0..3 {
        harness.send(&text_batch_frame(id, Rotation::Deg0, vec![text_item(0, 0, 1, "x")]));
    }
    harness.settle().await;

    assert_eq!(harness.pipeline.stats().media_dropped, 2);
}

#[tokio::test]
async fn failed_decode_is_counted_and_never_shown() {
    let config = PipelineConfig::default();
    let harness = PipelineHarness::with_codec(&config, StubCodec::new(StubBehaviour::Fail, 480));
    let mut start = jpeg_start(6, 1, 4, 100);
    start.embedded = &[0xFF, 0xD8, 0xFF, 0xD9];
    harness.send(&image_start_frame(1, start));

    let failed = harness
        .wait_for(200, Duration::from_millis(5), |h| {
            h.pipeline.stats().codec_failures == 1
        })
        .await;
    assert!(failed, "codec failure was not recorded");
    time::sleep(TICK * 2).await;
    assert!(harness.surface.ops().is_empty());
}

#[tokio::test]
async fn buffers_return_to_the_pool_after_shutdown() {
    time::pause();
    let PipelineHarness {
        pipeline,
        port,
        transport,
        ..
    } = PipelineHarness::spawn(&PipelineConfig::default());
    let pool = pipeline.pool().clone();
    assert_eq!(pool.free_count(), 0);

    pipeline.shutdown().await;
    assert!(transport.deliver(&ping_frame(1), &port));
    assert_eq!(pool.free_count(), 1);
}

#[test]
fn invalid_configuration_is_refused() {
    let result = Pipeline::spawn(
        &PipelineConfig::default().with_buffer_count(0),
        mediaframe::Collaborators {
            transport: FakeTransport::new(1),
            codec: StubCodec::new(StubBehaviour::Reject, 1),
            surface: RecordingSurface::default(),
            replies: RecordingReplySink::new(),
        },
    );
    assert!(matches!(
        result,
        Err(MediaframeError::Config(ConfigError::ZeroValue {
            field: "buffer_count"
        }))
    ));
}
