//! Tests for image transfer reassembly.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rstest::{fixture, rstest};
use tokio::time::Instant;
use tokio_util::task::TaskTracker;

use super::*;
use crate::{
    error::ErrorKind,
    media::{CodecError, CodecSession, DecodedBlock, ImageCodec, ImageDecoder, MediaStatus},
    protocol::{ImageChunk, ImageFormat, ImageId, ImageResolution, ImageStart, Rotation},
    stats::PipelineStats,
};

/// Codec that accepts any payload, remembers it and draws nothing.
#[derive(Default)]
struct BlankCodec {
    opened: Mutex<Vec<Vec<u8>>>,
}

impl BlankCodec {
    fn opened(&self) -> Vec<Vec<u8>> {
        self.opened.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

impl ImageCodec for BlankCodec {
    fn open<'a>(&self, payload: &'a [u8]) -> Result<Box<dyn CodecSession + 'a>, CodecError> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.to_vec());
        Ok(Box::new(BlankSession))
    }
}

struct BlankSession;

impl CodecSession for BlankSession {
    fn decode(&mut self, _sink: &mut dyn FnMut(DecodedBlock<'_>) -> bool) -> Result<(), CodecError> {
        Ok(())
    }
}

const LIMITS: ReassemblyLimits = ReassemblyLimits {
    timeout_base: Duration::from_secs(1),
    timeout_per_chunk: Duration::from_millis(500),
    max_image_size: 1024,
    surface_width: 4,
    surface_height: 4,
};

struct Harness {
    reassembler: Reassembler,
    codec: Arc<BlankCodec>,
    tracker: TaskTracker,
}

impl Harness {
    async fn settle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
    }
}

#[fixture]
fn harness() -> Harness {
    let tracker = TaskTracker::new();
    let codec = Arc::new(BlankCodec::default());
    let decoder = ImageDecoder::new(
        codec.clone(),
        tracker.clone(),
        Arc::new(PipelineStats::default()),
    );
    Harness {
        reassembler: Reassembler::new(LIMITS, decoder),
        codec,
        tracker,
    }
}

fn start(id: u8, chunk_count: u8, total_size: u32) -> ImageStart<'static> {
    ImageStart {
        image_id: ImageId::new(id),
        format: ImageFormat::Jpeg,
        resolution: ImageResolution::Sq480,
        delay_ms: 200,
        total_size,
        chunk_count,
        rotation: Rotation::Deg0,
        embedded: &[],
    }
}

fn chunk(id: u8, chunk_id: u8, offset: u32, data: &[u8]) -> ImageChunk<'_> {
    ImageChunk {
        image_id: ImageId::new(id),
        chunk_id,
        offset,
        data,
    }
}

const PARTS: [&[u8]; 3] = [&[1, 2, 3, 4], &[5, 6, 7, 8], &[9, 10]];

#[rstest]
#[case::in_order([0, 1, 2])]
#[case::reversed([2, 1, 0])]
#[case::shuffled([1, 2, 0])]
#[tokio::test]
async fn chunks_complete_in_any_order(harness: Harness, #[case] order: [u8; 3]) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    assert!(reassembler.on_image_start_at(&start(7, 3, 10), now).expect("start").is_none());

    let mut completed = None;
    for (step, &chunk_id) in order.iter().enumerate() {
        let offset = u32::from(chunk_id) * 4;
        let result = reassembler
            .on_image_chunk_at(&chunk(7, chunk_id, offset, PARTS[usize::from(chunk_id)]), now)
            .expect("chunk accepted");
        if step < 2 {
            assert!(result.is_none(), "completed early at step {step}");
        } else {
            completed = result;
        }
    }

    let media = completed.expect("last chunk completes the transfer");
    assert!(media.lifecycle().recorded() >= MediaStatus::Decoding);
    assert_eq!(reassembler.active_count(), 0);
    harness.settle().await;
    assert_eq!(media.lifecycle().recorded(), MediaStatus::Ready);
    assert!(media.as_image().expect("image").is_decoded());
    assert_eq!(harness.codec.opened(), vec![(1..=10).collect::<Vec<u8>>()]);
}

#[rstest]
#[tokio::test]
async fn end_acknowledges_a_completed_transfer_once(harness: Harness) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(3, 1, 2), now).expect("start");
    reassembler
        .on_image_chunk_at(&chunk(3, 0, 0, &[1, 2]), now)
        .expect("chunk")
        .expect("complete");

    assert_eq!(reassembler.on_image_end(ImageId::new(3)), Ok(()));
    assert_eq!(
        reassembler.on_image_end(ImageId::new(3)),
        Err(ReassemblyError::ImageIdMismatch {
            image_id: ImageId::new(3)
        })
    );
    harness.settle().await;
}

#[rstest]
#[tokio::test]
async fn embedded_chunk_can_complete_the_transfer(harness: Harness) {
    let mut message = start(9, 1, 3);
    message.embedded = &[0xFF, 0xD8, 0xFF];
    let media = harness
        .reassembler
        .on_image_start_at(&message, Instant::now())
        .expect("start")
        .expect("complete");
    harness.settle().await;
    assert_eq!(media.lifecycle().recorded(), MediaStatus::Ready);
}

#[rstest]
fn embedded_chunk_counts_as_chunk_zero(harness: Harness) {
    let now = Instant::now();
    let mut message = start(9, 2, 4);
    message.embedded = &[1, 2];
    harness.reassembler.on_image_start_at(&message, now).expect("start");
    let duplicate = harness
        .reassembler
        .on_image_chunk_at(&chunk(9, 0, 0, &[1, 2]), now)
        .expect("duplicate ignored");
    assert!(duplicate.is_none());
    assert!(harness.reassembler.is_active(ImageId::new(9)));
}

#[rstest]
fn duplicate_chunks_leave_the_payload_alone(harness: Harness) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(1, 2, 4), now).expect("start");
    reassembler.on_image_chunk_at(&chunk(1, 0, 0, &[1, 2]), now).expect("chunk");
    // A second copy would overflow the transfer if it were appended.
    reassembler.on_image_chunk_at(&chunk(1, 0, 0, &[1, 2]), now).expect("duplicate");
    reassembler.on_image_chunk_at(&chunk(1, 0, 0, &[1, 2]), now).expect("duplicate");
    assert!(reassembler.is_active(ImageId::new(1)));
}

#[rstest]
fn chunk_for_unknown_image_is_rejected(harness: Harness) {
    let error = harness
        .reassembler
        .on_image_chunk_at(&chunk(42, 0, 0, &[1]), Instant::now())
        .expect_err("no transfer");
    assert_eq!(error.kind(), ErrorKind::ImageIdMismatch);
    assert_eq!(error.image_id(), ImageId::new(42));
}

#[rstest]
fn out_of_range_chunk_keeps_the_transfer(harness: Harness) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(5, 2, 4), now).expect("start");
    let error = reassembler
        .on_image_chunk_at(&chunk(5, 2, 0, &[1]), now)
        .expect_err("out of range");
    assert_eq!(
        error,
        ReassemblyError::ChunkOutOfRange {
            image_id: ImageId::new(5),
            chunk_id: 2,
            expected: 2,
        }
    );
    assert!(reassembler.is_active(ImageId::new(5)));
    assert_eq!(
        reassembler.status(ImageId::new(5), now),
        Some(MediaStatus::NotReceived)
    );
}

#[rstest]
fn overflow_aborts_and_expires(harness: Harness) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(4, 2, 4), now).expect("start");
    let error = reassembler
        .on_image_chunk_at(&chunk(4, 0, 0, &[0; 5]), now)
        .expect_err("overflow");
    assert!(matches!(error, ReassemblyError::Overflow { attempted: 5, total: 4, .. }));
    assert_eq!(error.kind(), ErrorKind::PayloadLengthMismatch);
    assert!(!reassembler.is_active(ImageId::new(4)));
}

#[rstest]
fn short_payload_with_every_chunk_is_refused(harness: Harness) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(6, 2, 6), now).expect("start");
    reassembler.on_image_chunk_at(&chunk(6, 0, 0, &[1, 2]), now).expect("chunk");
    let error = reassembler
        .on_image_chunk_at(&chunk(6, 1, 2, &[3, 4]), now)
        .expect_err("short payload");
    assert_eq!(
        error,
        ReassemblyError::LengthDisagreement {
            image_id: ImageId::new(6),
            received: 4,
            total: 6,
        }
    );
    assert_eq!(reassembler.active_count(), 0);
}

#[rstest]
fn late_chunks_see_a_torn_down_transfer(harness: Harness) {
    let started = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(2, 2, 4), started).expect("start");
    let budget = LIMITS.budget(2);
    assert_eq!(budget, Duration::from_secs(2));

    assert!(!reassembler.check_timeout(ImageId::new(2), started + budget));
    let late = started + budget + Duration::from_millis(1);
    let error = reassembler
        .on_image_chunk_at(&chunk(2, 0, 0, &[1, 2]), late)
        .expect_err("torn down");
    assert_eq!(
        error,
        ReassemblyError::ImageIdMismatch {
            image_id: ImageId::new(2)
        }
    );
    assert_eq!(
        reassembler.status(ImageId::new(2), late),
        Some(MediaStatus::Expired)
    );
    assert_eq!(reassembler.active_count(), 0);
}

#[rstest]
fn timed_out_status_reads_expired_until_restart(harness: Harness) {
    let started = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(7, 4, 16), started).expect("start");
    reassembler.on_image_chunk_at(&chunk(7, 0, 0, &[0; 4]), started).expect("chunk");
    reassembler.on_image_chunk_at(&chunk(7, 1, 4, &[0; 4]), started).expect("chunk");

    let late = started + LIMITS.budget(4) + Duration::from_millis(1);
    assert_eq!(reassembler.status(ImageId::new(7), late), Some(MediaStatus::Expired));
    assert!(!reassembler.is_active(ImageId::new(7)));
    assert_eq!(reassembler.status(ImageId::new(7), late), Some(MediaStatus::Expired));

    reassembler.on_image_start_at(&start(7, 1, 4), late).expect("restart");
    assert_eq!(
        reassembler.status(ImageId::new(7), late),
        Some(MediaStatus::NotReceived)
    );
    assert_eq!(reassembler.status(ImageId::new(3), late), None);
}

#[rstest]
fn chunk_past_the_announced_size_overflows(harness: Harness) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(12, 2, 8), now).expect("start");
    let error = reassembler
        .on_image_chunk_at(&chunk(12, 1, 6, &[0; 4]), now)
        .expect_err("overflow");
    assert!(matches!(error, ReassemblyError::Overflow { attempted: 10, total: 8, .. }));
    assert!(!reassembler.is_active(ImageId::new(12)));
}

#[rstest]
fn stalled_transfer_expires_after_its_budget(harness: Harness) {
    let started = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(7, 4, 16), started).expect("start");
    reassembler.on_image_chunk_at(&chunk(7, 0, 0, &[0; 4]), started).expect("chunk");
    reassembler.on_image_chunk_at(&chunk(7, 1, 4, &[0; 4]), started).expect("chunk");
    let media = reassembler.media(ImageId::new(7)).expect("in flight");

    let budget = LIMITS.budget(4);
    assert_eq!(reassembler.purge_expired_at(started + budget), Vec::<ImageId>::new());
    let purged = reassembler.purge_expired_at(started + budget + Duration::from_millis(1));
    assert_eq!(purged, vec![ImageId::new(7)]);
    assert_eq!(media.lifecycle().recorded(), MediaStatus::Expired);
    assert!(reassembler.media(ImageId::new(7)).is_none());
}

#[rstest]
fn purge_removes_only_late_transfers(harness: Harness) {
    let started = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(1, 1, 4), started).expect("start");
    reassembler
        .on_image_start_at(&start(2, 8, 4), started)
        .expect("start");

    let purged = reassembler.purge_expired_at(started + Duration::from_secs(2));
    assert_eq!(purged, vec![ImageId::new(1)]);
    assert!(reassembler.is_active(ImageId::new(2)));
    assert!(reassembler.purge_expired_at(started).is_empty());
}

#[rstest]
fn restart_discards_the_previous_transfer(harness: Harness) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(8, 2, 4), now).expect("start");
    reassembler.on_image_chunk_at(&chunk(8, 0, 0, &[1, 2]), now).expect("chunk");

    reassembler.on_image_start_at(&start(8, 2, 8), now).expect("restart");
    assert_eq!(reassembler.active_count(), 1);
    // Chunk 0 is accepted again because the mask was reset.
    assert!(matches!(
        reassembler.on_image_chunk_at(&chunk(8, 0, 0, &[1, 2, 3, 4]), now),
        Ok(None)
    ));
}

#[rstest]
fn end_before_completion_expires_the_image(harness: Harness) {
    let now = Instant::now();
    let reassembler = &harness.reassembler;
    reassembler.on_image_start_at(&start(11, 3, 9), now).expect("start");
    reassembler.on_image_chunk_at(&chunk(11, 1, 3, &[1, 2, 3]), now).expect("chunk");
    assert_eq!(
        reassembler.on_image_end(ImageId::new(11)),
        Err(ReassemblyError::IncompleteTransfer {
            image_id: ImageId::new(11),
            received: 1,
            expected: 3,
        })
    );
    assert_eq!(reassembler.active_count(), 0);
}

#[rstest]
#[case::no_image(ImageFormat::NoImage, ErrorKind::UnsupportedImageFormat)]
#[case::rgb222(ImageFormat::Rgb222, ErrorKind::UnsupportedImageFormat)]
fn undisplayable_formats_are_refused(
    harness: Harness,
    #[case] format: ImageFormat,
    #[case] kind: ErrorKind,
) {
    let mut message = start(1, 1, 4);
    message.format = format;
    let error = harness
        .reassembler
        .on_image_start_at(&message, Instant::now())
        .expect_err("refused");
    assert_eq!(error.kind(), kind);
    assert_eq!(harness.reassembler.active_count(), 0);
}

#[rstest]
#[case::empty(start(1, 0, 4), ErrorKind::InvalidFormat)]
#[case::too_large(start(1, 4, 4096), ErrorKind::OutOfMemory)]
fn unusable_announcements_are_refused(
    harness: Harness,
    #[case] message: ImageStart<'static>,
    #[case] kind: ErrorKind,
) {
    let error = harness
        .reassembler
        .on_image_start_at(&message, Instant::now())
        .expect_err("refused");
    assert_eq!(error.kind(), kind);
}

#[test]
fn mask_tracks_high_ids() {
    let mut mask = ChunkMask::default();
    assert!(mask.insert(255));
    assert!(mask.insert(64));
    assert_eq!(mask.count(), 2);
    assert!(mask.remove(255));
    assert!(!mask.contains(255));
    assert!(!mask.remove(255));
}
