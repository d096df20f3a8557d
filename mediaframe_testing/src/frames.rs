//! Builders for wire frames sent by a simulated peer.

use bytes::BytesMut;
use mediaframe::protocol::{
    FontId,
    ImageChunk,
    ImageFormat,
    ImageId,
    ImageResolution,
    ImageStart,
    Message,
    Payload,
    Rotation,
    TextBatch,
    TextItem,
    encode,
};

/// Encode `payload` as message `id`.
///
/// # Panics
///
/// Panics if the payload does not fit the wire format.
#[must_use]
pub fn frame(id: u8, payload: Payload<'_>) -> BytesMut {
    encode(&Message::new(id, payload)).expect("test frame fits the wire format")
}

/// Text item at (`x`, `y`) in Unifont.
#[must_use]
pub fn text_item(x: u16, y: u16, color: u16, text: &str) -> TextItem {
    TextItem {
        x,
        y,
        font: FontId::Unifont,
        color,
        text: text.into(),
    }
}

/// Text batch on a black background.
#[must_use]
pub fn text_batch_frame(id: u8, rotation: Rotation, items: Vec<TextItem>) -> BytesMut {
    frame(
        id,
        Payload::TextBatch(TextBatch {
            bg_color: 0x0000,
            font_color: 0xFFFF,
            rotation,
            items,
        }),
    )
}

/// Announcement of a full-screen JPEG transfer.
#[must_use]
pub fn jpeg_start(image_id: u8, chunk_count: u8, total_size: u32, delay_ms: u8) -> ImageStart<'static> {
    ImageStart {
        image_id: ImageId::new(image_id),
        format: ImageFormat::Jpeg,
        resolution: ImageResolution::Sq480,
        delay_ms,
        total_size,
        chunk_count,
        rotation: Rotation::Deg0,
        embedded: &[],
    }
}

#[must_use]
pub fn image_start_frame(id: u8, start: ImageStart<'_>) -> BytesMut {
    frame(id, Payload::ImageStart(start))
}

#[must_use]
pub fn image_chunk_frame(id: u8, image_id: u8, chunk_id: u8, offset: u32, data: &[u8]) -> BytesMut {
    frame(
        id,
        Payload::ImageChunk(ImageChunk {
            image_id: ImageId::new(image_id),
            chunk_id,
            offset,
            data,
        }),
    )
}

#[must_use]
pub fn image_end_frame(id: u8, image_id: u8) -> BytesMut {
    frame(id, Payload::ImageEnd(ImageId::new(image_id)))
}

/// Backlight switch message.
#[must_use]
pub fn backlight_frame(id: u8, on: bool) -> BytesMut {
    frame(
        id,
        if on {
            Payload::BacklightOn
        } else {
            Payload::BacklightOff
        },
    )
}

#[must_use]
pub fn ping_frame(id: u8) -> BytesMut { frame(id, Payload::PingRequest) }
