//! [`Message`] to wire bytes, the inverse of [`decode`](super::decode).

use bytes::{BufMut, BytesMut};

use super::{
    EncodeError,
    ErrorCode,
    ErrorReport,
    HEADER_LEN,
    ImageChunk,
    ImageStart,
    MAX_PAYLOAD_LEN,
    Message,
    MessageHeader,
    Payload,
    TextBatch,
    decode::{CHUNK_META_LEN, START_META_LEN},
    pack_format,
};
use crate::byte_order::{U24_MAX, write_wire_u16, write_wire_u24};

/// Encode `message` into a freshly allocated frame.
///
/// # Errors
///
/// Returns [`EncodeError`] when a length does not fit its wire field.
///
/// # Examples
///
/// ```
/// use mediaframe::protocol::{ErrorCode, Message, Payload, encode};
///
/// let frame = encode(&Message::new(7, Payload::Ack(ErrorCode::Success))).unwrap();
/// assert_eq!(&frame[..], &[0x7E, 0x0E, 0x07, 0x00, 0x01, 0x00]);
/// ```
pub fn encode(message: &Message<'_>) -> Result<BytesMut, EncodeError> {
    let mut payload = BytesMut::new();
    match &message.payload {
        Payload::TextBatch(batch) => text_batch(batch, &mut payload)?,
        Payload::ImageStart(start) => image_start(start, &mut payload)?,
        Payload::ImageChunk(chunk) => image_chunk(chunk, &mut payload)?,
        Payload::ImageEnd(image_id) => payload.put_u8(image_id.get()),
        Payload::BacklightOn
        | Payload::BacklightOff
        | Payload::PingRequest
        | Payload::PingResponse => {}
        Payload::Ack(code) => payload.put_u8(code.as_wire()),
        Payload::Error(report) => error_report(report, &mut payload)?,
    }
    let payload_len = fits("payload", payload.len(), MAX_PAYLOAD_LEN)?;
    let header = MessageHeader {
        message_type: message.message_type(),
        message_id: message.id,
        payload_len: u16::try_from(payload_len).unwrap_or(u16::MAX),
    };
    let mut frame = BytesMut::with_capacity(HEADER_LEN + payload.len());
    frame.put_slice(&header.to_bytes());
    frame.put_slice(&payload);
    Ok(frame)
}

/// Frame acknowledging message `id` with `code`.
///
/// ```
/// use mediaframe::protocol::{ErrorCode, ack_frame};
///
/// assert_eq!(&ack_frame(2, ErrorCode::Success)[..], &[0x7E, 0x0E, 0x02, 0x00, 0x01, 0x00]);
/// ```
#[must_use]
pub fn ack_frame(id: u8, code: ErrorCode) -> BytesMut {
    let mut frame = BytesMut::with_capacity(HEADER_LEN + 1);
    frame.put_slice(
        &MessageHeader {
            message_type: super::MessageType::Ack,
            message_id: id,
            payload_len: 1,
        }
        .to_bytes(),
    );
    frame.put_u8(code.as_wire());
    frame
}

/// Frame reporting `code` for message `id`, truncating `text` at a character
/// boundary so it fits the one-byte length field.
#[must_use]
pub fn error_frame(id: u8, code: ErrorCode, text: &str) -> BytesMut {
    let mut end = text.len().min(usize::from(u8::MAX));
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let text = &text[..end];
    let mut frame = BytesMut::with_capacity(HEADER_LEN + 2 + text.len());
    frame.put_slice(
        &MessageHeader {
            message_type: super::MessageType::Error,
            message_id: id,
            payload_len: u16::try_from(2 + text.len()).unwrap_or(u16::MAX),
        }
        .to_bytes(),
    );
    frame.put_u8(code.as_wire());
    frame.put_u8(u8::try_from(text.len()).unwrap_or(u8::MAX));
    frame.put_slice(text.as_bytes());
    frame
}

fn text_batch(batch: &TextBatch, out: &mut BytesMut) -> Result<(), EncodeError> {
    let count = fits("text item count", batch.items.len(), usize::from(u8::MAX))?;
    out.put_slice(&write_wire_u16(batch.bg_color));
    out.put_slice(&write_wire_u16(batch.font_color));
    out.put_u8(batch.rotation.as_wire());
    out.put_u8(u8::try_from(count).unwrap_or(u8::MAX));
    for item in &batch.items {
        let len = fits("text item", item.text.len(), usize::from(u8::MAX))?;
        out.put_slice(&write_wire_u16(item.x));
        out.put_slice(&write_wire_u16(item.y));
        out.put_u8(item.font.as_wire());
        out.put_slice(&write_wire_u16(item.color));
        out.put_u8(u8::try_from(len).unwrap_or(u8::MAX));
        out.put_slice(item.text.as_bytes());
    }
    Ok(())
}

fn image_start(start: &ImageStart<'_>, out: &mut BytesMut) -> Result<(), EncodeError> {
    fits("total size", start.total_size as usize, U24_MAX as usize)?;
    out.reserve(START_META_LEN + start.embedded.len());
    out.put_u8(start.image_id.get());
    out.put_u8(pack_format(start.format, start.resolution));
    out.put_u8(start.delay_ms);
    out.put_slice(&write_wire_u24(start.total_size));
    out.put_u8(start.chunk_count);
    out.put_u8(start.rotation.as_wire());
    out.put_slice(start.embedded);
    Ok(())
}

fn image_chunk(chunk: &ImageChunk<'_>, out: &mut BytesMut) -> Result<(), EncodeError> {
    fits("chunk offset", chunk.offset as usize, U24_MAX as usize)?;
    let len = fits(
        "chunk data",
        chunk.data.len(),
        MAX_PAYLOAD_LEN - CHUNK_META_LEN,
    )?;
    out.reserve(CHUNK_META_LEN + len);
    out.put_u8(chunk.image_id.get());
    out.put_u8(chunk.chunk_id);
    out.put_slice(&write_wire_u24(chunk.offset));
    out.put_slice(&write_wire_u16(u16::try_from(len).unwrap_or(u16::MAX)));
    out.put_slice(chunk.data);
    Ok(())
}

fn error_report(report: &ErrorReport, out: &mut BytesMut) -> Result<(), EncodeError> {
    let len = fits("error text", report.text.len(), usize::from(u8::MAX))?;
    out.put_u8(report.code.as_wire());
    out.put_u8(u8::try_from(len).unwrap_or(u8::MAX));
    out.put_slice(report.text.as_bytes());
    Ok(())
}

fn fits(field: &'static str, len: usize, max: usize) -> Result<usize, EncodeError> {
    if len > max {
        Err(EncodeError { field, len, max })
    } else {
        Ok(len)
    }
}
