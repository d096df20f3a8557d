//! Buffer to [`Message`] decoding.
//!
//! Decoding is pure: it reads only the bytes it is given and never touches
//! reassembly state. Every read is bounds-checked against the declared
//! payload, so malformed input fails without reading past it.

use super::{
    DecodeError,
    ErrorCode,
    ErrorReport,
    FontId,
    ImageChunk,
    ImageFormat,
    ImageId,
    ImageResolution,
    ImageStart,
    Message,
    MessageHeader,
    MessageType,
    Payload,
    Rotation,
    TextBatch,
    TextItem,
};
use crate::byte_order::{read_wire_u16, read_wire_u24};

/// Fixed bytes preceding the data of an image chunk.
pub(crate) const CHUNK_META_LEN: usize = 7;
/// Fixed bytes preceding the embedded data of an image start.
pub(crate) const START_META_LEN: usize = 8;

/// Decode the message at the start of `bytes`.
///
/// `bytes` is the occupied part of a transport buffer; anything after the
/// declared payload is ignored.
///
/// # Errors
///
/// Returns a [`DecodeError`] describing the first framing or layout problem.
///
/// # Examples
///
/// ```
/// use mediaframe::protocol::{Payload, decode};
///
/// let message = decode(&[0x7E, 0x0C, 0x03, 0x00, 0x00, 0xFF]).unwrap();
/// assert_eq!(message.id, 3);
/// assert_eq!(message.payload, Payload::PingRequest);
/// ```
pub fn decode(bytes: &[u8]) -> Result<Message<'_>, DecodeError> {
    let (header, payload) = MessageHeader::parse(bytes)?;
    let payload = decode_payload(header.message_type, payload)?;
    Ok(Message::new(header.message_id, payload))
}

fn decode_payload(message_type: MessageType, bytes: &[u8]) -> Result<Payload<'_>, DecodeError> {
    let mut reader = Reader::new(message_type, bytes);
    let payload = match message_type {
        MessageType::TextBatch => Payload::TextBatch(text_batch(&mut reader)?),
        MessageType::ImageStart => Payload::ImageStart(image_start(&mut reader)?),
        MessageType::ImageChunk => Payload::ImageChunk(image_chunk(&mut reader)?),
        MessageType::ImageEnd => Payload::ImageEnd(ImageId::new(reader.u8()?)),
        MessageType::BacklightOn => Payload::BacklightOn,
        MessageType::BacklightOff => Payload::BacklightOff,
        MessageType::PingRequest => Payload::PingRequest,
        MessageType::PingResponse => Payload::PingResponse,
        MessageType::Ack => Payload::Ack(error_code(reader.u8()?)?),
        MessageType::Error => Payload::Error(error_report(&mut reader)?),
    };
    reader.finish()?;
    Ok(payload)
}

fn text_batch(reader: &mut Reader<'_>) -> Result<TextBatch, DecodeError> {
    let bg_color = reader.u16()?;
    let font_color = reader.u16()?;
    let rotation = rotation(reader.u8()?)?;
    let count = reader.u8()?;
    let items = (0..count)
        .map(|_| {
            let x = reader.u16()?;
            let y = reader.u16()?;
            let font_byte = reader.u8()?;
            let font = FontId::from_wire(font_byte).ok_or(invalid("font", font_byte))?;
            let color = reader.u16()?;
            let len = reader.u8()?;
            let text = std::str::from_utf8(reader.take(usize::from(len))?)
                .map_err(|_| DecodeError::InvalidUtf8)?
                .to_owned();
            Ok(TextItem {
                x,
                y,
                font,
                color,
                text,
            })
        })
        .collect::<Result<Vec<_>, DecodeError>>()?;
    Ok(TextBatch {
        bg_color,
        font_color,
        rotation,
        items,
    })
}

fn image_start<'a>(reader: &mut Reader<'a>) -> Result<ImageStart<'a>, DecodeError> {
    let image_id = ImageId::new(reader.u8()?);
    let packed = reader.u8()?;
    let format = ImageFormat::from_wire(packed >> 4).ok_or(invalid("image format", packed >> 4))?;
    let resolution =
        ImageResolution::from_wire(packed & 0x0F).ok_or(invalid("image resolution", packed & 0x0F))?;
    let delay_ms = reader.u8()?;
    let total_size = reader.u24()?;
    let chunk_count = reader.u8()?;
    let rotation = rotation(reader.u8()?)?;
    let embedded = reader.rest();
    Ok(ImageStart {
        image_id,
        format,
        resolution,
        delay_ms,
        total_size,
        chunk_count,
        rotation,
        embedded,
    })
}

fn image_chunk<'a>(reader: &mut Reader<'a>) -> Result<ImageChunk<'a>, DecodeError> {
    let image_id = ImageId::new(reader.u8()?);
    let chunk_id = reader.u8()?;
    let offset = reader.u24()?;
    let declared = usize::from(reader.u16()?);
    let actual = reader.remaining();
    if declared != actual {
        return Err(DecodeError::ChunkLengthMismatch { declared, actual });
    }
    Ok(ImageChunk {
        image_id,
        chunk_id,
        offset,
        data: reader.rest(),
    })
}

fn error_report(reader: &mut Reader<'_>) -> Result<ErrorReport, DecodeError> {
    let code = error_code(reader.u8()?)?;
    let len = reader.u8()?;
    let text = std::str::from_utf8(reader.take(usize::from(len))?)
        .map_err(|_| DecodeError::InvalidUtf8)?
        .to_owned();
    Ok(ErrorReport { code, text })
}

fn rotation(value: u8) -> Result<Rotation, DecodeError> {
    Rotation::from_wire(value).ok_or(invalid("rotation", value))
}

fn error_code(value: u8) -> Result<ErrorCode, DecodeError> {
    ErrorCode::from_wire(value).ok_or(invalid("error code", value))
}

const fn invalid(field: &'static str, value: u8) -> DecodeError {
    DecodeError::InvalidEnum { field, value }
}

/// Cursor over a payload that never reads past its end.
struct Reader<'a> {
    message_type: MessageType,
    bytes: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(message_type: MessageType, bytes: &'a [u8]) -> Self {
        Self {
            message_type,
            bytes,
        }
    }

    fn remaining(&self) -> usize { self.bytes.len() }

    fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if len > self.bytes.len() {
            return Err(self.malformed("field runs past the end of the payload"));
        }
        let (head, tail) = self.bytes.split_at(len);
        self.bytes = tail;
        Ok(head)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let bytes = self.bytes;
        let (head, tail) = bytes
            .split_first_chunk::<N>()
            .ok_or_else(|| self.malformed("field runs past the end of the payload"))?;
        self.bytes = tail;
        Ok(*head)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        let [value] = self.array::<1>()?;
        Ok(value)
    }

    fn u16(&mut self) -> Result<u16, DecodeError> { self.array().map(read_wire_u16) }

    fn u24(&mut self) -> Result<u32, DecodeError> { self.array().map(read_wire_u24) }

    fn rest(&mut self) -> &'a [u8] { std::mem::take(&mut self.bytes) }

    fn finish(&self) -> Result<(), DecodeError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(self.malformed("unexpected bytes after the last field"))
        }
    }

    fn malformed(&self, reason: &'static str) -> DecodeError {
        DecodeError::Malformed {
            message_type: self.message_type,
            reason,
        }
    }
}
