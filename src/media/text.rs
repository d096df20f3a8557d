//! Text media.

use crate::protocol::{FontId, Rotation, TextBatch, TextItem};

/// A string drawn at a fixed position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    pub content: String,
    pub font: FontId,
    pub x: u16,
    pub y: u16,
    pub color: u16,
}

impl From<TextItem> for Text {
    fn from(item: TextItem) -> Self {
        Self {
            content: item.text,
            font: item.font,
            x: item.x,
            y: item.y,
            color: item.color,
        }
    }
}

/// Ordered texts sharing a background, default colour and rotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextGroup {
    pub members: Vec<Text>,
    pub bg_color: u16,
    pub font_color: u16,
    pub rotation: Rotation,
}

impl From<TextBatch> for TextGroup {
    fn from(batch: TextBatch) -> Self {
        Self {
            members: batch.items.into_iter().map(Text::from).collect(),
            bg_color: batch.bg_color,
            font_color: batch.font_color,
            rotation: batch.rotation,
        }
    }
}
