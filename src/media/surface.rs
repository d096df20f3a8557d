//! Decode-target pixel surface.

use std::collections::TryReserveError;

use super::CodecError;
use crate::byte_order::read_wire_u16;

/// Rectangle of RGB565 pixels produced by a codec.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedBlock<'a> {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
    /// Row-major pixels, `width × height` of them.
    pub pixels: &'a [u16],
}

/// Owned RGB565 frame an image decodes into.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelSurface {
    width: u16,
    height: u16,
    pixels: Vec<u16>,
}

impl PixelSurface {
    /// Allocate a black surface, reporting allocation failure instead of
    /// aborting.
    ///
    /// # Errors
    ///
    /// Returns the allocator's error when the frame cannot be reserved.
    pub fn try_new(width: u16, height: u16) -> Result<Self, TryReserveError> {
        let len = usize::from(width) * usize::from(height);
        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len)?;
        pixels.resize(len, 0);
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    #[must_use]
    pub fn width(&self) -> u16 { self.width }

    #[must_use]
    pub fn height(&self) -> u16 { self.height }

    /// Row-major pixels.
    #[must_use]
    pub fn pixels(&self) -> &[u16] { &self.pixels }

    /// Pixel at (`x`, `y`), if inside the surface.
    #[must_use]
    pub fn pixel(&self, x: u16, y: u16) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
            .copied()
    }

    /// Write `block`, magnifying each source pixel to `scale × scale`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::BlockSize`] when the block's pixel count
    /// disagrees with its dimensions and [`CodecError::BlockOutOfBounds`]
    /// when the scaled block does not fit the surface. Nothing is written in
    /// either case.
    pub fn write_block(&mut self, block: &DecodedBlock<'_>, scale: u16) -> Result<(), CodecError> {
        let expected = usize::from(block.width) * usize::from(block.height);
        if block.pixels.len() != expected {
            return Err(CodecError::BlockSize {
                expected,
                actual: block.pixels.len(),
            });
        }
        let scale = usize::from(scale.max(1));
        let left = usize::from(block.x) * scale;
        let top = usize::from(block.y) * scale;
        let right = left + usize::from(block.width) * scale;
        let bottom = top + usize::from(block.height) * scale;
        if right > usize::from(self.width) || bottom > usize::from(self.height) {
            return Err(CodecError::BlockOutOfBounds {
                x: block.x,
                y: block.y,
                width: block.width,
                height: block.height,
            });
        }
        let stride = usize::from(self.width);
        let src_width = usize::from(block.width);
        if src_width == 0 {
            return Ok(());
        }
        for (row, src_row) in block.pixels.chunks_exact(src_width).enumerate() {
            for dy in 0..scale {
                let start = (top + row * scale + dy) * stride + left;
                let dest = &mut self.pixels[start..start + src_width * scale];
                for (dest_px, &src_px) in dest.chunks_exact_mut(scale).zip(src_row) {
                    dest_px.fill(src_px);
                }
            }
        }
        Ok(())
    }

    /// Copy a raw big-endian RGB565 image of `side × side` pixels.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::RawSize`] if `bytes` is not exactly the image's
    /// size, or any error of [`write_block`](Self::write_block).
    pub fn copy_raw(&mut self, bytes: &[u8], side: u16, scale: u16) -> Result<(), CodecError> {
        let expected = usize::from(side) * usize::from(side) * 2;
        if bytes.len() != expected {
            return Err(CodecError::RawSize {
                expected,
                actual: bytes.len(),
            });
        }
        let pixels = bytes
            .chunks_exact(2)
            .map(|px| read_wire_u16([px[0], px[1]]))
            .collect::<Vec<_>>();
        self.write_block(
            &DecodedBlock {
                x: 0,
                y: 0,
                width: side,
                height: side,
                pixels: &pixels,
            },
            scale,
        )
    }
}
