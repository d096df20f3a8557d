//! Helpers for explicit big-endian conversions on the peripheral wire.
//!
//! The display protocol carries 16-bit lengths and colours plus 24-bit image
//! sizes and chunk offsets. These helpers keep Clippy expectations scoped to
//! the conversion points so protocol code can stay explicit about endianness.

/// Largest value representable in the 24-bit size and offset fields.
pub const U24_MAX: u32 = 0x00FF_FFFF;

/// Serialise a `u16` in wire byte order (big-endian).
///
/// # Examples
///
/// ```
/// use mediaframe::byte_order::write_wire_u16;
///
/// assert_eq!(write_wire_u16(0x1234), [0x12, 0x34]);
/// ```
#[must_use]
pub fn write_wire_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "The display wire protocol is big-endian."
    )]
    value.to_be_bytes()
}

/// Parse a wire-order `u16` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use mediaframe::byte_order::read_wire_u16;
///
/// assert_eq!(read_wire_u16([0x12, 0x34]), 0x1234);
/// ```
#[must_use]
pub fn read_wire_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "The display wire protocol is big-endian."
    )]
    u16::from_be_bytes(bytes)
}

/// Serialise the low 24 bits of `value` in wire byte order.
///
/// Bits above [`U24_MAX`] are discarded; callers validate ranges first.
///
/// # Examples
///
/// ```
/// use mediaframe::byte_order::write_wire_u24;
///
/// assert_eq!(write_wire_u24(0x0012_3456), [0x12, 0x34, 0x56]);
/// ```
#[must_use]
pub fn write_wire_u24(value: u32) -> [u8; 3] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "The display wire protocol is big-endian."
    )]
    let [_, hi, mid, lo] = (value & U24_MAX).to_be_bytes();
    [hi, mid, lo]
}

/// Parse a wire-order 24-bit integer.
///
/// # Examples
///
/// ```
/// use mediaframe::byte_order::read_wire_u24;
///
/// assert_eq!(read_wire_u24([0x12, 0x34, 0x56]), 0x0012_3456);
/// ```
#[must_use]
pub fn read_wire_u24(bytes: [u8; 3]) -> u32 {
    let [hi, mid, lo] = bytes;
    #[expect(
        clippy::big_endian_bytes,
        reason = "The display wire protocol is big-endian."
    )]
    u32::from_be_bytes([0, hi, mid, lo])
}

#[cfg(test)]
mod tests {
    //! Tests for wire byte-order conversion helpers.

    use rstest::rstest;

    use super::{U24_MAX, read_wire_u16, read_wire_u24, write_wire_u16, write_wire_u24};

    #[rstest]
    #[case::zero(0, [0, 0, 0])]
    #[case::mixed(0x0001_05DC, [0x01, 0x05, 0xDC])]
    #[case::max(U24_MAX, [0xFF, 0xFF, 0xFF])]
    fn u24_matches_wire_layout(#[case] value: u32, #[case] bytes: [u8; 3]) {
        assert_eq!(write_wire_u24(value), bytes);
        assert_eq!(read_wire_u24(bytes), value);
    }

    #[test]
    fn u24_write_truncates_high_byte() {
        assert_eq!(write_wire_u24(0xAB12_3456), [0x12, 0x34, 0x56]);
    }

    #[test]
    fn u16_is_big_endian() {
        assert_eq!(write_wire_u16(0xF79E), [0xF7, 0x9E]);
        assert_eq!(read_wire_u16([0x08, 0x61]), 0x0861);
    }
}
