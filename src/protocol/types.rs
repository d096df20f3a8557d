//! Enumerations and identifiers carried on the wire.
//!
//! Each enumeration converts from its wire byte with `from_wire`, returning
//! `None` for values outside the protocol's range, and back with `as_wire`.

use derive_more::{Display, From, Into};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $value:expr ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $value ),+
        }

        impl $name {
            /// Parse the wire representation, rejecting unknown values.
            #[must_use]
            pub const fn from_wire(value: u8) -> Option<Self> {
                match value {
                    $( $value => Some(Self::$variant), )+
                    _ => None,
                }
            }

            /// Wire representation of this value.
            #[must_use]
            pub const fn as_wire(self) -> u8 { self as u8 }
        }
    };
}

wire_enum! {
    /// Message type tag found in the second header byte.
    pub enum MessageType {
        /// Batch of positioned text items.
        TextBatch = 0x01,
        /// First message of an image transfer.
        ImageStart = 0x02,
        /// One numbered chunk of image data.
        ImageChunk = 0x03,
        /// Explicit end of an image transfer.
        ImageEnd = 0x04,
        /// Switch the backlight on.
        BacklightOn = 0x0A,
        /// Switch the backlight off.
        BacklightOff = 0x0B,
        /// Liveness probe.
        PingRequest = 0x0C,
        /// Answer to a liveness probe.
        PingResponse = 0x0D,
        /// Positive acknowledgement carrying a status code.
        Ack = 0x0E,
        /// Negative acknowledgement with a diagnostic.
        Error = 0x0F,
    }
}

wire_enum! {
    /// Status codes reported in acknowledgements and error replies.
    pub enum ErrorCode {
        /// The message was handled.
        Success = 0x00,
        /// The type byte named no known message.
        UnknownMessageType = 0x01,
        /// The payload layout was malformed.
        InvalidFormat = 0x02,
        /// No transfer matches the image id.
        ImageIdMismatch = 0x04,
        /// A declared length disagrees with the data.
        PayloadLengthMismatch = 0x05,
        /// The image format cannot be displayed.
        UnsupportedImageFormat = 0x06,
        /// Storage for the image could not be allocated.
        OutOfMemory = 0x07,
        /// Any other failure inside the controller.
        InternalError = 0x08,
    }
}

wire_enum! {
    /// Screen rotation in quarter turns.
    pub enum Rotation {
        /// No rotation.
        Deg0 = 0,
        /// 90° clockwise.
        Deg90 = 1,
        /// 180°.
        Deg180 = 2,
        /// 270° clockwise.
        Deg270 = 3,
    }
}

wire_enum! {
    /// Encoding of an image payload.
    pub enum ImageFormat {
        /// No image data.
        NoImage = 0,
        /// Baseline JPEG, decoded by the codec collaborator.
        Jpeg = 1,
        /// Raw big-endian RGB565 pixels.
        Rgb565 = 2,
        /// Packed 2-bit-per-channel pixels.
        Rgb222 = 3,
    }
}

wire_enum! {
    /// Pixel dimensions of an image payload.
    pub enum ImageResolution {
        /// 480×480, drawn as is.
        Sq480 = 1,
        /// 240×240, upscaled 2× on the surface.
        Sq240 = 2,
    }
}

wire_enum! {
    /// Font used to draw a text item.
    pub enum FontId {
        /// Panel default.
        NoFont = 0,
        /// GNU Unifont.
        Unifont = 1,
        /// Arabic script.
        Arabic = 2,
        /// Chinese script.
        Chinese = 3,
        /// Cyrillic script.
        Cyrillic = 4,
        /// Devanagari script.
        Devanagari = 5,
    }
}

impl ImageResolution {
    /// Side length in pixels of a square image at this resolution.
    #[must_use]
    pub const fn side(self) -> u16 {
        match self {
            Self::Sq480 => 480,
            Self::Sq240 => 240,
        }
    }

    /// Factor applied when writing this resolution onto a 480-pixel surface.
    #[must_use]
    pub const fn scale(self) -> u16 {
        match self {
            Self::Sq480 => 1,
            Self::Sq240 => 2,
        }
    }
}

/// Pack format and resolution into the shared ImageStart byte.
///
/// ```
/// use mediaframe::protocol::{ImageFormat, ImageResolution, pack_format};
///
/// assert_eq!(pack_format(ImageFormat::Jpeg, ImageResolution::Sq240), 0x12);
/// ```
#[must_use]
pub const fn pack_format(format: ImageFormat, resolution: ImageResolution) -> u8 {
    (format.as_wire() << 4) | (resolution.as_wire() & 0x0F)
}

/// Identifier of an image transfer, unique among in-flight transfers.
///
/// ```
/// use mediaframe::protocol::ImageId;
///
/// let id = ImageId::new(5);
/// assert_eq!(id.get(), 5);
/// assert_eq!(id.to_string(), "5");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Into)]
#[display("{_0}")]
pub struct ImageId(u8);

impl ImageId {
    /// Wrap a raw wire id.
    #[must_use]
    pub const fn new(value: u8) -> Self { Self(value) }

    /// Return the raw wire id.
    #[must_use]
    pub const fn get(self) -> u8 { self.0 }
}
