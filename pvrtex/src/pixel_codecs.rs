use crate::formats::PixelFormat;
use byteorder::{ByteOrder, LittleEndian};
use image::Rgba;

/// Expands a channel of `bits` bits to 8 bits, so that the maximum value maps to 0xFF.
fn expand(value: u32, bits: u32) -> u8 {
    let max = (1 << bits) - 1;
    ((value & max) * 0xFF / max) as u8
}

/// Truncates an 8-bit channel down to `bits` bits.
fn truncate(value: u8, bits: u32) -> u16 {
    (value >> (8 - bits)) as u16
}

/// Converts single colors between [`Rgba`] and one of the packed pixel formats.
///
/// Only the pixel formats with an implementation have a codec, see [`PixelCodec::new()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelCodec {
    Argb1555,
    Rgb565,
    Argb4444,
    Argb8888,
}

impl PixelCodec {
    /// Returns the codec for `pixel_format`, or `None` if that format can't be converted.
    pub fn new(pixel_format: PixelFormat) -> Option<Self> {
        match pixel_format {
            PixelFormat::Argb1555 => Some(Self::Argb1555),
            PixelFormat::Rgb565 => Some(Self::Rgb565),
            PixelFormat::Argb4444 => Some(Self::Argb4444),
            PixelFormat::Argb8888 => Some(Self::Argb8888),
            PixelFormat::Yuv422 | PixelFormat::Bump => None,
        }
    }

    pub fn pixel_format(self) -> PixelFormat {
        match self {
            Self::Argb1555 => PixelFormat::Argb1555,
            Self::Rgb565 => PixelFormat::Rgb565,
            Self::Argb4444 => PixelFormat::Argb4444,
            Self::Argb8888 => PixelFormat::Argb8888,
        }
    }

    pub fn bytes_per_pixel(self) -> usize {
        self.pixel_format().bytes_per_pixel()
    }

    /// Reads the packed color at `offset` in `source`.
    ///
    /// # Panics
    ///
    /// Panics if `source` doesn't hold [`Self::bytes_per_pixel()`] bytes at `offset`. The data
    /// codecs check the length of the whole surface beforehand.
    pub fn decode_pixel(self, source: &[u8], offset: usize) -> Rgba<u8> {
        let read_u16 = || LittleEndian::read_u16(&source[offset..]) as u32;

        match self {
            Self::Argb1555 => {
                let pixel = read_u16();
                Rgba([
                    expand(pixel >> 10, 5),
                    expand(pixel >> 5, 5),
                    expand(pixel, 5),
                    expand(pixel >> 15, 1),
                ])
            }
            Self::Rgb565 => {
                let pixel = read_u16();
                Rgba([
                    expand(pixel >> 11, 5),
                    expand(pixel >> 5, 6),
                    expand(pixel, 5),
                    0xFF,
                ])
            }
            Self::Argb4444 => {
                let pixel = read_u16();
                Rgba([
                    expand(pixel >> 8, 4),
                    expand(pixel >> 4, 4),
                    expand(pixel, 4),
                    expand(pixel >> 12, 4),
                ])
            }
            Self::Argb8888 => {
                let [b, g, r, a] = LittleEndian::read_u32(&source[offset..]).to_le_bytes();
                Rgba([r, g, b, a])
            }
        }
    }

    /// Writes `color` packed at `offset` in `dest`.
    ///
    /// # Panics
    ///
    /// Panics if `dest` doesn't have room for [`Self::bytes_per_pixel()`] bytes at `offset`.
    pub fn encode_pixel(self, color: Rgba<u8>, dest: &mut [u8], offset: usize) {
        let [r, g, b, a] = color.0;

        let pixel = match self {
            Self::Argb1555 => {
                truncate(a, 1) << 15 | truncate(r, 5) << 10 | truncate(g, 5) << 5 | truncate(b, 5)
            }
            Self::Rgb565 => truncate(r, 5) << 11 | truncate(g, 6) << 5 | truncate(b, 5),
            Self::Argb4444 => {
                truncate(a, 4) << 12 | truncate(r, 4) << 8 | truncate(g, 4) << 4 | truncate(b, 4)
            }
            Self::Argb8888 => {
                let pixel = u32::from_be_bytes([a, r, g, b]);
                LittleEndian::write_u32(&mut dest[offset..], pixel);
                return;
            }
        };

        LittleEndian::write_u16(&mut dest[offset..], pixel);
    }
}
