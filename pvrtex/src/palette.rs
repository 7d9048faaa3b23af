//! Color palettes for palettized textures, and the external palette files (PVP) that carry
//! them.
//!
//! Textures using [`DataFormat::Index4`] or [`DataFormat::Index8`] don't store their colors,
//! so a [`Palette`] has to be handed to the decoder before their pixels can be read:
//!
//! ```no_run
//! use pvrtex::error::TextureDecodeError;
//! use pvrtex::palette::PaletteDecoder;
//! use pvrtex::TextureDecoder;
//!
//! # fn main() -> Result<(), TextureDecodeError> {
//! # let (pvr_data, pvp_data): (Vec<u8>, Vec<u8>) = (vec![], vec![]);
//! let mut decoder = TextureDecoder::new(pvr_data)?;
//! if matches!(
//!     decoder.decode(),
//!     Err(TextureDecodeError::MissingExternalPalette { .. })
//! ) {
//!     let palette = PaletteDecoder::new(&pvp_data)?.decode()?;
//!     decoder.set_palette(palette);
//! }
//! let image = decoder.decode()?;
//! println!("{}x{}", image.width(), image.height());
//! # Ok(())
//! # }
//! ```
//!
//! [`DataFormat::Index4`]: crate::formats::DataFormat::Index4
//! [`DataFormat::Index8`]: crate::formats::DataFormat::Index8

use crate::error::{TextureDecodeError, TextureEncodeError, UnsupportedFormat};
use crate::formats::PixelFormat;
use crate::pixel_codecs::PixelCodec;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use image::Rgba;
use std::io::{Cursor, Read, Write};

const PALETTE_MAGIC: &[u8; 4] = b"PVPL";
const PALETTE_HEADER_SIZE: usize = 0x10;

/// An ordered table of colors that palettized textures index into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgba<u8>>,
}

impl Palette {
    /// Creates a palette out of the given colors.
    pub fn new(colors: Vec<Rgba<u8>>) -> Self {
        Self { colors }
    }

    /// Creates an opaque grayscale ramp from black to white with the given amount of entries.
    ///
    /// Useful for previewing an indexed texture when its palette file isn't around.
    pub fn grayscale(entries: usize) -> Self {
        let steps = entries.saturating_sub(1).max(1);
        let colors = (0..entries)
            .map(|i| {
                let value = (i * 0xFF / steps) as u8;
                Rgba([value, value, value, 0xFF])
            })
            .collect();
        Self { colors }
    }

    /// Amount of colors in the palette.
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Whether the palette has no colors.
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The colors in the palette.
    pub fn colors(&self) -> &[Rgba<u8>] {
        &self.colors
    }

    /// Returns the color at `index`, if there's one.
    pub fn get(&self, index: usize) -> Option<Rgba<u8>> {
        self.colors.get(index).copied()
    }

    /// Unpacks `entries` colors stored in `codec`'s pixel format.
    pub(crate) fn from_packed(data: &[u8], entries: usize, codec: PixelCodec) -> Self {
        let bytes_per_pixel = codec.bytes_per_pixel();
        let colors = (0..entries)
            .map(|i| codec.decode_pixel(data, i * bytes_per_pixel))
            .collect();
        Self { colors }
    }

    /// Packs the colors into `codec`'s pixel format, padding with zeroes up to `entries` colors.
    pub(crate) fn to_packed(&self, entries: usize, codec: PixelCodec) -> Vec<u8> {
        let bytes_per_pixel = codec.bytes_per_pixel();
        let mut dest = vec![0u8; entries.max(self.len()) * bytes_per_pixel];
        for (i, color) in self.colors.iter().enumerate() {
            codec.encode_pixel(*color, &mut dest, i * bytes_per_pixel);
        }
        dest
    }
}

/// Reads an external palette file.
///
/// The header is parsed in [`Self::new()`], the colors are unpacked in [`Self::decode()`].
#[derive(Debug)]
pub struct PaletteDecoder {
    pixel_format: Result<PixelFormat, u8>,
    entries: usize,
    data: Vec<u8>,
}

impl PaletteDecoder {
    /// Parses the header of the palette file in `data`.
    ///
    /// # Errors
    ///
    /// Returns [`TextureDecodeError::FormatMismatch`] if `data` isn't a palette file, and
    /// [`TextureDecodeError::TruncatedData`] if it's missing some of its colors.
    pub fn new(data: &[u8]) -> Result<Self, TextureDecodeError> {
        if data.len() < PALETTE_HEADER_SIZE || &data[..4] != PALETTE_MAGIC {
            return Err(TextureDecodeError::FormatMismatch);
        }

        let mut cursor = Cursor::new(&data[4..]);
        let length = cursor.read_u32::<LittleEndian>()? as usize;
        if length + 8 != data.len() {
            log::debug!(
                "Palette length field {length} doesn't match file size {}",
                data.len()
            );
            return Err(TextureDecodeError::FormatMismatch);
        }

        let pixel_format = PixelFormat::try_from(cursor.read_u8()?);
        cursor.read_u8()?;
        cursor.read_u32::<LittleEndian>()?;
        let entries = cursor.read_u16::<LittleEndian>()? as usize;

        let bytes_per_pixel = pixel_format.map_or(2, PixelFormat::bytes_per_pixel);
        let expected = PALETTE_HEADER_SIZE + entries * bytes_per_pixel;
        if data.len() < expected {
            return Err(TextureDecodeError::TruncatedData {
                expected,
                actual: data.len(),
            });
        }

        let mut colors = vec![0u8; entries * bytes_per_pixel];
        cursor.read_exact(&mut colors)?;

        Ok(Self {
            pixel_format,
            entries,
            data: colors,
        })
    }

    /// The pixel format of the colors, if the code in the header is known.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.pixel_format.ok()
    }

    /// Amount of colors in the palette file.
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Unpacks the colors of the palette file.
    ///
    /// # Errors
    ///
    /// Returns [`TextureDecodeError::UnsupportedCodec`] if the colors are stored in a pixel
    /// format that can't be decoded.
    pub fn decode(&self) -> Result<Palette, TextureDecodeError> {
        let pixel_format = self
            .pixel_format
            .map_err(UnsupportedFormat::UnknownPixelFormat)?;
        let codec =
            PixelCodec::new(pixel_format).ok_or(UnsupportedFormat::PixelFormat(pixel_format))?;

        Ok(Palette::from_packed(&self.data, self.entries, codec))
    }
}

/// Writes an external palette file.
pub struct PaletteEncoder<'a> {
    palette: &'a Palette,
    codec: PixelCodec,
    entries: usize,
}

impl<'a> PaletteEncoder<'a> {
    /// Creates an encoder writing `palette` in `pixel_format`.
    ///
    /// # Errors
    ///
    /// Returns [`TextureEncodeError::UnsupportedCodec`] if colors can't be encoded in
    /// `pixel_format`.
    pub fn new(
        palette: &'a Palette,
        pixel_format: PixelFormat,
    ) -> Result<Self, TextureEncodeError> {
        let codec =
            PixelCodec::new(pixel_format).ok_or(UnsupportedFormat::PixelFormat(pixel_format))?;

        Ok(Self {
            palette,
            codec,
            entries: palette.len(),
        })
    }

    /// Pads the palette file up to `entries` colors.
    pub fn with_entries(mut self, entries: usize) -> Self {
        self.entries = entries.max(self.palette.len());
        self
    }

    /// Encodes the palette file, returning its bytes.
    pub fn encode(&self) -> Result<Vec<u8>, TextureEncodeError> {
        let colors = self.palette.to_packed(self.entries, self.codec);
        let entries: u16 = self
            .entries
            .try_into()
            .map_err(|_| UnsupportedFormat::PaletteEntries(self.entries))?;

        let mut buf = Vec::with_capacity(PALETTE_HEADER_SIZE + colors.len());
        buf.write_all(PALETTE_MAGIC)?;
        buf.write_u32::<LittleEndian>((PALETTE_HEADER_SIZE - 8 + colors.len()) as u32)?;
        buf.write_u8(self.codec.pixel_format().into())?;
        buf.write_u8(0)?;
        buf.write_u32::<LittleEndian>(0)?;
        buf.write_u16::<LittleEndian>(entries)?;
        buf.write_all(&colors)?;

        Ok(buf)
    }
}
