//! Error types returned by the decoder, the encoder, and the palette readers.

use crate::formats::{DataFormat, PixelFormat};
use std::error::Error;
use std::fmt;

/// The format, or the use of a format, that a texture can't be encoded or decoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedFormat {
    /// The pixel format code in a header isn't a known one.
    UnknownPixelFormat(u8),
    /// The data format code in a header isn't a known one.
    UnknownDataFormat(u8),
    /// The pixel format is known, but has no codec.
    PixelFormat(PixelFormat),
    /// The data format is known, but has no codec.
    DataFormat(DataFormat),
    /// The data format can only be decoded.
    DecodeOnly(DataFormat),
    /// The data format stores palette indices, not colors.
    Indexed(DataFormat),
    /// The data format stores colors, not palette indices.
    NotIndexed(DataFormat),
    /// Palette files can't hold this many entries.
    PaletteEntries(usize),
}

impl Error for UnsupportedFormat {}

impl fmt::Display for UnsupportedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPixelFormat(code) => write!(f, "unknown pixel format code {code:#04x}"),
            Self::UnknownDataFormat(code) => write!(f, "unknown data format code {code:#04x}"),
            Self::PixelFormat(format) => write!(f, "pixel format {format:?}"),
            Self::DataFormat(format) => write!(f, "data format {format:?}"),
            Self::DecodeOnly(format) => write!(f, "{format:?} can only be decoded"),
            Self::Indexed(format) => write!(f, "{format:?} is encoded from palette indices"),
            Self::NotIndexed(format) => {
                write!(f, "{format:?} can't be encoded from palette indices")
            }
            Self::PaletteEntries(entries) => write!(
                f,
                "palettes are limited to {} entries, got {entries}",
                u16::MAX
            ),
        }
    }
}

/// Errors that can happen while encoding a PVR texture.
#[derive(Debug)]
pub enum TextureEncodeError {
    /// Building the color palette failed.
    Palette(imagequant::Error),
    /// Writing the encoded texture failed.
    Io(std::io::Error),
    /// The compression codec failed to compress the texture data.
    Compression(std::io::Error),
    /// The pixel format or data format has no encoder.
    UnsupportedCodec(UnsupportedFormat),
    /// The pixel format can't be combined with the data format, e.g. a 32-bit pixel format with
    /// a data format that doesn't use a palette.
    InvalidPixelDataCombination(PixelFormat, DataFormat),
    /// The image dimensions aren't valid for the data format.
    InvalidDimensions(u32, u32, DataFormat),
}

impl Error for TextureEncodeError {}

impl fmt::Display for TextureEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Palette(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
            Self::Compression(err) => write!(f, "Compression failed: {err}"),
            Self::UnsupportedCodec(format) => write!(f, "Unsupported codec: {format}"),
            Self::InvalidPixelDataCombination(pixel_format, data_format) => write!(
                f,
                "The pixel format {pixel_format:?} can't be used with the data format {data_format:?}."
            ),
            Self::InvalidDimensions(width, height, data_format) => write!(
                f,
                "The dimensions for the input image ({width}x{height}) are invalid for the data format {data_format:?}."
            ),
        }
    }
}

impl From<imagequant::Error> for TextureEncodeError {
    fn from(value: imagequant::Error) -> Self {
        Self::Palette(value)
    }
}

impl From<std::io::Error> for TextureEncodeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<UnsupportedFormat> for TextureEncodeError {
    fn from(value: UnsupportedFormat) -> Self {
        Self::UnsupportedCodec(value)
    }
}

/// Errors that can happen while decoding a PVR texture or an external palette.
#[derive(Debug)]
pub enum TextureDecodeError {
    /// The data isn't a PVR texture (or PVR palette); the magic strings or chunk lengths don't
    /// match.
    FormatMismatch,
    /// The header declares more data than there is available.
    TruncatedData {
        /// Amount of bytes needed.
        expected: usize,
        /// Amount of bytes available.
        actual: usize,
    },
    /// The pixel format or data format in the header can't be decoded.
    UnsupportedCodec(UnsupportedFormat),
    /// The data format needs an external palette, but none was assigned to the decoder.
    ///
    /// Assign one with [`crate::TextureDecoder::set_palette()`] and decode again.
    MissingExternalPalette {
        /// Amount of palette entries the texture indexes into.
        entries: usize,
        /// Pixel format stored in the texture header for the palette.
        pixel_format: Option<PixelFormat>,
    },
    /// The assigned palette has fewer entries than the texture needs.
    PaletteMismatch {
        /// Amount of entries needed.
        expected: usize,
        /// Amount of entries in the assigned palette.
        actual: usize,
    },
    /// The compression codec failed to decompress the texture data.
    Compression(std::io::Error),
    /// Reading from the texture data failed.
    Io(std::io::Error),
}

impl Error for TextureDecodeError {}

impl fmt::Display for TextureDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormatMismatch => write!(f, "The given data is not a valid PVR file."),
            Self::TruncatedData { expected, actual } => write!(
                f,
                "The data is truncated: expected {expected} bytes, but only {actual} are available."
            ),
            Self::UnsupportedCodec(format) => write!(f, "Unsupported codec: {format}"),
            Self::MissingExternalPalette {
                entries,
                pixel_format,
            } => write!(
                f,
                "This texture needs an external palette with {entries} entries ({pixel_format:?})."
            ),
            Self::PaletteMismatch { expected, actual } => write!(
                f,
                "The palette has {actual} entries, but this texture needs {expected}."
            ),
            Self::Compression(err) => write!(f, "Decompression failed: {err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for TextureDecodeError {
    fn from(value: std::io::Error) -> Self {
        TextureDecodeError::Io(value)
    }
}

impl From<UnsupportedFormat> for TextureDecodeError {
    fn from(value: UnsupportedFormat) -> Self {
        TextureDecodeError::UnsupportedCodec(value)
    }
}
