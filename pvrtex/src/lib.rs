//! pvrtex is a Rust library for interfacing with the PVR texture format used by the
//! PowerVR GPU of the Dreamcast, and the games ported from it.
//!
//! A PVR texture is a small header followed by the texture data, laid out the way the GPU reads
//! it: plain rows, twiddled (Morton ordered) blocks, vector quantized blocks, or indices into a
//! palette that's shipped in a separate palette file.
//!
//! # Examples
//!
//! Here's a few examples on how to encode and decode PVR texture files.
//!
//! Encoding an image into a PVR file:
//!
//! ```no_run
//! use pvrtex::error::TextureEncodeError;
//! use pvrtex::formats::{DataFormat, PixelFormat};
//! use pvrtex::TextureEncoder;
//!
//! # fn main() -> Result<(), TextureEncodeError> {
//! # let image = image::RgbaImage::new(64, 64);
//! let mut encoder =
//!     TextureEncoder::new(image, PixelFormat::Argb1555, DataFormat::SquareTwiddledMipmaps)?
//!         .with_global_index(1000);
//! let encoded_file = encoder.encode()?.to_vec();
//! # Ok(())
//! # }
//! ```
//!
//! Decoding a PVR file:
//!
//! ```no_run
//! use pvrtex::error::TextureDecodeError;
//! use pvrtex::TextureDecoder;
//!
//! # fn main() -> Result<(), TextureDecodeError> {
//! # let pvr_data: Vec<u8> = vec![];
//! // Parses the header, but doesn't decode the texture yet.
//! let mut decoder = TextureDecoder::new(pvr_data)?;
//! println!("{}x{} {:?}", decoder.width(), decoder.height(), decoder.data_format());
//!
//! // Decode the texture, the result is kept in the decoder.
//! let image = decoder.decode()?;
//! # let _ = image;
//! # Ok(())
//! # }
//! ```
//!
//! Palettized textures need their palette file before they can be decoded, see the [`palette`]
//! module.
//!
//! # Hints
//!
//! Easiest place to start off is to look at [`TextureEncoder`] for encoding PVR textures and
//! [`TextureDecoder`] for decoding PVR textures.

#![warn(missing_docs)]

use crate::codec::DataCodec;
use crate::compression::{CompressionCodec, CompressionFormat, RleCodec};
use crate::error::*;
use crate::formats::{DataFormat, PixelFormat};
use crate::mipmap::Mipmap;
use crate::palette::{Palette, PaletteEncoder};
use crate::quantize::Quantizer;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};
use image::{Rgba, RgbaImage};
use std::borrow::Cow;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

mod codec;
pub mod compression;
pub mod error;
pub mod formats;
mod iter;
pub mod mipmap;
pub mod palette;
mod pixel_codecs;
mod quantize;
pub mod twiddle;

const GLOBAL_INDEX_MAGIC: &[u8; 4] = b"GBIX";
const GLOBAL_INDEX_ALT_MAGIC: &[u8; 4] = b"GCIX";
const TEXTURE_MAGIC: &[u8; 4] = b"PVRT";

/// Size of the PVRT chunk fields counted in its length: formats, reserved bytes and dimensions.
const TEXTURE_FIELDS_SIZE: usize = 8;

/// Provides all the functionality needed to encode a PVR texture file.
///
/// The encoder doesn't inherently provide a method to save the texture into a file, you will be
/// given the bytes from [`Self::encode()`], which you can save to a file yourself. Palettized
/// formats also produce a palette file, see [`Self::palette_file()`].
///
/// For examples, see the documentation on the root of the [`crate`]
pub struct TextureEncoder {
    image: RgbaImage,
    codec: DataCodec,
    global_index: Option<u32>,
    compression: CompressionFormat,
    compression_codec: Option<Box<dyn CompressionCodec>>,
    dither: bool,

    palette: Option<Palette>,
    encoded: Option<Vec<u8>>,
}

impl TextureEncoder {
    /// Creates a new encoder, that encodes `image` using the given `pixel_format` and
    /// `data_format`.
    ///
    /// Data formats with mipmaps generate them from `image`. For [`DataFormat::Index4`] and
    /// [`DataFormat::Index8`] (and their mipmap variants) a palette is generated, whose colors
    /// are stored in `pixel_format`.
    ///
    /// # Errors
    ///
    /// - [`TextureEncodeError::UnsupportedCodec`] if either format has no encoder, which
    ///   includes the VQ data formats.
    /// - [`TextureEncodeError::InvalidPixelDataCombination`] if [`PixelFormat::Argb8888`] is
    ///   used with a data format that doesn't have a palette.
    /// - [`TextureEncodeError::InvalidDimensions`] if the dimensions of `image` can't be stored
    ///   in `data_format`.
    pub fn new(
        image: RgbaImage,
        pixel_format: PixelFormat,
        data_format: DataFormat,
    ) -> Result<Self, TextureEncodeError> {
        let codec = DataCodec::new(data_format, pixel_format)?;

        if !codec.can_encode() {
            return Err(UnsupportedFormat::DecodeOnly(data_format).into());
        }

        if pixel_format == PixelFormat::Argb8888 && !data_format.is_palettized() {
            return Err(TextureEncodeError::InvalidPixelDataCombination(
                pixel_format,
                data_format,
            ));
        }

        let (width, height) = image.dimensions();
        if !codec.is_valid_dimensions(width, height) {
            return Err(TextureEncodeError::InvalidDimensions(
                width,
                height,
                data_format,
            ));
        }

        Ok(Self {
            image,
            codec,
            global_index: None,
            compression: CompressionFormat::None,
            compression_codec: None,
            dither: false,
            palette: None,
            encoded: None,
        })
    }

    /// Writes a global index chunk with the given index in front of the texture.
    ///
    /// Most games don't really use this, but some look textures up by it. If this method is
    /// not used, the encoded texture won't have a global index chunk.
    pub fn with_global_index(mut self, global_index: u32) -> Self {
        self.global_index = Some(global_index);
        self
    }

    /// Compresses the texture data with the given compression format.
    pub fn with_compression(mut self, compression: CompressionFormat) -> Self {
        self.compression = compression;
        self
    }

    /// Compresses the texture data with a custom compression codec.
    pub fn with_compression_codec(mut self, codec: Box<dyn CompressionCodec>) -> Self {
        self.compression_codec = Some(codec);
        self
    }

    /// Dithers palettized textures, mipmaps included, when the image has more colors than the
    /// palette can hold. Off by default.
    pub fn with_dithering(mut self, dither: bool) -> Self {
        self.dither = dither;
        self
    }

    /// Encodes the image into a PVR texture.
    ///
    /// The encoded texture is kept in the encoder, so calling this again doesn't encode the
    /// image a second time.
    ///
    /// # Errors
    ///
    /// If anything goes wrong in the encoding process, a [`TextureEncodeError`] is returned
    /// instead.
    pub fn encode(&mut self) -> Result<&[u8], TextureEncodeError> {
        let encoded = match self.encoded.take() {
            Some(encoded) => encoded,
            None => self.encode_texture()?,
        };
        Ok(self.encoded.insert(encoded))
    }

    /// The generated palette, padded up to the amount of entries the data format indexes into.
    ///
    /// Returns [`None`] for data formats without a palette. Encodes the texture first if it
    /// hasn't been encoded yet.
    pub fn palette(&mut self) -> Result<Option<&Palette>, TextureEncodeError> {
        self.encode()?;
        Ok(self.palette.as_ref())
    }

    /// Encodes the generated palette into a palette file, which has to be shipped alongside
    /// the texture.
    ///
    /// Returns [`None`] for data formats without a palette.
    pub fn palette_file(&mut self) -> Result<Option<Vec<u8>>, TextureEncodeError> {
        let pixel_format = self.codec.pixel_codec().pixel_format();
        let Some(palette) = self.palette()? else {
            return Ok(None);
        };
        Ok(Some(PaletteEncoder::new(palette, pixel_format)?.encode()?))
    }

    fn encode_texture(&mut self) -> Result<Vec<u8>, TextureEncodeError> {
        let payload = self.encode_payload()?;
        let (width, height) = self.image.dimensions();

        let mut buf = Vec::with_capacity(payload.len() + 0x20);
        if let Some(global_index) = self.global_index {
            buf.write_all(GLOBAL_INDEX_MAGIC)?;
            buf.write_u32::<LittleEndian>(8)?;
            buf.write_u32::<LittleEndian>(global_index)?;
            buf.write_u32::<LittleEndian>(0)?; // reserved
        }

        let stored = self.compress_payload(payload)?;
        let chunk_len = u32::try_from(stored.len() + TEXTURE_FIELDS_SIZE).map_err(|_| {
            TextureEncodeError::Io(std::io::Error::other("texture data too large"))
        })?;

        buf.write_all(TEXTURE_MAGIC)?;
        buf.write_u32::<LittleEndian>(chunk_len)?;
        buf.write_u8(self.codec.pixel_codec().pixel_format().into())?;
        buf.write_u8(self.codec.data_format().into())?;
        buf.write_u16::<LittleEndian>(0)?; // reserved
        buf.write_u16::<LittleEndian>(width as u16)?;
        buf.write_u16::<LittleEndian>(height as u16)?;
        buf.write_all(&stored)?;

        log::debug!(
            "Encoded {width}x{height} texture as {:?} {:?}, {} bytes",
            self.codec.pixel_codec().pixel_format(),
            self.codec.data_format(),
            buf.len()
        );

        Ok(buf)
    }

    /// Compresses the payload if compression was requested, prefixing it with its uncompressed
    /// length.
    ///
    /// A compressed block exactly as long as the payload can't be told apart from an
    /// uncompressed one, so such a payload is stored as is.
    fn compress_payload(&self, payload: Vec<u8>) -> Result<Vec<u8>, TextureEncodeError> {
        let Some(codec) = self.compression_codec() else {
            return Ok(payload);
        };

        let compressed = codec
            .compress(&payload)
            .map_err(TextureEncodeError::Compression)?;
        if compressed.len() + 4 == payload.len() {
            log::debug!(
                "Compressed texture data is as long as the uncompressed data, storing it as is"
            );
            return Ok(payload);
        }

        log::debug!(
            "Compressed texture data from {} to {} bytes",
            payload.len(),
            compressed.len()
        );
        let uncompressed_len = u32::try_from(payload.len()).map_err(|_| {
            TextureEncodeError::Io(std::io::Error::other("texture data too large"))
        })?;

        let mut stored = Vec::with_capacity(compressed.len() + 4);
        stored.write_u32::<LittleEndian>(uncompressed_len)?;
        stored.extend(compressed);
        Ok(stored)
    }

    fn compression_codec(&self) -> Option<&dyn CompressionCodec> {
        if let Some(codec) = &self.compression_codec {
            return Some(codec.as_ref());
        }

        match self.compression {
            CompressionFormat::None => None,
            CompressionFormat::Rle => Some(&RleCodec),
        }
    }

    /// Encodes the mipmap chain and the main surface, generating the palette if needed.
    fn encode_payload(&mut self) -> Result<Vec<u8>, TextureEncodeError> {
        let width = self.image.width();
        let entries = self.codec.palette_entries(width);

        let mut quantizer = if self.codec.is_indexed() {
            Some(Quantizer::new(&self.image, entries, self.dither)?)
        } else {
            None
        };

        // The main surface goes first, it's the one the palette was built for.
        let main = encode_surface(&self.codec, &self.image, quantizer.as_mut())?;

        let mut payload = Vec::new();
        if self.codec.has_mipmaps() {
            let padding = self
                .codec
                .data_format()
                .mipmap_padding(self.codec.pixel_codec().pixel_format());
            payload.resize(padding, 0);

            for size in mipmap::level_sizes(width) {
                log::trace!("Encoding {size}x{size} mipmap");
                let level = mipmap::downscale(&self.image, size);
                payload.extend(encode_surface(&self.codec, &level, quantizer.as_mut())?);
            }
        }
        payload.extend(main);

        if let Some(quantizer) = quantizer {
            let mut colors = quantizer.palette().colors().to_vec();
            colors.resize(entries.max(colors.len()), Rgba([0, 0, 0, 0]));
            self.palette = Some(Palette::new(colors));
        }

        Ok(payload)
    }
}

fn encode_surface(
    codec: &DataCodec,
    image: &RgbaImage,
    quantizer: Option<&mut Quantizer>,
) -> Result<Vec<u8>, TextureEncodeError> {
    match quantizer {
        Some(quantizer) => {
            let indices = quantizer.indices(image)?;
            codec.encode_indexed(&indices, image.width(), image.height())
        }
        None => codec.encode(image),
    }
}

/// The header fields of a PVR texture.
#[derive(Debug, Clone, Copy)]
struct Header {
    global_index: Option<u32>,
    pixel_format: Result<PixelFormat, u8>,
    data_format: Result<DataFormat, u8>,
    width: u16,
    height: u16,
    /// Offset of the texture data, right after the PVRT chunk fields.
    payload_offset: usize,
    compressed: bool,
}

impl Header {
    fn parse(data: &[u8]) -> Result<Self, TextureDecodeError> {
        let mut cursor = Cursor::new(data);
        let mut global_index = None;

        let mut magic = read_magic(&mut cursor)?;
        if &magic == GLOBAL_INDEX_MAGIC || &magic == GLOBAL_INDEX_ALT_MAGIC {
            let chunk_len = cursor.read_u32::<LittleEndian>()?;
            if chunk_len != 8 {
                log::warn!("Global index chunk has a length of {chunk_len}, expected 8");
            }
            let chunk_start = cursor.position();
            global_index = Some(cursor.read_u32::<LittleEndian>()?);
            cursor.seek(SeekFrom::Start(chunk_start + chunk_len as u64))?;
            magic = read_magic(&mut cursor)?;
        }

        if &magic != TEXTURE_MAGIC {
            return Err(TextureDecodeError::FormatMismatch);
        }

        let chunk_len = cursor.read_u32::<LittleEndian>()? as usize;
        let pixel_format = PixelFormat::try_from(cursor.read_u8()?);
        let data_format = DataFormat::try_from(cursor.read_u8()?);
        cursor.read_u16::<LittleEndian>()?; // reserved
        let width = cursor.read_u16::<LittleEndian>()?;
        let height = cursor.read_u16::<LittleEndian>()?;

        if width == 0 || height == 0 || chunk_len < TEXTURE_FIELDS_SIZE {
            return Err(TextureDecodeError::FormatMismatch);
        }

        let payload_offset = cursor.position() as usize;
        let stored_len = chunk_len - TEXTURE_FIELDS_SIZE;
        let remaining = data.len() - payload_offset;

        if remaining < stored_len {
            return Err(TextureDecodeError::TruncatedData {
                expected: payload_offset + stored_len,
                actual: data.len(),
            });
        }
        if remaining > stored_len {
            log::debug!("PVRT chunk declares {stored_len} bytes, but {remaining} follow it");
            return Err(TextureDecodeError::FormatMismatch);
        }

        // Compressed data starts with the length the layout of the texture calls for. Without
        // known formats that length is unknown, and the data is taken as is.
        let compressed = match (pixel_format, data_format) {
            (Ok(pixel_format), Ok(data_format)) => {
                let expected =
                    data_format.payload_size(pixel_format, width.into(), height.into());
                stored_len != expected
                    && stored_len >= 4
                    && LittleEndian::read_u32(&data[payload_offset..]) as usize == expected
            }
            _ => false,
        };

        Ok(Self {
            global_index,
            pixel_format,
            data_format,
            width,
            height,
            payload_offset,
            compressed,
        })
    }
}

/// Reads a chunk magic, failing with [`TextureDecodeError::FormatMismatch`] at the end of the
/// data.
fn read_magic(cursor: &mut Cursor<&[u8]>) -> Result<[u8; 4], TextureDecodeError> {
    let mut magic = [0u8; 4];
    cursor
        .read_exact(&mut magic)
        .map_err(|_| TextureDecodeError::FormatMismatch)?;
    Ok(magic)
}

/// The texture data, split up into its parts.
struct Payload {
    codec: DataCodec,
    codebook: Option<Palette>,
    mipmaps: Vec<Mipmap>,
    surface: Vec<u8>,
}

/// Provides all the functionality needed to decode a PVR texture file.
///
/// The header is parsed when the decoder is created, so the dimensions and formats of a
/// texture can be inspected even if it can't be decoded. The texture itself is decoded by
/// [`Self::decode()`], and kept in the decoder afterwards.
///
/// For examples, see the documentation on the root of the [`crate`]
pub struct TextureDecoder {
    data: Vec<u8>,
    header: Header,
    compression_codec: Box<dyn CompressionCodec>,
    palette: Option<Palette>,

    payload: Option<Payload>,
    image: Option<RgbaImage>,
}

impl TextureDecoder {
    /// Instantiate a new [`TextureDecoder`] for the PVR texture in `data`, parsing its header.
    ///
    /// This function doesn't decode the texture by itself, [`Self::decode()`] must be called.
    ///
    /// # Errors
    ///
    /// Returns [`TextureDecodeError::FormatMismatch`] if `data` isn't a PVR texture, and
    /// [`TextureDecodeError::TruncatedData`] if the header declares more texture data than
    /// there is.
    pub fn new(data: Vec<u8>) -> Result<Self, TextureDecodeError> {
        let header = Header::parse(&data).map_err(|err| match err {
            TextureDecodeError::Io(_) => TextureDecodeError::FormatMismatch,
            err => err,
        })?;

        log::debug!(
            "Parsed PVR header: {}x{}, pixel format {:?}, data format {:?}, compressed: {}",
            header.width,
            header.height,
            header.pixel_format,
            header.data_format,
            header.compressed
        );

        Ok(Self {
            data,
            header,
            compression_codec: Box::new(RleCodec),
            palette: None,
            payload: None,
            image: None,
        })
    }

    /// Decompresses compressed textures with the given codec instead of [`RleCodec`].
    pub fn with_compression_codec(mut self, codec: Box<dyn CompressionCodec>) -> Self {
        self.compression_codec = codec;
        self
    }

    /// Width of the texture.
    pub fn width(&self) -> u32 {
        self.header.width.into()
    }

    /// Height of the texture.
    pub fn height(&self) -> u32 {
        self.header.height.into()
    }

    /// The global index of the texture, if it has a global index chunk.
    pub fn global_index(&self) -> Option<u32> {
        self.header.global_index
    }

    /// The pixel format of the texture, if the code in the header is a known one.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        self.header.pixel_format.ok()
    }

    /// The raw pixel format code in the header.
    pub fn pixel_format_code(&self) -> u8 {
        match self.header.pixel_format {
            Ok(format) => format.into(),
            Err(code) => code,
        }
    }

    /// The data format of the texture, if the code in the header is a known one.
    pub fn data_format(&self) -> Option<DataFormat> {
        self.header.data_format.ok()
    }

    /// The raw data format code in the header.
    pub fn data_format_code(&self) -> u8 {
        match self.header.data_format {
            Ok(format) => format.into(),
            Err(code) => code,
        }
    }

    /// Whether the texture data is compressed.
    pub fn is_compressed(&self) -> bool {
        self.header.compressed
    }

    /// Whether a palette has to be assigned with [`Self::set_palette()`] before decoding.
    pub fn needs_external_palette(&self) -> bool {
        self.data_format()
            .is_some_and(DataFormat::needs_external_palette)
    }

    /// Amount of palette entries the texture indexes into, 0 if it doesn't use a palette.
    pub fn palette_entries(&self) -> usize {
        self.data_format()
            .map_or(0, |format| format.palette_entries(self.width()))
    }

    /// Amount of mipmaps stored alongside the texture.
    pub fn mipmap_count(&self) -> usize {
        match self.data_format() {
            Some(format) if format.has_mipmaps() => mipmap::level_sizes(self.width()).count(),
            _ => 0,
        }
    }

    /// Assigns the palette used to decode textures with an external palette.
    ///
    /// Anything decoded with a previously assigned palette is dropped.
    pub fn set_palette(&mut self, palette: Palette) {
        let entries = self.palette_entries();
        if palette.len() > entries {
            log::warn!(
                "Palette has {} entries, the texture only uses {entries}",
                palette.len()
            );
        }

        self.palette = Some(palette);
        self.image = None;
        if let Some(payload) = &mut self.payload {
            payload.mipmaps.iter_mut().for_each(Mipmap::reset);
        }
    }

    /// Decodes the texture, returning the decoded image.
    ///
    /// The image is kept in the decoder, so calling this again returns the same image.
    ///
    /// # Errors
    ///
    /// - [`TextureDecodeError::UnsupportedCodec`] if the pixel or data format can't be decoded.
    /// - [`TextureDecodeError::MissingExternalPalette`] if the texture needs an external
    ///   palette and none has been assigned. Assign one with [`Self::set_palette()`] and call
    ///   this again.
    /// - [`TextureDecodeError::TruncatedData`] if the texture data is too short.
    /// - [`TextureDecodeError::Compression`] if the texture data can't be decompressed.
    pub fn decode(&mut self) -> Result<&RgbaImage, TextureDecodeError> {
        let image = match self.image.take() {
            Some(image) => image,
            None => self.decode_surface()?,
        };
        Ok(self.image.insert(image))
    }

    /// Decodes the mipmap at `level`, where level 0 is the 1x1 mipmap, and each following
    /// level doubles in size.
    ///
    /// Returns [`None`] if there's no mipmap at `level`.
    ///
    /// # Errors
    ///
    /// Fails for the same reasons as [`Self::decode()`].
    pub fn decode_mipmap(
        &mut self,
        level: usize,
    ) -> Result<Option<&RgbaImage>, TextureDecodeError> {
        let payload = self.take_payload()?;
        let payload = self.payload.insert(payload);
        let palette = payload.codebook.as_ref().or(self.palette.as_ref());

        match payload.mipmaps.get_mut(level) {
            Some(mipmap) => Ok(Some(mipmap.decode(&payload.codec, palette)?)),
            None => Ok(None),
        }
    }

    /// The mipmap chain as stored in the texture, smallest level first.
    ///
    /// Levels decoded with [`Self::decode_mipmap()`] hold on to their decoded image.
    ///
    /// # Errors
    ///
    /// Fails if the texture data can't be split up: [`TextureDecodeError::UnsupportedCodec`],
    /// [`TextureDecodeError::TruncatedData`] or [`TextureDecodeError::Compression`].
    pub fn mipmaps(&mut self) -> Result<&[Mipmap], TextureDecodeError> {
        let payload = self.take_payload()?;
        Ok(&self.payload.insert(payload).mipmaps)
    }

    /// Checks if the texture has been decoded.
    pub fn is_decoded(&self) -> bool {
        self.image.is_some()
    }

    /// Borrows the decoded image, if [`Self::decode()`] has ran successfully.
    pub fn as_decoded(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    /// Returns the decoded image, consuming `self`. Decodes the texture first if it hasn't
    /// been decoded yet.
    ///
    /// # Errors
    ///
    /// Fails for the same reasons as [`Self::decode()`].
    pub fn into_decoded(mut self) -> Result<RgbaImage, TextureDecodeError> {
        match self.image.take() {
            Some(image) => Ok(image),
            None => self.decode_surface(),
        }
    }

    fn decode_surface(&mut self) -> Result<RgbaImage, TextureDecodeError> {
        let (width, height) = (self.width(), self.height());
        let payload = self.take_payload()?;
        let payload = self.payload.insert(payload);
        let palette = payload.codebook.as_ref().or(self.palette.as_ref());
        payload.codec.decode(&payload.surface, width, height, palette)
    }

    fn codec(&self) -> Result<DataCodec, TextureDecodeError> {
        let data_format = self
            .header
            .data_format
            .map_err(UnsupportedFormat::UnknownDataFormat)?;
        let pixel_format = self
            .header
            .pixel_format
            .map_err(UnsupportedFormat::UnknownPixelFormat)?;

        Ok(DataCodec::new(data_format, pixel_format)?)
    }

    fn take_payload(&mut self) -> Result<Payload, TextureDecodeError> {
        match self.payload.take() {
            Some(payload) => Ok(payload),
            None => self.read_payload(),
        }
    }

    /// Decompresses the texture data if needed, and splits it into the embedded palette,
    /// mipmaps and main surface.
    fn read_payload(&self) -> Result<Payload, TextureDecodeError> {
        let codec = self.codec()?;
        let (width, height) = (self.width(), self.height());

        let data = &self.data[self.header.payload_offset..];
        let data: Cow<[u8]> = if self.header.compressed {
            let decompressed = self
                .compression_codec
                .decompress(&data[4..])
                .map_err(TextureDecodeError::Compression)?;
            log::debug!(
                "Decompressed texture data from {} to {} bytes",
                data.len() - 4,
                decompressed.len()
            );
            Cow::Owned(decompressed)
        } else {
            Cow::Borrowed(data)
        };

        let truncated = |expected: usize| TextureDecodeError::TruncatedData {
            expected,
            actual: data.len(),
        };

        let mut pos = 0;
        let mut codebook = None;
        let data_format = codec.data_format();
        if data_format.is_palettized() && !codec.needs_external_palette() {
            let entries = codec.palette_entries(width);
            let size = entries * codec.pixel_codec().bytes_per_pixel();
            let packed = data.get(..size).ok_or_else(|| truncated(size))?;
            codebook = Some(Palette::from_packed(packed, entries, codec.pixel_codec()));
            pos += size;
        }

        let mut mipmaps = Vec::new();
        if codec.has_mipmaps() {
            let padding = data_format.mipmap_padding(codec.pixel_codec().pixel_format());
            let (levels, consumed) = mipmap::split_chain(&data[pos..], &codec, width, padding)
                .map_err(|err| match err {
                    TextureDecodeError::TruncatedData { expected, .. } => truncated(pos + expected),
                    err => err,
                })?;
            mipmaps = levels;
            pos += consumed;
        }

        let size = codec.surface_size(width, height);
        let surface = data
            .get(pos..pos + size)
            .ok_or_else(|| truncated(pos + size))?
            .to_vec();

        Ok(Payload {
            codec,
            codebook,
            mipmaps,
            surface,
        })
    }
}
