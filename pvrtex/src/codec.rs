//! Conversion between the memory layouts of the [`DataFormat`]s and RGBA images.

use crate::error::{TextureDecodeError, TextureEncodeError, UnsupportedFormat};
use crate::formats::{surface_size, DataFlags, DataFormat, PixelFormat};
use crate::iter::SquareBlockIterator;
use crate::palette::Palette;
use crate::pixel_codecs::PixelCodec;
use crate::twiddle::{twiddle_map, twiddled_offset};
use image::{Rgba, RgbaImage};

/// A data format paired with the pixel codec of its colors (or of its palette).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataCodec {
    data_format: DataFormat,
    pixel_codec: PixelCodec,
}

impl DataCodec {
    /// Resolves the codec for a data format and pixel format pair.
    ///
    /// # Errors
    ///
    /// Returns the format that can't be handled, if either can't.
    pub fn new(
        data_format: DataFormat,
        pixel_format: PixelFormat,
    ) -> Result<Self, UnsupportedFormat> {
        let pixel_codec =
            PixelCodec::new(pixel_format).ok_or(UnsupportedFormat::PixelFormat(pixel_format))?;

        if data_format == DataFormat::RectangleStride {
            return Err(UnsupportedFormat::DataFormat(data_format));
        }

        Ok(Self {
            data_format,
            pixel_codec,
        })
    }

    pub fn data_format(&self) -> DataFormat {
        self.data_format
    }

    pub fn pixel_codec(&self) -> PixelCodec {
        self.pixel_codec
    }

    pub fn bits_per_pixel(&self) -> u32 {
        self.data_format.bits_per_pixel(self.pixel_codec.pixel_format())
    }

    pub fn palette_entries(&self, width: u32) -> usize {
        self.data_format.palette_entries(width)
    }

    pub fn needs_external_palette(&self) -> bool {
        self.data_format.needs_external_palette()
    }

    pub fn has_mipmaps(&self) -> bool {
        self.data_format.has_mipmaps()
    }

    pub fn is_valid_dimensions(&self, width: u32, height: u32) -> bool {
        self.data_format.is_valid_dimensions(width, height)
    }

    /// VQ compressed formats can only be decoded.
    pub fn can_encode(&self) -> bool {
        !self
            .data_format
            .flags()
            .contains(DataFlags::INTERNAL_PALETTE)
    }

    /// Whether [`Self::encode_indexed()`] has to be used instead of [`Self::encode()`].
    pub fn is_indexed(&self) -> bool {
        matches!(
            self.data_format,
            DataFormat::Index4
                | DataFormat::Index4Mipmaps
                | DataFormat::Index8
                | DataFormat::Index8Mipmaps
        )
    }

    /// Size in bytes of one surface of the given dimensions.
    pub fn surface_size(&self, width: u32, height: u32) -> usize {
        surface_size(width, height, self.bits_per_pixel())
    }

    /// Decodes one surface.
    ///
    /// `palette` is used by palettized formats: the codebook for VQ formats, the external
    /// palette for indexed formats.
    ///
    /// # Errors
    ///
    /// Returns [`TextureDecodeError::TruncatedData`] if `data` is too short for the surface,
    /// [`TextureDecodeError::FormatMismatch`] if a twiddled surface isn't made of powers of two,
    /// and [`TextureDecodeError::MissingExternalPalette`] or
    /// [`TextureDecodeError::PaletteMismatch`] if a needed palette is absent or too small.
    pub fn decode(
        &self,
        data: &[u8],
        width: u32,
        height: u32,
        palette: Option<&Palette>,
    ) -> Result<RgbaImage, TextureDecodeError> {
        let expected = self.surface_size(width, height);
        if data.len() < expected {
            return Err(TextureDecodeError::TruncatedData {
                expected,
                actual: data.len(),
            });
        }

        let flags = self.data_format.flags();
        let twiddled = flags.contains(DataFlags::TWIDDLED);
        if (twiddled && !(width.is_power_of_two() && height.is_power_of_two()))
            || (flags.contains(DataFlags::SQUARE) && width != height)
        {
            log::debug!("{width}x{height} is invalid for {:?}", self.data_format);
            return Err(TextureDecodeError::FormatMismatch);
        }

        match self.data_format {
            DataFormat::Rectangle => Ok(self.decode_rectangle(data, width, height)),
            DataFormat::Vq
            | DataFormat::VqMipmaps
            | DataFormat::SmallVq
            | DataFormat::SmallVqMipmaps => {
                let palette = self.resolve_palette(palette, width)?;
                Ok(decode_vq(data, width, height, palette))
            }
            DataFormat::Index4 | DataFormat::Index4Mipmaps => {
                let palette = self.resolve_palette(palette, width)?;
                Ok(decode_indexed(data, width, height, 4, palette))
            }
            DataFormat::Index8 | DataFormat::Index8Mipmaps => {
                let palette = self.resolve_palette(palette, width)?;
                Ok(decode_indexed(data, width, height, 8, palette))
            }
            _ => Ok(self.decode_twiddled(data, width, height)),
        }
    }

    fn resolve_palette<'a>(
        &self,
        palette: Option<&'a Palette>,
        width: u32,
    ) -> Result<&'a Palette, TextureDecodeError> {
        let entries = self.palette_entries(width);
        let Some(palette) = palette else {
            return Err(TextureDecodeError::MissingExternalPalette {
                entries,
                pixel_format: Some(self.pixel_codec.pixel_format()),
            });
        };

        if palette.len() < entries {
            return Err(TextureDecodeError::PaletteMismatch {
                expected: entries,
                actual: palette.len(),
            });
        }

        Ok(palette)
    }

    fn decode_rectangle(&self, data: &[u8], width: u32, height: u32) -> RgbaImage {
        let bytes_per_pixel = self.pixel_codec.bytes_per_pixel();
        RgbaImage::from_fn(width, height, |x, y| {
            let offset = (y as usize * width as usize + x as usize) * bytes_per_pixel;
            self.pixel_codec.decode_pixel(data, offset)
        })
    }

    fn decode_twiddled(&self, data: &[u8], width: u32, height: u32) -> RgbaImage {
        let bytes_per_pixel = self.pixel_codec.bytes_per_pixel();
        let mut image = RgbaImage::new(width, height);

        let iter = SquareBlockIterator::new(width, height);
        let block_size = iter.block_size();
        let block_bytes = (block_size * block_size) as usize * bytes_per_pixel;
        let map = twiddle_map(block_size);

        for p in iter {
            let offset = p.block as usize * block_bytes
                + twiddled_offset(map, p.local_x, p.local_y) * bytes_per_pixel;
            image.put_pixel(p.x, p.y, self.pixel_codec.decode_pixel(data, offset));
        }

        image
    }

    /// Encodes one surface of a direct color format.
    ///
    /// # Errors
    ///
    /// Returns [`TextureEncodeError::UnsupportedCodec`] for palettized formats, which are
    /// encoded through [`Self::encode_indexed()`] instead.
    pub fn encode(&self, image: &RgbaImage) -> Result<Vec<u8>, TextureEncodeError> {
        if !self.can_encode() {
            return Err(UnsupportedFormat::DecodeOnly(self.data_format).into());
        }
        if self.is_indexed() {
            return Err(UnsupportedFormat::Indexed(self.data_format).into());
        }

        let (width, height) = image.dimensions();
        let bytes_per_pixel = self.pixel_codec.bytes_per_pixel();
        let mut dest = vec![0u8; self.surface_size(width, height)];

        if self.data_format == DataFormat::Rectangle {
            for (x, y, p) in image.enumerate_pixels() {
                let offset = (y as usize * width as usize + x as usize) * bytes_per_pixel;
                self.pixel_codec.encode_pixel(*p, &mut dest, offset);
            }
            return Ok(dest);
        }

        let iter = SquareBlockIterator::new(width, height);
        let block_size = iter.block_size();
        let block_bytes = (block_size * block_size) as usize * bytes_per_pixel;
        let map = twiddle_map(block_size);

        for p in iter {
            let offset = p.block as usize * block_bytes
                + twiddled_offset(map, p.local_x, p.local_y) * bytes_per_pixel;
            self.pixel_codec
                .encode_pixel(*image.get_pixel(p.x, p.y), &mut dest, offset);
        }

        Ok(dest)
    }

    /// Encodes one surface of an indexed format out of palette indices, stored row by row.
    ///
    /// # Errors
    ///
    /// Returns [`TextureEncodeError::UnsupportedCodec`] for formats that aren't indexed.
    pub fn encode_indexed(
        &self,
        indices: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<u8>, TextureEncodeError> {
        let bits = match self.data_format {
            DataFormat::Index4 | DataFormat::Index4Mipmaps => 4,
            DataFormat::Index8 | DataFormat::Index8Mipmaps => 8,
            _ => return Err(UnsupportedFormat::NotIndexed(self.data_format).into()),
        };

        let mut dest = vec![0u8; self.surface_size(width, height)];

        let iter = SquareBlockIterator::new(width, height);
        let block_size = iter.block_size();
        let block_bytes = surface_size(block_size, block_size, bits);
        let map = twiddle_map(block_size);

        for p in iter {
            let index = indices[(p.y * width + p.x) as usize];
            let offset = twiddled_offset(map, p.local_x, p.local_y);
            let block_base = p.block as usize * block_bytes;

            if bits == 4 {
                dest[block_base + (offset >> 1)] |= (index & 0xF) << ((offset & 0x1) * 4);
            } else {
                dest[block_base + offset] = index;
            }
        }

        Ok(dest)
    }
}

/// Decodes a VQ surface, looking up each 2x2 block in `codebook`.
fn decode_vq(data: &[u8], width: u32, height: u32, codebook: &Palette) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);
    // The codebook is sized after the full texture, mipmaps index into the same one.
    let mask = codebook.len() / 4 - 1;

    // Each index covers a 2x2 block; a 1x1 surface still takes a whole block.
    let blocks_x = (width / 2).max(1);
    let blocks_y = (height / 2).max(1);
    let map = twiddle_map(blocks_x.max(blocks_y));

    for block_y in 0..blocks_y {
        for block_x in 0..blocks_x {
            let index = data[twiddled_offset(map, block_x, block_y)] as usize & mask;
            let colors = &codebook.colors()[index * 4..index * 4 + 4];

            for x2 in 0..2 {
                for y2 in 0..2 {
                    let x = block_x * 2 + x2;
                    let y = block_y * 2 + y2;
                    if x < width && y < height {
                        image.put_pixel(x, y, colors[(x2 * 2 + y2) as usize]);
                    }
                }
            }
        }
    }

    image
}

/// Decodes a surface of 4 or 8 bit indices into `palette`.
fn decode_indexed(
    data: &[u8],
    width: u32,
    height: u32,
    bits: u32,
    palette: &Palette,
) -> RgbaImage {
    let mut image = RgbaImage::new(width, height);

    let iter = SquareBlockIterator::new(width, height);
    let block_size = iter.block_size();
    let block_bytes = surface_size(block_size, block_size, bits);
    let map = twiddle_map(block_size);
    let colors = palette.colors();

    for p in iter {
        let offset = twiddled_offset(map, p.local_x, p.local_y);
        let block_base = p.block as usize * block_bytes;

        let index = if bits == 4 {
            (data[block_base + (offset >> 1)] >> ((offset & 0x1) * 4)) & 0xF
        } else {
            data[block_base + offset]
        };

        let color: Rgba<u8> = colors[index as usize];
        image.put_pixel(p.x, p.y, color);
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn codec(data_format: DataFormat, pixel_format: PixelFormat) -> DataCodec {
        DataCodec::new(data_format, pixel_format).unwrap()
    }

    /// Colors exactly representable in ARGB4444.
    fn argb4444_image(width: u32, height: u32, seed: &[u8]) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            let i = (y * width + x) as usize;
            let v = |n: usize| (seed[(i * 4 + n) % seed.len()] & 0xF) * 0x11;
            Rgba([v(0), v(1), v(2), v(3)])
        })
    }

    #[test]
    fn test_unsupported_codecs() {
        assert_eq!(
            DataCodec::new(DataFormat::RectangleStride, PixelFormat::Rgb565),
            Err(UnsupportedFormat::DataFormat(DataFormat::RectangleStride))
        );
        assert_eq!(
            DataCodec::new(DataFormat::SquareTwiddled, PixelFormat::Yuv422),
            Err(UnsupportedFormat::PixelFormat(PixelFormat::Yuv422))
        );
    }

    #[test]
    fn test_square_twiddled_white() {
        let data = [0xFFu8; 32];
        let image = codec(DataFormat::SquareTwiddled, PixelFormat::Rgb565)
            .decode(&data, 4, 4, None)
            .unwrap();
        assert_eq!(image.dimensions(), (4, 4));
        assert!(image.pixels().all(|p| *p == Rgba([0xFF, 0xFF, 0xFF, 0xFF])));
    }

    #[test]
    fn test_square_twiddled_layout() {
        // Pixel (x, y) stored with its value = linear index, then check the twiddled storage.
        let image = RgbaImage::from_fn(4, 4, |x, y| {
            Rgba([(y * 4 + x) as u8 * 0x11, 0, 0, 0xFF])
        });
        let data = codec(DataFormat::SquareTwiddled, PixelFormat::Argb4444)
            .encode(&image)
            .unwrap();

        let red = |offset: usize| (data[offset * 2 + 1] & 0x0F) as u32;
        // Storage order starts (0,0), (0,1), (1,0), (1,1), (0,2)...
        assert_eq!(red(0), 0);
        assert_eq!(red(1), 4);
        assert_eq!(red(2), 1);
        assert_eq!(red(3), 5);
        assert_eq!(red(4), 8);
    }

    #[test]
    fn test_rectangle_twiddled_blocks() {
        let image = argb4444_image(8, 2, &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11]);
        let twiddled = codec(DataFormat::RectangleTwiddled, PixelFormat::Argb4444);
        let data = twiddled.encode(&image).unwrap();
        assert_eq!(data.len(), 32);

        // The third 2x2 block starts at byte 16 and holds pixel (4, 0).
        let pixel = PixelCodec::Argb4444.decode_pixel(&data, 16);
        assert_eq!(pixel, *image.get_pixel(4, 0));
        assert_eq!(twiddled.decode(&data, 8, 2, None).unwrap(), image);
    }

    #[test]
    fn test_truncated_surface() {
        let rectangle = codec(DataFormat::Rectangle, PixelFormat::Rgb565);
        let result = rectangle.decode(&[0; 31], 4, 4, None);
        assert!(matches!(
            result,
            Err(TextureDecodeError::TruncatedData {
                expected: 32,
                actual: 31
            })
        ));
    }

    #[test]
    fn test_index4_nibble_order() {
        let index4 = codec(DataFormat::Index4, PixelFormat::Argb1555);
        let indices: Vec<u8> = (0..16).collect();
        let data = index4.encode_indexed(&indices, 4, 4).unwrap();
        assert_eq!(data.len(), 8);
        // (0,0) in the low nibble, (0,1) in the high nibble of the first byte.
        assert_eq!(data[0], 0x40);
        assert_eq!(data[1], 0x51);

        let palette = Palette::grayscale(16);
        let image = index4.decode(&data, 4, 4, Some(&palette)).unwrap();
        for (x, y, p) in image.enumerate_pixels() {
            assert_eq!(Some(*p), palette.get((y * 4 + x) as usize));
        }
    }

    #[test]
    fn test_index8_rectangular() {
        let index8 = codec(DataFormat::Index8, PixelFormat::Rgb565);
        let indices: Vec<u8> = (0..32).map(|i| (i * 7) as u8).collect();
        let data = index8.encode_indexed(&indices, 8, 4).unwrap();
        assert_eq!(data.len(), 32);

        let palette = Palette::grayscale(256);
        let image = index8.decode(&data, 8, 4, Some(&palette)).unwrap();
        for (x, y, p) in image.enumerate_pixels() {
            assert_eq!(Some(*p), palette.get(indices[(y * 8 + x) as usize] as usize));
        }
    }

    #[test]
    fn test_indexed_needs_palette() {
        let index4 = codec(DataFormat::Index4, PixelFormat::Argb1555);
        assert!(matches!(
            index4.decode(&[0; 8], 4, 4, None),
            Err(TextureDecodeError::MissingExternalPalette { entries: 16, .. })
        ));
        assert!(matches!(
            index4.decode(&[0; 8], 4, 4, Some(&Palette::grayscale(8))),
            Err(TextureDecodeError::PaletteMismatch {
                expected: 16,
                actual: 8
            })
        ));
    }

    #[test]
    fn test_vq_decode() {
        let vq = codec(DataFormat::Vq, PixelFormat::Argb8888);
        // Codebook entry 1 is a 2x2 block of four distinct colors.
        let mut colors = vec![Rgba([0, 0, 0, 0]); 1024];
        colors[4] = Rgba([1, 0, 0, 0xFF]);
        colors[5] = Rgba([2, 0, 0, 0xFF]);
        colors[6] = Rgba([3, 0, 0, 0xFF]);
        colors[7] = Rgba([4, 0, 0, 0xFF]);
        let codebook = Palette::new(colors);

        // 4x4 texture: 2x2 blocks, only block (1, 0) (twiddled offset 2) uses entry 1.
        let image = vq.decode(&[0, 0, 1, 0], 4, 4, Some(&codebook)).unwrap();
        assert_eq!(image.get_pixel(2, 0).0[0], 1);
        assert_eq!(image.get_pixel(2, 1).0[0], 2);
        assert_eq!(image.get_pixel(3, 0).0[0], 3);
        assert_eq!(image.get_pixel(3, 1).0[0], 4);
        assert_eq!(*image.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert!(!vq.can_encode());
    }

    #[test]
    fn test_small_vq_masks_index() {
        let small_vq = codec(DataFormat::SmallVq, PixelFormat::Rgb565);
        // 8x8 uses 64 palette entries, 16 codebook blocks.
        let mut colors = vec![Rgba([0, 0, 0, 0xFF]); 64];
        colors[4..8].fill(Rgba([0xFF, 0xFF, 0xFF, 0xFF]));
        let codebook = Palette::new(colors);

        let data = [0x11u8; 16];
        let image = small_vq.decode(&data, 8, 8, Some(&codebook)).unwrap();
        assert!(image.pixels().all(|p| *p == Rgba([0xFF, 0xFF, 0xFF, 0xFF])));
    }

    #[test]
    fn test_vq_single_pixel_surface() {
        let vq = codec(DataFormat::VqMipmaps, PixelFormat::Rgb565);
        let codebook = Palette::grayscale(1024);
        let image = vq.decode(&[3], 1, 1, Some(&codebook)).unwrap();
        assert_eq!(Some(*image.get_pixel(0, 0)), codebook.get(12));
    }

    #[rstest]
    #[case(DataFormat::Vq, UnsupportedFormat::DecodeOnly(DataFormat::Vq))]
    #[case(DataFormat::Index8, UnsupportedFormat::Indexed(DataFormat::Index8))]
    fn test_encode_rejects_palettized(
        #[case] data_format: DataFormat,
        #[case] expected: UnsupportedFormat,
    ) {
        let image = RgbaImage::new(8, 8);
        assert!(matches!(
            codec(data_format, PixelFormat::Rgb565).encode(&image),
            Err(TextureEncodeError::UnsupportedCodec(format)) if format == expected
        ));
    }

    proptest! {
        #[test]
        fn test_rectangle_round_trip(
            size in prop::sample::select(vec![(4u32, 4u32), (8, 4), (4, 16), (16, 16)]),
            seed in prop::collection::vec(any::<u8>(), 1..64),
        ) {
            let image = argb4444_image(size.0, size.1, &seed);
            let rectangle = codec(DataFormat::Rectangle, PixelFormat::Argb4444);
            let data = rectangle.encode(&image).unwrap();
            prop_assert_eq!(rectangle.decode(&data, size.0, size.1, None).unwrap(), image);
        }

        #[test]
        fn test_twiddled_round_trip(
            size in prop::sample::select(vec![4u32, 8, 16, 32]),
            seed in prop::collection::vec(any::<u8>(), 1..64),
        ) {
            let image = argb4444_image(size, size, &seed);
            let twiddled = codec(DataFormat::SquareTwiddled, PixelFormat::Argb4444);
            let data = twiddled.encode(&image).unwrap();
            prop_assert_eq!(data.len(), (size * size * 2) as usize);
            prop_assert_eq!(twiddled.decode(&data, size, size, None).unwrap(), image);
        }
    }
}
