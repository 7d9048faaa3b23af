//! Mipmap chains: the progressively halved copies of a texture stored ahead of its main
//! surface.

use crate::codec::DataCodec;
use crate::error::TextureDecodeError;
use crate::palette::Palette;
use image::imageops::{self, FilterType};
use image::RgbaImage;

/// A single level of a mipmap chain.
///
/// The raw level data is kept around, and decoded the first time it's asked for.
#[derive(Debug, Clone)]
pub struct Mipmap {
    size: u32,
    data: Vec<u8>,
    image: Option<RgbaImage>,
}

impl Mipmap {
    pub(crate) fn new(size: u32, data: Vec<u8>) -> Self {
        Self {
            size,
            data,
            image: None,
        }
    }

    /// Edge length of the level. Mipmaps are always square.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Width of the level, same as [`Self::size()`].
    pub fn width(&self) -> u32 {
        self.size
    }

    /// Height of the level, same as [`Self::size()`].
    pub fn height(&self) -> u32 {
        self.size
    }

    /// The level as it's stored in the texture.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// Whether the level has been decoded already.
    pub fn is_decoded(&self) -> bool {
        self.image.is_some()
    }

    /// Borrows the decoded level, if it has been decoded.
    pub fn as_decoded(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub(crate) fn decode(
        &mut self,
        codec: &DataCodec,
        palette: Option<&Palette>,
    ) -> Result<&RgbaImage, TextureDecodeError> {
        let image = match self.image.take() {
            Some(image) => image,
            None => {
                log::trace!("Decoding {0}x{0} mipmap", self.size);
                codec.decode(&self.data, self.size, self.size, palette)?
            }
        };
        Ok(self.image.insert(image))
    }

    /// Drops the decoded level, e.g. after the palette it was decoded with changed.
    pub(crate) fn reset(&mut self) {
        self.image = None;
    }
}

/// Edge lengths of the mipmaps of a texture, smallest first.
///
/// A 64x64 texture has 6 levels, from 1x1 up to 32x32.
pub(crate) fn level_sizes(width: u32) -> impl Iterator<Item = u32> {
    let count = if width == 0 { 0 } else { width.ilog2() };
    (0..count).map(|level| 1 << level)
}

/// Splits the mipmap chain off the front of `data`, skipping the leading padding.
///
/// Returns the levels and the amount of bytes they took up, padding included.
pub(crate) fn split_chain(
    data: &[u8],
    codec: &DataCodec,
    width: u32,
    padding: usize,
) -> Result<(Vec<Mipmap>, usize), TextureDecodeError> {
    let mut pos = padding;
    let mut levels = Vec::new();

    for size in level_sizes(width) {
        let level_size = codec.surface_size(size, size);
        let Some(level) = data.get(pos..pos + level_size) else {
            return Err(TextureDecodeError::TruncatedData {
                expected: pos + level_size,
                actual: data.len(),
            });
        };

        levels.push(Mipmap::new(size, level.to_vec()));
        pos += level_size;
    }

    Ok((levels, pos))
}

/// Scales `image` down to a `size` by `size` mipmap level.
pub(crate) fn downscale(image: &RgbaImage, size: u32) -> RgbaImage {
    imageops::resize(image, size, size, FilterType::Triangle)
}
