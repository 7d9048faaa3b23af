//! Contains all the pixel and data formats a PVR texture can be stored in.
//!
//! A PVR texture is described by two codes in its header. The [`PixelFormat`] says how a
//! single color is packed (e.g. 16-bit ARGB1555), and the [`DataFormat`] says how those
//! colors, or indices into a palette, are laid out in memory (plain rows, twiddled blocks,
//! vector quantized blocks, ...).
//!
//! See [`crate::TextureEncoder`] for where these are used.

use crate::mipmap::level_sizes;
use bitflags::bitflags;
use pvrtex_macros::FormatCode;

/// The format a single color is packed in.
///
/// For palettized data formats ([`DataFormat::Index4`], [`DataFormat::Index8`], and the VQ
/// formats) this is the format of the palette entries instead.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, FormatCode)]
#[repr(u8)]
pub enum PixelFormat {
    /// 1-bit alpha, 5 bits for each color channel.
    #[default]
    Argb1555 = 0x00,
    /// 16-bit color without an alpha channel.
    Rgb565 = 0x01,
    /// 4 bits for each channel, alpha included.
    Argb4444 = 0x02,
    /// YUV color, two pixels sharing their chroma. Not supported.
    Yuv422 = 0x03,
    /// Bump map normals. Not supported.
    Bump = 0x04,
    /// 8 bits for each channel. Only usable for palette entries.
    Argb8888 = 0x06,
}

impl PixelFormat {
    /// Amount of bits a single packed color takes up.
    pub fn bits_per_pixel(self) -> u32 {
        match self {
            Self::Argb8888 => 32,
            _ => 16,
        }
    }

    /// Amount of bytes a single packed color takes up.
    pub fn bytes_per_pixel(self) -> usize {
        (self.bits_per_pixel() / 8) as usize
    }
}

/// The layout the texture data is stored in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, FormatCode)]
#[repr(u8)]
pub enum DataFormat {
    /// Square texture, pixels stored in twiddled order.
    #[default]
    SquareTwiddled = 0x01,
    /// Same as [`DataFormat::SquareTwiddled`], preceded by a mipmap chain.
    SquareTwiddledMipmaps = 0x02,
    /// Vector quantized: one byte per 2x2 block, indexing a codebook stored in the file.
    Vq = 0x03,
    /// Same as [`DataFormat::Vq`], preceded by a mipmap chain.
    VqMipmaps = 0x04,
    /// 4-bit indices into an external 16 color palette.
    Index4 = 0x05,
    /// Same as [`DataFormat::Index4`], preceded by a mipmap chain.
    Index4Mipmaps = 0x06,
    /// 8-bit indices into an external 256 color palette.
    Index8 = 0x07,
    /// Same as [`DataFormat::Index8`], preceded by a mipmap chain.
    Index8Mipmaps = 0x08,
    /// Pixels stored row by row, without twiddling.
    Rectangle = 0x09,
    /// Rows padded to a stride given by the hardware registers. Not supported.
    RectangleStride = 0x0B,
    /// Rectangular texture made of square twiddled blocks.
    RectangleTwiddled = 0x0D,
    /// Like [`DataFormat::Vq`], with a codebook sized after the texture.
    SmallVq = 0x10,
    /// Same as [`DataFormat::SmallVq`], preceded by a mipmap chain.
    SmallVqMipmaps = 0x11,
    /// Same as [`DataFormat::SquareTwiddledMipmaps`], with a larger gap before the 1x1 mipmap.
    SquareTwiddledMipmapsAlt = 0x12,
}

bitflags! {
    /// Capabilities and constraints of a [`DataFormat`].
    #[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct DataFlags: u8 {
        /// A mipmap chain precedes the full size surface.
        const MIPMAPS = 0x1;
        /// The palette is stored in a separate palette file.
        const EXTERNAL_PALETTE = 0x2;
        /// The palette (codebook) is stored in the texture itself.
        const INTERNAL_PALETTE = 0x4;
        /// Pixels are addressed through the twiddle map.
        const TWIDDLED = 0x8;
        /// Width and height must be equal.
        const SQUARE = 0x10;
        /// The data consists of palette indices.
        const PALETTE = Self::EXTERNAL_PALETTE.bits() | Self::INTERNAL_PALETTE.bits();
    }
}

impl DataFormat {
    /// Returns the capabilities of this data format.
    pub fn flags(self) -> DataFlags {
        let twiddled_square = DataFlags::TWIDDLED | DataFlags::SQUARE;
        match self {
            Self::Rectangle | Self::RectangleStride => DataFlags::empty(),
            Self::RectangleTwiddled => DataFlags::TWIDDLED,
            Self::SquareTwiddled => twiddled_square,
            Self::SquareTwiddledMipmaps | Self::SquareTwiddledMipmapsAlt => {
                twiddled_square | DataFlags::MIPMAPS
            }
            Self::Vq | Self::SmallVq => twiddled_square | DataFlags::INTERNAL_PALETTE,
            Self::VqMipmaps | Self::SmallVqMipmaps => {
                twiddled_square | DataFlags::INTERNAL_PALETTE | DataFlags::MIPMAPS
            }
            Self::Index4 | Self::Index8 => DataFlags::TWIDDLED | DataFlags::EXTERNAL_PALETTE,
            Self::Index4Mipmaps | Self::Index8Mipmaps => {
                twiddled_square | DataFlags::EXTERNAL_PALETTE | DataFlags::MIPMAPS
            }
        }
    }

    /// Whether a mipmap chain is stored alongside the texture.
    pub fn has_mipmaps(self) -> bool {
        self.flags().contains(DataFlags::MIPMAPS)
    }

    /// Whether the palette has to be supplied from a separate palette file.
    pub fn needs_external_palette(self) -> bool {
        self.flags().contains(DataFlags::EXTERNAL_PALETTE)
    }

    /// Whether the texture data consists of indices into a palette.
    pub fn is_palettized(self) -> bool {
        self.flags().intersects(DataFlags::PALETTE)
    }

    /// Bits each pixel takes up in the texture data. Direct color layouts use the size of
    /// `pixel_format`, VQ layouts amortize one index byte over a 2x2 block.
    pub fn bits_per_pixel(self, pixel_format: PixelFormat) -> u32 {
        match self {
            Self::Vq | Self::VqMipmaps | Self::SmallVq | Self::SmallVqMipmaps => 2,
            Self::Index4 | Self::Index4Mipmaps => 4,
            Self::Index8 | Self::Index8Mipmaps => 8,
            _ => pixel_format.bits_per_pixel(),
        }
    }

    /// Amount of palette entries a texture of the given width indexes into. VQ codebooks count
    /// four entries per codebook block.
    pub fn palette_entries(self, width: u32) -> usize {
        match self {
            Self::Vq | Self::VqMipmaps => 1024,
            Self::SmallVq => match width {
                0..=16 => 64,
                17..=32 => 128,
                33..=64 => 512,
                _ => 1024,
            },
            Self::SmallVqMipmaps => match width {
                0..=16 => 64,
                17..=32 => 256,
                _ => 1024,
            },
            Self::Index4 | Self::Index4Mipmaps => 16,
            Self::Index8 | Self::Index8Mipmaps => 256,
            _ => 0,
        }
    }

    /// Amount of bytes reserved in front of the 1x1 mipmap.
    pub fn mipmap_padding(self, pixel_format: PixelFormat) -> usize {
        let bytes_per_pixel = pixel_format.bytes_per_pixel();
        match self {
            Self::SquareTwiddledMipmaps => bytes_per_pixel,
            Self::SquareTwiddledMipmapsAlt => 3 * bytes_per_pixel,
            Self::Index4Mipmaps | Self::Index8Mipmaps => 3,
            Self::VqMipmaps | Self::SmallVqMipmaps => 1,
            _ => 0,
        }
    }

    /// Checks if a texture of the given dimensions can be stored in this data format.
    pub fn is_valid_dimensions(self, width: u32, height: u32) -> bool {
        let in_range = |size: u32| size.is_power_of_two() && (4..=0x8000).contains(&size);
        if !in_range(width) || !in_range(height) {
            return false;
        }

        if self.flags().contains(DataFlags::SQUARE) && width != height {
            return false;
        }

        match self {
            Self::SmallVq => width <= 64,
            Self::SmallVqMipmaps => width <= 32,
            _ => true,
        }
    }

    /// Size of the uncompressed texture data of a `width` by `height` texture: the embedded
    /// codebook, the mipmap chain with its padding, and the main surface.
    pub fn payload_size(self, pixel_format: PixelFormat, width: u32, height: u32) -> usize {
        let bits_per_pixel = self.bits_per_pixel(pixel_format);
        let mut size = surface_size(width, height, bits_per_pixel);

        if self.flags().contains(DataFlags::INTERNAL_PALETTE) {
            size += self.palette_entries(width) * pixel_format.bytes_per_pixel();
        }
        if self.has_mipmaps() {
            size += self.mipmap_padding(pixel_format);
            size += level_sizes(width)
                .map(|level| surface_size(level, level, bits_per_pixel))
                .sum::<usize>();
        }

        size
    }
}

/// Storage size of one surface, never less than a byte.
pub(crate) fn surface_size(width: u32, height: u32, bits_per_pixel: u32) -> usize {
    ((width as usize * height as usize * bits_per_pixel as usize) / 8).max(1)
}
