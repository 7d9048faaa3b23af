//! Palette generation for the indexed data formats.

use crate::error::TextureEncodeError;
use crate::palette::Palette;
use image::{Rgba, RgbaImage};
use std::collections::HashMap;

/// Builds a palette for an image, and maps images onto that palette.
///
/// If the image has no more distinct colors than the palette can hold, the palette holds
/// exactly those colors. Otherwise libimagequant picks the colors, and every image handed to
/// [`Self::indices()`] afterwards (the mipmaps, for instance) is remapped by that same
/// quantization result, so all of them are matched against the palette the same way.
pub struct Quantizer {
    palette: Palette,
    mapping: Mapping,
    remapped: Option<Vec<u8>>,
}

enum Mapping {
    /// Every color of the image has an entry of its own.
    Exact(HashMap<Rgba<u8>, u8>),
    Quantized {
        attributes: imagequant::Attributes,
        result: imagequant::QuantizationResult,
    },
}

impl Quantizer {
    /// Builds a palette of at most `entries` colors for `image`.
    ///
    /// With `dither` enabled, indices are dithered when the palette had to be reduced.
    ///
    /// # Errors
    ///
    /// Returns [`TextureEncodeError::Palette`] if libimagequant fails.
    pub fn new(
        image: &RgbaImage,
        entries: usize,
        dither: bool,
    ) -> Result<Self, TextureEncodeError> {
        let entries = entries.min(256);

        let mut lookup = HashMap::new();
        let mut colors = Vec::new();
        for pixel in image.pixels() {
            if lookup.len() > entries {
                break;
            }
            lookup.entry(*pixel).or_insert_with(|| {
                colors.push(*pixel);
                (colors.len() - 1) as u8
            });
        }

        if lookup.len() <= entries {
            log::debug!("Using an exact palette of {} colors", colors.len());
            return Ok(Self {
                palette: Palette::new(colors),
                mapping: Mapping::Exact(lookup),
                remapped: None,
            });
        }

        let mut attributes = imagequant::new();
        attributes.set_max_colors(entries as u32)?;
        attributes.set_quality(0, 100)?;

        let pixels = liq_pixels(image);
        let mut liq_image = attributes.new_image_borrowed(
            &pixels,
            image.width() as usize,
            image.height() as usize,
            0.0,
        )?;
        let mut result = attributes.quantize(&mut liq_image)?;
        result.set_dithering_level(if dither { 1.0 } else { 0.0 })?;

        // Remapping may still adjust the colors, but never which entry a color ends up in.
        // The palette of the image it was built for is the one that gets stored.
        let (colors, remapped) = result.remapped(&mut liq_image)?;
        let palette = Palette::new(
            colors
                .into_iter()
                .map(|c| Rgba([c.r, c.g, c.b, c.a]))
                .collect(),
        );
        log::debug!(
            "Quantized {}x{} image down to {} colors",
            image.width(),
            image.height(),
            palette.len()
        );

        Ok(Self {
            palette,
            mapping: Mapping::Quantized { attributes, result },
            remapped: Some(remapped),
        })
    }

    /// The generated palette. It may hold fewer colors than were asked for.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Maps every pixel of `image` onto the palette, returning the indices row by row.
    ///
    /// The first call returns the indices computed while building the palette, if
    /// libimagequant was used.
    ///
    /// # Errors
    ///
    /// Returns [`TextureEncodeError::Palette`] if libimagequant fails to remap `image`.
    pub fn indices(&mut self, image: &RgbaImage) -> Result<Vec<u8>, TextureEncodeError> {
        if let Some(remapped) = self.remapped.take() {
            if remapped.len() == image.pixels().len() {
                return Ok(remapped);
            }
        }

        match &mut self.mapping {
            Mapping::Exact(lookup) => Ok(image
                .pixels()
                .map(|pixel| match lookup.get(pixel) {
                    Some(index) => *index,
                    None => nearest(&self.palette, *pixel),
                })
                .collect()),
            Mapping::Quantized { attributes, result } => {
                let pixels = liq_pixels(image);
                let mut liq_image = attributes.new_image_borrowed(
                    &pixels,
                    image.width() as usize,
                    image.height() as usize,
                    0.0,
                )?;
                let (_, indices) = result.remapped(&mut liq_image)?;
                Ok(indices)
            }
        }
    }
}

fn liq_pixels(image: &RgbaImage) -> Vec<imagequant::RGBA> {
    image
        .pixels()
        .map(|p| imagequant::RGBA::new(p.0[0], p.0[1], p.0[2], p.0[3]))
        .collect()
}

/// Index of the exact palette color closest to `color`, by euclidean distance over RGBA.
fn nearest(palette: &Palette, color: Rgba<u8>) -> u8 {
    let distance = |other: &Rgba<u8>| -> u32 {
        color
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| {
                let diff = a as i32 - b as i32;
                (diff * diff) as u32
            })
            .sum()
    };

    palette
        .colors()
        .iter()
        .enumerate()
        .min_by_key(|(_, other)| distance(other))
        .map_or(0, |(i, _)| i as u8)
}
