use byteorder::{LittleEndian, WriteBytesExt};
use image::Rgba;
use pvrtex::error::{TextureDecodeError, UnsupportedFormat};
use pvrtex::formats::{DataFormat, PixelFormat};
use pvrtex::palette::{Palette, PaletteDecoder, PaletteEncoder};
use pvrtex::TextureDecoder;
use rstest::rstest;
use std::io::Write;

const WHITE: Rgba<u8> = Rgba([0xFF, 0xFF, 0xFF, 0xFF]);
const RED: Rgba<u8> = Rgba([0xFF, 0, 0, 0xFF]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 0xFF]);

fn pvrt(pixel_format: u8, data_format: u8, width: u16, height: u16, payload: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_all(b"PVRT").unwrap();
    buf.write_u32::<LittleEndian>(payload.len() as u32 + 8).unwrap();
    buf.write_u8(pixel_format).unwrap();
    buf.write_u8(data_format).unwrap();
    buf.write_u16::<LittleEndian>(0).unwrap();
    buf.write_u16::<LittleEndian>(width).unwrap();
    buf.write_u16::<LittleEndian>(height).unwrap();
    buf.write_all(payload).unwrap();
    buf
}

/// An RGB565 VQ codebook of `entries` colors. Block 1 is white, block 2 red, the rest black.
fn codebook(entries: usize) -> Vec<u8> {
    let mut codebook = vec![0u8; entries * 2];
    codebook[8..16].fill(0xFF);
    for color in codebook[16..24].chunks_mut(2) {
        color.copy_from_slice(&[0x00, 0xF8]);
    }
    codebook
}

fn vq_mipmaps_payload() -> Vec<u8> {
    let mut payload = codebook(1024);
    payload.push(0x02); // padding
    payload.push(1);
    payload.push(2);
    payload.extend([1; 4]);
    payload
}

fn small_vq_mipmaps_payload() -> Vec<u8> {
    // 64 entries make 16 blocks, so 0x11 is block 1 and 0x12 is block 2.
    let mut payload = codebook(64);
    payload.push(0x02); // padding
    payload.push(1);
    payload.push(2);
    payload.extend([0x11; 4]);
    payload.extend([0x12; 16]);
    payload.extend([0x11; 64]);
    payload
}

fn square_twiddled_mipmaps_alt_payload() -> Vec<u8> {
    let mut payload = vec![0x12; 6]; // padding
    payload.extend([0xFF; 2]);
    payload.extend([0x00, 0xF8].repeat(4));
    payload.extend([0x00; 32]);
    payload
}

fn with_index_chunk(magic: &[u8; 4], global_index: u32, texture: Vec<u8>) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.write_all(magic).unwrap();
    buf.write_u32::<LittleEndian>(8).unwrap();
    buf.write_u32::<LittleEndian>(global_index).unwrap();
    buf.write_u32::<LittleEndian>(0).unwrap();
    buf.extend(texture);
    buf
}

#[test]
fn test_decode_white_square() {
    let file = pvrt(0x01, 0x01, 4, 4, &[0xFF; 32]);
    let mut decoder = TextureDecoder::new(file).unwrap();

    assert_eq!(decoder.width(), 4);
    assert_eq!(decoder.height(), 4);
    assert_eq!(decoder.pixel_format(), Some(PixelFormat::Rgb565));
    assert_eq!(decoder.data_format(), Some(DataFormat::SquareTwiddled));
    assert_eq!(decoder.global_index(), None);
    assert!(!decoder.is_compressed());
    assert!(!decoder.is_decoded());

    let image = decoder.decode().unwrap();
    assert_eq!(image.dimensions(), (4, 4));
    assert!(image.pixels().all(|p| *p == WHITE));
    assert!(decoder.is_decoded());
    assert!(decoder.as_decoded().is_some());
}

#[rstest]
#[case(b"GBIX")]
#[case(b"GCIX")]
fn test_global_index(#[case] magic: &[u8; 4]) {
    let file = with_index_chunk(magic, 1234, pvrt(0x01, 0x09, 4, 4, &[0; 32]));
    let decoder = TextureDecoder::new(file).unwrap();
    assert_eq!(decoder.global_index(), Some(1234));

    let image = decoder.into_decoded().unwrap();
    assert!(image.pixels().all(|p| *p == Rgba([0, 0, 0, 0xFF])));
}

#[test]
fn test_unknown_codes_keep_header_readable() {
    let file = pvrt(0x05, 0x0A, 8, 8, &[0; 128]);
    let mut decoder = TextureDecoder::new(file).unwrap();

    assert_eq!(decoder.width(), 8);
    assert_eq!(decoder.pixel_format(), None);
    assert_eq!(decoder.pixel_format_code(), 0x05);
    assert_eq!(decoder.data_format(), None);
    assert_eq!(decoder.data_format_code(), 0x0A);
    assert_eq!(decoder.mipmap_count(), 0);
    assert!(matches!(
        decoder.decode(),
        Err(TextureDecodeError::UnsupportedCodec(
            UnsupportedFormat::UnknownDataFormat(0x0A)
        ))
    ));
}

#[rstest]
#[case(0x03, 0x01, UnsupportedFormat::PixelFormat(PixelFormat::Yuv422))]
#[case(0x04, 0x01, UnsupportedFormat::PixelFormat(PixelFormat::Bump))]
#[case(0x01, 0x0B, UnsupportedFormat::DataFormat(DataFormat::RectangleStride))]
fn test_recognized_but_unsupported(
    #[case] pixel_format: u8,
    #[case] data_format: u8,
    #[case] expected: UnsupportedFormat,
) {
    let file = pvrt(pixel_format, data_format, 4, 4, &[0; 32]);
    let mut decoder = TextureDecoder::new(file).unwrap();
    assert!(decoder.pixel_format().is_some());
    assert!(decoder.data_format().is_some());
    assert!(matches!(
        decoder.decode(),
        Err(TextureDecodeError::UnsupportedCodec(format)) if format == expected
    ));
}

#[test]
fn test_format_mismatch() {
    assert!(matches!(
        TextureDecoder::new(b"not a texture at all".to_vec()),
        Err(TextureDecodeError::FormatMismatch)
    ));
    assert!(matches!(
        TextureDecoder::new(Vec::new()),
        Err(TextureDecodeError::FormatMismatch)
    ));
    assert!(matches!(
        TextureDecoder::new(b"PVRT\x28\0\0\0\x01".to_vec()),
        Err(TextureDecodeError::FormatMismatch)
    ));

    // More data than the chunk declares.
    let mut file = pvrt(0x01, 0x01, 4, 4, &[0xFF; 32]);
    file.extend([0; 8]);
    assert!(matches!(
        TextureDecoder::new(file),
        Err(TextureDecodeError::FormatMismatch)
    ));

    let file = pvrt(0x01, 0x01, 0, 4, &[]);
    assert!(matches!(
        TextureDecoder::new(file),
        Err(TextureDecodeError::FormatMismatch)
    ));
}

#[test]
fn test_truncated() {
    let mut file = pvrt(0x01, 0x01, 4, 4, &[0xFF; 32]);
    file.truncate(36);
    assert!(matches!(
        TextureDecoder::new(file),
        Err(TextureDecodeError::TruncatedData {
            expected: 48,
            actual: 36
        })
    ));
}

#[test]
fn test_short_surface_is_truncated() {
    // The chunk length agrees with the data, but the data is too short for a 8x8 texture.
    let file = pvrt(0x01, 0x01, 8, 8, &[0xFF; 32]);
    let mut decoder = TextureDecoder::new(file).unwrap();
    assert!(matches!(
        decoder.decode(),
        Err(TextureDecodeError::TruncatedData {
            expected: 128,
            actual: 32
        })
    ));
}

#[test]
fn test_external_palette_two_phase() {
    let file = pvrt(0x00, 0x05, 4, 4, &[0x10, 0x32, 0x54, 0x76, 0x98, 0xBA, 0xDC, 0xFE]);
    let mut decoder = TextureDecoder::new(file).unwrap();
    assert!(decoder.needs_external_palette());
    assert_eq!(decoder.palette_entries(), 16);

    assert!(matches!(
        decoder.decode(),
        Err(TextureDecodeError::MissingExternalPalette {
            entries: 16,
            pixel_format: Some(PixelFormat::Argb1555)
        })
    ));

    decoder.set_palette(Palette::grayscale(8));
    assert!(matches!(
        decoder.decode(),
        Err(TextureDecodeError::PaletteMismatch {
            expected: 16,
            actual: 8
        })
    ));

    let palette = Palette::grayscale(16);
    decoder.set_palette(palette.clone());
    let image = decoder.decode().unwrap();

    // Twiddled offset t holds index t, so (0, 0) is 0 and (1, 1) is 3.
    assert_eq!(Some(*image.get_pixel(0, 0)), palette.get(0));
    assert_eq!(Some(*image.get_pixel(0, 1)), palette.get(1));
    assert_eq!(Some(*image.get_pixel(1, 0)), palette.get(2));
    assert_eq!(Some(*image.get_pixel(1, 1)), palette.get(3));
    assert_eq!(Some(*image.get_pixel(3, 3)), palette.get(15));
}

#[test]
fn test_palette_file_round_trip_into_decoder() {
    let palette = Palette::new((0..256).map(|i| Rgba([i as u8, 0, 0, 0xFF])).collect());
    let palette_file = PaletteEncoder::new(&palette, PixelFormat::Argb8888)
        .unwrap()
        .encode()
        .unwrap();

    let file = pvrt(0x06, 0x07, 4, 4, &[7; 16]);
    let mut decoder = TextureDecoder::new(file).unwrap();
    decoder.set_palette(PaletteDecoder::new(&palette_file).unwrap().decode().unwrap());

    let image = decoder.decode().unwrap();
    assert!(image.pixels().all(|p| *p == Rgba([7, 0, 0, 0xFF])));
}

#[test]
fn test_vq_codebook_is_embedded() {
    // Codebook entry 2 is white, everything else black.
    let mut payload = vec![0u8; 1024 * 2];
    payload[2 * 8..3 * 8].fill(0xFF);
    payload.extend([2, 0, 0, 2]);

    let file = pvrt(0x01, 0x03, 4, 4, &payload);
    let mut decoder = TextureDecoder::new(file).unwrap();
    assert!(!decoder.needs_external_palette());
    assert_eq!(decoder.palette_entries(), 1024);

    let image = decoder.decode().unwrap();
    for (x, y, p) in image.enumerate_pixels() {
        // Blocks (0, 0) and (1, 1) use entry 2.
        let expected = if (x < 2) == (y < 2) {
            WHITE
        } else {
            Rgba([0, 0, 0, 0xFF])
        };
        assert_eq!(*p, expected, "pixel ({x}, {y})");
    }
}

#[test]
fn test_mipmap_levels() {
    // 2 bytes of padding, 1x1, 2x2, then the main surface.
    let mut payload = vec![0u8; 2];
    payload.extend([0xFF; 2]);
    payload.extend([0x00; 8]);
    payload.extend([0xFF; 32]);

    let file = pvrt(0x01, 0x02, 4, 4, &payload);
    let mut decoder = TextureDecoder::new(file).unwrap();
    assert_eq!(decoder.mipmap_count(), 2);

    let smallest = decoder.decode_mipmap(0).unwrap().unwrap();
    assert_eq!(smallest.dimensions(), (1, 1));
    assert_eq!(*smallest.get_pixel(0, 0), WHITE);

    let level = decoder.decode_mipmap(1).unwrap().unwrap();
    assert_eq!(level.dimensions(), (2, 2));
    assert!(level.pixels().all(|p| *p == Rgba([0, 0, 0, 0xFF])));

    assert!(decoder.decode_mipmap(2).unwrap().is_none());
    assert!(decoder.decode().unwrap().pixels().all(|p| *p == WHITE));
}

#[rstest]
#[case(0x04, 4, 1024, vq_mipmaps_payload(), vec![WHITE, RED], WHITE)]
#[case(0x11, 16, 64, small_vq_mipmaps_payload(), vec![WHITE, RED, WHITE, RED], WHITE)]
#[case(0x12, 4, 0, square_twiddled_mipmaps_alt_payload(), vec![WHITE, RED], BLACK)]
fn test_mipmap_chain_layouts(
    #[case] data_format: u8,
    #[case] width: u16,
    #[case] palette_entries: usize,
    #[case] payload: Vec<u8>,
    #[case] levels: Vec<Rgba<u8>>,
    #[case] main: Rgba<u8>,
) {
    let file = pvrt(0x01, data_format, width, width, &payload);
    let mut decoder = TextureDecoder::new(file).unwrap();
    assert!(!decoder.is_compressed());
    assert!(!decoder.needs_external_palette());
    assert_eq!(decoder.palette_entries(), palette_entries);
    assert_eq!(decoder.mipmap_count(), levels.len());

    for (level, color) in levels.iter().enumerate() {
        let image = decoder.decode_mipmap(level).unwrap().unwrap();
        let size = 1 << level;
        assert_eq!(image.dimensions(), (size, size));
        assert!(
            image.pixels().all(|p| p == color),
            "level {level} should be {color:?}"
        );
    }
    assert!(decoder.decode_mipmap(levels.len()).unwrap().is_none());

    let image = decoder.decode().unwrap();
    assert_eq!(image.dimensions(), (width.into(), width.into()));
    assert!(image.pixels().all(|p| *p == main));
}

#[rstest]
#[case(8, 64)]
#[case(32, 128)]
#[case(64, 512)]
fn test_small_vq_codebook_tiers(#[case] width: u16, #[case] entries: usize) {
    // The index of block 1 plus the amount of blocks, which only lands on block 1 if the
    // codebook has the expected size.
    let index = (entries / 4 + 1) as u8;
    let mut payload = codebook(entries);
    payload.extend(vec![index; width as usize * width as usize / 4]);

    let file = pvrt(0x01, 0x10, width, width, &payload);
    let mut decoder = TextureDecoder::new(file).unwrap();
    assert_eq!(decoder.palette_entries(), entries);
    assert_eq!(decoder.mipmap_count(), 0);
    assert!(decoder.decode().unwrap().pixels().all(|p| *p == WHITE));
}

#[test]
fn test_mipmaps_keep_raw_data() {
    let file = pvrt(0x01, 0x12, 4, 4, &square_twiddled_mipmaps_alt_payload());
    let mut decoder = TextureDecoder::new(file).unwrap();

    let mipmaps = decoder.mipmaps().unwrap();
    assert_eq!(mipmaps.len(), 2);
    assert_eq!(mipmaps[0].size(), 1);
    assert_eq!(mipmaps[0].raw_data(), [0xFF, 0xFF]);
    assert_eq!((mipmaps[1].width(), mipmaps[1].height()), (2, 2));
    assert_eq!(mipmaps[1].raw_data().len(), 8);
    assert!(mipmaps.iter().all(|mipmap| !mipmap.is_decoded()));

    decoder.decode_mipmap(1).unwrap();
    let mipmaps = decoder.mipmaps().unwrap();
    assert!(!mipmaps[0].is_decoded());
    let level = mipmaps[1].as_decoded().unwrap();
    assert!(level.pixels().all(|p| *p == RED));
}

#[test]
fn test_plain_data_starting_with_its_length() {
    // The first pixel happens to read as the 32 bytes the surface takes up.
    let mut payload = vec![32, 0, 0, 0];
    payload.extend([0xFF; 28]);

    let file = pvrt(0x01, 0x09, 4, 4, &payload);
    let mut decoder = TextureDecoder::new(file).unwrap();
    assert!(!decoder.is_compressed());

    let image = decoder.decode().unwrap();
    assert_eq!(*image.get_pixel(2, 0), WHITE);
    assert_eq!(*image.get_pixel(1, 0), BLACK);
}
