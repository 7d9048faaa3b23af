//! Compression applied on top of the texture data.
//!
//! Some games store the data following the PVRT header compressed. The header is left
//! readable and its chunk length covers the stored block, which starts with the length of the
//! data once decompressed. A block is only taken as compressed when that leading length is
//! the one the texture's formats and dimensions call for.
//! The compression algorithm itself sits behind [`CompressionCodec`], so another one can be
//! plugged into [`crate::TextureDecoder`] and [`crate::TextureEncoder`].

use std::io::{Error, ErrorKind};

/// Compression formats the encoder can apply to the texture data.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CompressionFormat {
    /// The texture data is stored as is.
    #[default]
    None,
    /// The texture data is run-length encoded.
    Rle,
}

/// A byte stream transform used to compress the texture data.
pub trait CompressionCodec {
    /// Compresses `source`.
    fn compress(&self, source: &[u8]) -> std::io::Result<Vec<u8>>;

    /// Decompresses `source`, which was produced by [`Self::compress()`].
    fn decompress(&self, source: &[u8]) -> std::io::Result<Vec<u8>>;
}

/// Run-length encoding with PackBits control bytes.
///
/// A control byte `n` below 0x80 is followed by `n + 1` literal bytes. A control byte above
/// 0x80 is followed by a single byte repeated `257 - n` times. 0x80 is skipped.
#[derive(Debug, Default, Clone, Copy)]
pub struct RleCodec;

const MAX_RUN: usize = 128;

impl CompressionCodec for RleCodec {
    fn compress(&self, source: &[u8]) -> std::io::Result<Vec<u8>> {
        let mut dest = Vec::with_capacity(source.len() + source.len() / MAX_RUN + 1);
        let mut pos = 0;

        while pos < source.len() {
            let value = source[pos];
            let run = source[pos..]
                .iter()
                .take(MAX_RUN)
                .take_while(|&&b| b == value)
                .count();

            if run >= 2 {
                dest.push((257 - run) as u8);
                dest.push(value);
                pos += run;
                continue;
            }

            // Gather literals up to the start of the next run.
            let start = pos;
            pos += 1;
            while pos < source.len()
                && pos - start < MAX_RUN
                && !(pos + 1 < source.len() && source[pos] == source[pos + 1])
            {
                pos += 1;
            }

            dest.push((pos - start - 1) as u8);
            dest.extend_from_slice(&source[start..pos]);
        }

        Ok(dest)
    }

    fn decompress(&self, source: &[u8]) -> std::io::Result<Vec<u8>> {
        let truncated = || Error::new(ErrorKind::UnexpectedEof, "RLE stream ends mid record");

        let mut dest = Vec::with_capacity(source.len() * 2);
        let mut pos = 0;

        while pos < source.len() {
            let control = source[pos];
            pos += 1;

            match control {
                0..=0x7F => {
                    let count = control as usize + 1;
                    let literals = source.get(pos..pos + count).ok_or_else(truncated)?;
                    dest.extend_from_slice(literals);
                    pos += count;
                }
                0x80 => {}
                _ => {
                    let value = *source.get(pos).ok_or_else(truncated)?;
                    let count = 257 - control as usize;
                    dest.resize(dest.len() + count, value);
                    pos += 1;
                }
            }
        }

        Ok(dest)
    }
}
