//! Minimal PNG writer: a thin consumer of the zlib encoder.
//!
//! Scanlines are stored unfiltered (filter type 0); compression comes
//! entirely from the DEFLATE layer, which is usually adequate for the
//! screenshots-and-test-images use case this targets.

use crate::deflate::{Compressor, CompressorConfig};
use crate::error::{Error, Result};
use crate::sink::VecSink;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Encode 8-bit pixels as a complete PNG file.
///
/// `channels` selects the color type: 1 = grayscale, 2 = grayscale+alpha,
/// 3 = RGB, 4 = RGBA. `pixels` is row-major, `width * height * channels`
/// bytes.
pub fn encode(pixels: &[u8], width: u32, height: u32, channels: u8) -> Result<Vec<u8>> {
    let color_type = match channels {
        1 => 0u8,
        2 => 4,
        3 => 2,
        4 => 6,
        n => return Err(Error::UnsupportedChannels(n)),
    };
    if width == 0 || height == 0 {
        return Err(Error::EmptyImage);
    }
    let row_bytes = width as usize * channels as usize;
    let expected = row_bytes * height as usize;
    if pixels.len() != expected {
        return Err(Error::PixelBufferMismatch {
            got: pixels.len(),
            expected,
            width,
            height,
            channels,
        });
    }

    // IDAT payload: zlib stream over filter-byte-prefixed scanlines.
    let sink = VecSink::with_capacity(expected / 2 + 64);
    let mut comp = Box::new(Compressor::new(sink, CompressorConfig::default()));
    for row in pixels.chunks(row_bytes) {
        comp.compress(&[0])?;
        comp.compress(row)?;
    }
    let idat = comp.finish()?.into_vec();

    let mut out = Vec::with_capacity(idat.len() + 64);
    out.extend_from_slice(&PNG_SIGNATURE);

    let mut ihdr = [0u8; 13];
    ihdr[..4].copy_from_slice(&width.to_be_bytes());
    ihdr[4..8].copy_from_slice(&height.to_be_bytes());
    ihdr[8] = 8; // bit depth
    ihdr[9] = color_type;
    // compression, filter and interlace methods stay 0
    write_chunk(&mut out, b"IHDR", &ihdr);
    write_chunk(&mut out, b"IDAT", &idat);
    write_chunk(&mut out, b"IEND", &[]);
    Ok(out)
}

/// Length-prefixed chunk with a CRC-32 over type and data.
fn write_chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(kind);
    hasher.update(data);
    out.extend_from_slice(&hasher.finalize().to_be_bytes());
}
