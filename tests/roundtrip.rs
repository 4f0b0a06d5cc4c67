//! End-to-end tests for the streamflate encoder.
//!
//! flate2 plays the conforming RFC 1950/1951 reference decoder; every
//! compressed stream must survive the round trip bit-exactly.

use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

use streamflate::{adler32, compress_to_vec, png, Compressor, CompressorConfig, VecSink};

// ============================================================================
// Test Data Generators
// ============================================================================

/// Deterministic xorshift PRNG data
fn generate_random_data(size: usize, seed: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut state = seed;
    for _ in 0..size {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        data.push((state & 0xFF) as u8);
    }
    data
}

/// Highly repetitive data (compresses extremely well)
fn generate_repetitive_data(size: usize) -> Vec<u8> {
    let pattern = b"AAAAAAAAAAAAAAAA";
    pattern.iter().cycle().take(size).copied().collect()
}

/// Mixed pattern data: compressible, with enough variety to exercise many
/// symbols
fn generate_mixed_data(size: usize) -> Vec<u8> {
    let patterns = [
        b"the quick brown fox ".as_slice(),
        b"0123456789abcdef".as_slice(),
        b"\x00\x00\x00\x00\x01\x01\x01\x01".as_slice(),
    ];
    let mut data = Vec::with_capacity(size);
    let mut i = 0;
    while data.len() < size {
        let pattern = patterns[i % patterns.len()];
        let take = pattern.len().min(size - data.len());
        data.extend_from_slice(&pattern[..take]);
        i += 1;
    }
    data
}

fn inflate_zlib(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

fn inflate_raw(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    DeflateDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

fn assert_zlib_roundtrip(data: &[u8], config: CompressorConfig) -> Vec<u8> {
    let compressed = compress_to_vec(data, config).unwrap();
    assert_eq!(inflate_zlib(&compressed), data, "round trip mismatch");
    compressed
}

// ============================================================================
// Byte-exact and size-bounded scenarios
// ============================================================================

#[test]
fn test_empty_input_exact_bytes() {
    let out = compress_to_vec(&[], CompressorConfig::default()).unwrap();
    assert_eq!(out, [0x78, 0x01, 0x03, 0x00, 0x00, 0x00, 0x00, 0x01]);
}

#[test]
fn test_single_byte() {
    let out = assert_zlib_roundtrip(b"A", CompressorConfig::default());
    assert!(out.len() <= 11, "one-byte stream took {} bytes", out.len());
}

#[test]
fn test_single_zero_byte() {
    assert_zlib_roundtrip(&[0x00], CompressorConfig::default());
}

#[test]
fn test_ab_pairs_compress_small() {
    let data: Vec<u8> = b"AB".iter().cycle().take(1000).copied().collect();
    let out = assert_zlib_roundtrip(&data, CompressorConfig::default());
    assert!(out.len() < 200, "1000 bytes of ABAB took {} bytes", out.len());
}

#[test]
fn test_english_text_compresses_small() {
    let data = "The quick brown fox jumps over the lazy dog. ".repeat(100);
    let out = assert_zlib_roundtrip(data.as_bytes(), CompressorConfig::default());
    assert!(out.len() < 200, "repeated sentence took {} bytes", out.len());
}

#[test]
fn test_32k_identical_bytes() {
    let data = vec![0x41u8; 32768];
    let out = assert_zlib_roundtrip(&data, CompressorConfig::default());
    assert!(out.len() < 512, "32 KiB run took {} bytes", out.len());
}

#[test]
fn test_run_of_258_bytes() {
    // One literal followed by a single long match
    let data = vec![0x7Au8; 258];
    let out = assert_zlib_roundtrip(&data, CompressorConfig::default());
    assert!(out.len() < 64);
}

// ============================================================================
// Window and match-distance edges
// ============================================================================

#[test]
fn test_match_at_maximum_distance() {
    // A recognizable 64-byte block, ~32 KiB of unrelated data, then the
    // same block again: the repeat sits at the full window distance.
    let marker: Vec<u8> = (0..64u8).map(|i| i.wrapping_mul(37).wrapping_add(11)).collect();
    let mut data = marker.clone();
    data.extend_from_slice(&generate_random_data(32768 - 64, 99));
    data.extend_from_slice(&marker);
    assert_zlib_roundtrip(&data, CompressorConfig::default());
}

#[test]
fn test_window_wraparound_many_times() {
    // 200 KiB pushes the circular window through six wraps
    let data = generate_mixed_data(200 * 1024);
    assert_zlib_roundtrip(&data, CompressorConfig::default());
}

#[test]
fn test_multiple_blocks() {
    // Enough literal records to overflow the 24 KiB LZ buffer repeatedly,
    // forcing several non-final blocks
    let data = generate_random_data(100_000, 4242);
    assert_zlib_roundtrip(&data, CompressorConfig::default());
}

#[test]
fn test_random_data_does_not_blow_up() {
    let data = generate_random_data(24 * 1024 + 512, 7);
    let out = assert_zlib_roundtrip(&data, CompressorConfig::default());
    // Incompressible input may expand a little; it must stay bounded
    assert!(out.len() < data.len() + data.len() / 8 + 64);
}

// ============================================================================
// Chunk-boundary determinism
// ============================================================================

#[test]
fn test_chunked_input_matches_one_shot() {
    // 10 MiB, mostly long runs so the parser moves in large strides, with a
    // mixed tail to keep the lazy path honest
    let mut data = generate_repetitive_data(8 * 1024 * 1024);
    data.extend_from_slice(&generate_mixed_data(2 * 1024 * 1024));
    let whole = compress_to_vec(&data, CompressorConfig::default()).unwrap();

    let mut comp = Box::new(Compressor::new(VecSink::new(), CompressorConfig::default()));
    let chunk_sizes = [1usize, 7, 1024, 65536];
    let mut offset = 0;
    let mut i = 0;
    while offset < data.len() {
        let n = chunk_sizes[i % chunk_sizes.len()].min(data.len() - offset);
        comp.compress(&data[offset..offset + n]).unwrap();
        offset += n;
        i += 1;
    }
    let pieces = comp.finish().unwrap().into_vec();

    assert_eq!(whole, pieces);
    assert_eq!(inflate_zlib(&whole), data);
}

#[test]
fn test_byte_at_a_time_feed() {
    let data = b"compression one byte at a time still has to agree";
    let whole = compress_to_vec(data, CompressorConfig::default()).unwrap();

    let mut comp = Box::new(Compressor::new(VecSink::new(), CompressorConfig::default()));
    for &b in data.iter() {
        comp.compress(&[b]).unwrap();
    }
    assert_eq!(comp.finish().unwrap().into_vec(), whole);
}

// ============================================================================
// Parse modes and probe budgets
// ============================================================================

#[test]
fn test_greedy_and_lazy_on_random_data() {
    let data = generate_random_data(64 * 1024, 31337);
    assert_zlib_roundtrip(&data, CompressorConfig::default());
    assert_zlib_roundtrip(
        &data,
        CompressorConfig { greedy_parsing: true, ..Default::default() },
    );
}

#[test]
fn test_probe_extremes() {
    let data = generate_mixed_data(64 * 1024);
    for probes in [1u16, 2, 100, 4095] {
        let config = CompressorConfig { max_probes: probes, ..Default::default() };
        assert_zlib_roundtrip(&data, config);
    }
}

#[test]
fn test_more_probes_never_break_the_stream() {
    // Repetitive data builds the longest hash chains
    let data = generate_repetitive_data(128 * 1024);
    for probes in [1u16, 4095] {
        let config = CompressorConfig { max_probes: probes, ..Default::default() };
        assert_zlib_roundtrip(&data, config);
    }
}

// ============================================================================
// Framing
// ============================================================================

#[test]
fn test_zlib_framing() {
    let data = generate_mixed_data(5000);
    let out = assert_zlib_roundtrip(&data, CompressorConfig::default());
    assert_eq!(&out[..2], &[0x78, 0x01]);
    assert_eq!((out[0] as u32 * 256 + out[1] as u32) % 31, 0);
    let trailer = u32::from_be_bytes(out[out.len() - 4..].try_into().unwrap());
    assert_eq!(trailer, adler32(&data));
}

#[test]
fn test_raw_deflate_framing() {
    let data = generate_mixed_data(5000);
    let config = CompressorConfig { zlib_wrapper: false, ..Default::default() };
    let out = compress_to_vec(&data, config).unwrap();
    assert_eq!(inflate_raw(&out), data);
    // BFINAL=1, BTYPE=dynamic in the first three bits of a one-block stream
    assert_eq!(out[0] & 0x07, 0x05);
}

#[test]
fn test_raw_output_is_zlib_minus_framing() {
    let data = generate_mixed_data(3000);
    let zlib = compress_to_vec(&data, CompressorConfig::default()).unwrap();
    let raw = compress_to_vec(
        &data,
        CompressorConfig { zlib_wrapper: false, ..Default::default() },
    )
    .unwrap();
    assert_eq!(&zlib[2..zlib.len() - 4], &raw[..]);
}

// ============================================================================
// Encoder reuse
// ============================================================================

#[test]
fn test_reinit_is_deterministic() {
    let data = generate_mixed_data(40_000);
    let fresh = compress_to_vec(&data, CompressorConfig::default()).unwrap();

    let mut comp = Box::new(Compressor::new(VecSink::new(), CompressorConfig::default()));
    comp.compress(&data).unwrap();
    let first = comp.finish().unwrap().into_vec();

    comp.init(VecSink::new(), CompressorConfig::default());
    comp.compress(&data).unwrap();
    let second = comp.finish().unwrap().into_vec();

    assert_eq!(first, fresh);
    assert_eq!(second, fresh);
}

#[test]
fn test_retained_hash_state_still_conforms() {
    let first = generate_mixed_data(50_000);
    let second = generate_random_data(50_000, 555);

    let config = CompressorConfig { retain_hash_state: true, ..Default::default() };
    let mut comp = Box::new(Compressor::new(VecSink::new(), config));
    comp.compress(&first).unwrap();
    let _ = comp.finish().unwrap();

    // Stale chains from the first stream may steer parsing, but the second
    // stream must still decode exactly.
    comp.init(VecSink::new(), config);
    comp.compress(&second).unwrap();
    let out = comp.finish().unwrap().into_vec();
    assert_eq!(inflate_zlib(&out), second);
}

// ============================================================================
// PNG wrapper
// ============================================================================

#[test]
fn test_png_idat_decodes_to_filtered_scanlines() {
    // 2x2 RGB image
    let pixels = [255u8, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255];
    let file = png::encode(&pixels, 2, 2, 3).unwrap();

    // Walk chunks to find IDAT
    let mut pos = 8;
    let mut idat = Vec::new();
    while pos + 8 <= file.len() {
        let len = u32::from_be_bytes(file[pos..pos + 4].try_into().unwrap()) as usize;
        let kind = &file[pos + 4..pos + 8];
        let data = &file[pos + 8..pos + 8 + len];
        let crc = u32::from_be_bytes(file[pos + 8 + len..pos + 12 + len].try_into().unwrap());
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(kind);
        hasher.update(data);
        assert_eq!(crc, hasher.finalize(), "chunk CRC mismatch");
        if kind == b"IDAT" {
            idat.extend_from_slice(data);
        }
        pos += 12 + len;
    }
    assert_eq!(pos, file.len());

    let raw = inflate_zlib(&idat);
    // Two scanlines, each: filter byte 0 + 6 pixel bytes
    assert_eq!(raw.len(), 14);
    assert_eq!(raw[0], 0);
    assert_eq!(&raw[1..7], &pixels[..6]);
    assert_eq!(raw[7], 0);
    assert_eq!(&raw[8..14], &pixels[6..]);
}
