#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Read;
use streamflate::{compress_to_vec, CompressorConfig};

fuzz_target!(|data: &[u8]| {
    // Steer the parse mode and probe budget from the first byte so the
    // fuzzer explores both parser paths and shallow/deep searches.
    let (knob, payload) = match data.split_first() {
        Some((k, rest)) => (*k, rest),
        None => (0, data),
    };
    let config = CompressorConfig {
        max_probes: 1 + (knob as u16 & 0x3F) * 64,
        greedy_parsing: knob & 0x40 != 0,
        ..Default::default()
    };

    let compressed = compress_to_vec(payload, config).expect("compression cannot fail into a Vec");

    let mut decoded = Vec::new();
    flate2::read::ZlibDecoder::new(&compressed[..])
        .read_to_end(&mut decoded)
        .expect("output must be a valid zlib stream");
    assert_eq!(decoded, payload, "round trip mismatch");
});
