use crate::bits::BitSink;
use crate::checksum::Adler32;
use crate::error::{Error, Result};
use crate::sink::OutputSink;

use super::dictionary::{Dictionary, DICT_SIZE, DICT_SIZE_MASK, HASH_SIZE};
use super::huffman::{
    pack_code_sizes, HuffmanTables, MAX_HUFF_SYMBOLS, NUM_CL_SYMBOLS, NUM_DIST_SYMBOLS,
    NUM_LIT_SYMBOLS,
};
use super::lz_buffer::{LzBuffer, Record};
use super::tables::{
    CODE_LENGTH_ORDER, LARGE_DIST_SYM, LARGE_DIST_EXTRA, LEN_EXTRA, LEN_SYM, SMALL_DIST_EXTRA,
    SMALL_DIST_SYM,
};
use super::{MAX_MATCH_LEN, MIN_MATCH_LEN};

/// Code length ceiling for the literal/length and distance tables.
const MAX_CODE_SIZE: usize = 15;
/// Code length ceiling for the code-length table.
const MAX_CL_CODE_SIZE: usize = 7;

/// Matches at least this long are taken immediately, skipping the lazy peek.
const GOOD_MATCH_LEN: usize = 64;

/// A minimum-length match this far back costs more than three literals on
/// most inputs; drop it.
const SHORT_MATCH_MAX_DIST: usize = 12288;

/// Blocks carrying fewer source bytes than this are cheaper with the RFC
/// fixed code than with a dynamic header.
const STATIC_BLOCK_MAX_SRC_BYTES: usize = 48;

/// Encoder tuning and framing options.
#[derive(Clone, Copy, Debug)]
pub struct CompressorConfig {
    /// Hash-chain probes per parse position, clamped to 1..=4095. Higher
    /// values trade speed for ratio; 100 is a reasonable middle ground.
    pub max_probes: u16,
    /// Take every acceptable match immediately instead of peeking one byte
    /// ahead for a longer one.
    pub greedy_parsing: bool,
    /// Wrap the stream per RFC 1950: `78 01` header and big-endian Adler-32
    /// trailer. Off means raw RFC 1951 data.
    pub zlib_wrapper: bool,
    /// Skip the hash-chain wipe when re-initialising an encoder. Parsing
    /// may then follow chains left by the previous stream, so identical
    /// input no longer guarantees identical output; the stream itself stays
    /// conformant.
    pub retain_hash_state: bool,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            max_probes: 100,
            greedy_parsing: false,
            zlib_wrapper: true,
            retain_hash_state: false,
        }
    }
}

/// Streaming DEFLATE encoder.
///
/// All working state lives inline: the sliding window and its hash chains,
/// the intermediate LZ record buffer, three Huffman tables and the output
/// staging buffer, roughly 190 KiB in total with no heap allocation. The
/// one-shot helpers in the crate root box their encoder; long-lived
/// instances usually want the same.
///
/// Feed input with [`compress`](Self::compress) in chunks of any size
/// (chunk boundaries never affect the output), then terminate the stream
/// with [`finish`](Self::finish), which recovers the sink. A finished
/// encoder refuses further input until [`init`](Self::init) is called again.
pub struct Compressor<S> {
    sink: Option<S>,
    max_probes: u32,
    greedy: bool,
    zlib: bool,

    bits: BitSink,
    dict: Dictionary,
    lz: LzBuffer,
    huff: HuffmanTables,
    adler: Adler32,

    /// Window index of the next byte to parse
    lookahead_pos: usize,
    /// Buffered not-yet-parsed bytes (0..=258)
    lookahead_size: usize,
    /// Valid history behind the lookahead (0..=32768)
    dict_size: usize,
    /// Source bytes recorded into the current block
    block_src_bytes: usize,

    saved_match_dist: usize,
    saved_match_len: usize,
    saved_lit: u8,
}

impl<S: OutputSink> Compressor<S> {
    pub fn new(sink: S, config: CompressorConfig) -> Self {
        let mut comp = Self {
            sink: None,
            max_probes: 1,
            greedy: false,
            zlib: false,
            bits: BitSink::new(),
            dict: Dictionary::new(),
            lz: LzBuffer::new(),
            huff: HuffmanTables::new(),
            adler: Adler32::new(),
            lookahead_pos: 0,
            lookahead_size: 0,
            dict_size: 0,
            block_src_bytes: 0,
            saved_match_dist: 0,
            saved_match_len: 0,
            saved_lit: 0,
        };
        comp.init(sink, config);
        comp
    }

    /// Reset the encoder for a new stream. Behaves exactly like a freshly
    /// constructed encoder unless `retain_hash_state` is set.
    pub fn init(&mut self, mut sink: S, config: CompressorConfig) {
        self.max_probes = config.max_probes.clamp(1, 4095) as u32;
        self.greedy = config.greedy_parsing;
        self.zlib = config.zlib_wrapper;

        self.bits.reset();
        self.lz.reset();
        if !config.retain_hash_state {
            self.dict.reset_chains();
        }
        self.adler = Adler32::new();
        self.lookahead_pos = 0;
        self.lookahead_size = 0;
        self.dict_size = 0;
        self.block_src_bytes = 0;
        self.saved_match_dist = 0;
        self.saved_match_len = 0;
        self.saved_lit = 0;

        if self.zlib {
            // CMF/FLG: 32 KiB window, no preset dictionary, FCHECK makes the
            // big-endian pair a multiple of 31
            self.bits.put_bits(0x78, 8, &mut sink);
            self.bits.put_bits(0x01, 8, &mut sink);
        }
        self.sink = Some(sink);
    }

    /// Compress one chunk of input.
    pub fn compress(&mut self, data: &[u8]) -> Result<()> {
        let mut sink = self.sink.take().ok_or(Error::Finished)?;
        if !self.bits.all_writes_ok() {
            self.sink = Some(sink);
            return Err(Error::SinkRejected);
        }
        if self.zlib {
            self.adler.update(data);
        }
        self.drive(Some(data), &mut sink);
        self.sink = Some(sink);
        if self.bits.all_writes_ok() {
            Ok(())
        } else {
            Err(Error::SinkRejected)
        }
    }

    /// Terminate the stream: drain the lookahead, emit the final block,
    /// byte-align, append the Adler-32 trailer in zlib mode and hand back
    /// the sink. The encoder is inert afterwards until `init`.
    pub fn finish(&mut self) -> Result<S> {
        let mut sink = self.sink.take().ok_or(Error::Finished)?;
        if !self.bits.all_writes_ok() {
            self.sink = Some(sink);
            return Err(Error::SinkRejected);
        }

        self.drive(None, &mut sink);
        if self.saved_match_len > 0 {
            let (len, dist) = (self.saved_match_len, self.saved_match_dist);
            self.saved_match_len = 0;
            self.record_match(len, dist, &mut sink);
        }
        self.flush_block(true, &mut sink);

        if self.zlib {
            let mut adler = self.adler.value();
            for _ in 0..4 {
                self.bits.put_bits((adler >> 24) & 0xFF, 8, &mut sink);
                adler <<= 8;
            }
        }
        self.bits.flush_scratch(&mut sink);

        if self.bits.all_writes_ok() {
            Ok(sink)
        } else {
            // Keep the sink reachable so the caller can ask it what failed
            self.sink = Some(sink);
            Err(Error::SinkRejected)
        }
    }

    /// False once any sink write has been refused; the stream is then
    /// truncated beyond repair and the encoder only emits no-ops.
    pub fn all_writes_succeeded(&self) -> bool {
        self.bits.all_writes_ok()
    }

    pub fn sink(&self) -> Option<&S> {
        self.sink.as_ref()
    }

    pub fn sink_mut(&mut self) -> Option<&mut S> {
        self.sink.as_mut()
    }

    /// Dictionary fill and parse loop. `data == None` drains the lookahead
    /// for the final block.
    fn drive(&mut self, data: Option<&[u8]>, sink: &mut S) {
        let finishing = data.is_none();
        let mut src = data.unwrap_or(&[]);

        while !src.is_empty() || (finishing && self.lookahead_size > 0) {
            // Top the lookahead up to MAX_MATCH_LEN, inserting a hash-chain
            // entry for every completed triplet.
            if self.lookahead_size >= MIN_MATCH_LEN - 1 {
                // Rolling-hash path: two bytes of context already exist.
                let mut dst_pos = (self.lookahead_pos + self.lookahead_size) & DICT_SIZE_MASK;
                let mut ins_pos = dst_pos.wrapping_sub(2) & DICT_SIZE_MASK;
                let mut hash = ((self.dict.byte(ins_pos) as usize) << 4)
                    ^ self.dict.byte((ins_pos + 1) & DICT_SIZE_MASK) as usize;

                let n = src.len().min(MAX_MATCH_LEN - self.lookahead_size);
                let (chunk, rest) = src.split_at(n);
                src = rest;
                self.lookahead_size += n;

                for &c in chunk {
                    self.dict.store(dst_pos, c);
                    hash = ((hash << 4) ^ c as usize) & (HASH_SIZE - 1);
                    self.dict.insert(ins_pos, hash);
                    dst_pos = (dst_pos + 1) & DICT_SIZE_MASK;
                    ins_pos = (ins_pos + 1) & DICT_SIZE_MASK;
                }
            } else {
                // Startup path: hash whole triplets once enough bytes exist.
                while !src.is_empty() && self.lookahead_size < MAX_MATCH_LEN {
                    let c = src[0];
                    src = &src[1..];
                    let dst_pos = (self.lookahead_pos + self.lookahead_size) & DICT_SIZE_MASK;
                    self.dict.store(dst_pos, c);
                    self.lookahead_size += 1;
                    if self.lookahead_size >= MIN_MATCH_LEN {
                        let ins_pos = dst_pos.wrapping_sub(2) & DICT_SIZE_MASK;
                        let hash = (((self.dict.byte(ins_pos) as usize) << 8)
                            ^ ((self.dict.byte((ins_pos + 1) & DICT_SIZE_MASK) as usize) << 4)
                            ^ c as usize)
                            & (HASH_SIZE - 1);
                        self.dict.insert(ins_pos, hash);
                    }
                }
            }
            self.dict_size = self.dict_size.min(DICT_SIZE - self.lookahead_size);
            if !finishing && self.lookahead_size < MAX_MATCH_LEN {
                break;
            }

            // One lazy/greedy parse step.
            let mut len_to_move = 1usize;
            let mut cur_match_dist = 0usize;
            let mut cur_match_len =
                if self.saved_match_len > 0 { self.saved_match_len } else { MIN_MATCH_LEN - 1 };
            self.dict.find_match(
                self.lookahead_pos,
                self.dict_size,
                self.lookahead_size,
                &mut cur_match_dist,
                &mut cur_match_len,
                self.max_probes,
            );
            if cur_match_len == MIN_MATCH_LEN && cur_match_dist >= SHORT_MATCH_MAX_DIST {
                cur_match_dist = 0;
                cur_match_len = 0;
            }

            if self.saved_match_len > 0 {
                if cur_match_len > self.saved_match_len {
                    // The byte we deferred loses; emit it and move on to the
                    // longer match.
                    let lit = self.saved_lit;
                    self.record_literal(lit, sink);
                    if cur_match_len >= GOOD_MATCH_LEN {
                        self.record_match(cur_match_len, cur_match_dist, sink);
                        self.saved_match_len = 0;
                        len_to_move = cur_match_len;
                    } else {
                        self.saved_lit = self.dict.byte(self.lookahead_pos);
                        self.saved_match_dist = cur_match_dist;
                        self.saved_match_len = cur_match_len;
                    }
                } else {
                    let (len, dist) = (self.saved_match_len, self.saved_match_dist);
                    self.record_match(len, dist, sink);
                    // The match started one byte back
                    len_to_move = len - 1;
                    self.saved_match_len = 0;
                }
            } else if cur_match_dist == 0 {
                self.record_literal(self.dict.byte(self.lookahead_pos), sink);
            } else if self.greedy || cur_match_len >= GOOD_MATCH_LEN {
                self.record_match(cur_match_len, cur_match_dist, sink);
                len_to_move = cur_match_len;
            } else {
                self.saved_lit = self.dict.byte(self.lookahead_pos);
                self.saved_match_dist = cur_match_dist;
                self.saved_match_len = cur_match_len;
            }

            self.lookahead_pos = (self.lookahead_pos + len_to_move) & DICT_SIZE_MASK;
            debug_assert!(self.lookahead_size >= len_to_move);
            self.lookahead_size -= len_to_move;
            self.dict_size = (self.dict_size + len_to_move).min(DICT_SIZE);
        }
    }

    fn record_literal(&mut self, lit: u8, sink: &mut S) {
        self.block_src_bytes += 1;
        self.lz.push_literal(lit);
        if self.lz.nearly_full() {
            self.flush_block(false, sink);
        }
    }

    fn record_match(&mut self, len: usize, dist: usize, sink: &mut S) {
        self.block_src_bytes += len;
        self.lz.push_match(len, dist);
        if self.lz.nearly_full() {
            self.flush_block(false, sink);
        }
    }

    /// Emit one block: tally symbol frequencies, write the header for a
    /// dynamic (or, for tiny blocks, fixed) code, then re-walk the records
    /// writing codes and extra bits. The final block is zero-padded to a
    /// byte boundary.
    fn flush_block(&mut self, last_block: bool, sink: &mut S) {
        let sealed = self.lz.seal();

        self.huff.counts[0] = [0; MAX_HUFF_SYMBOLS];
        self.huff.counts[1] = [0; MAX_HUFF_SYMBOLS];
        for rec in self.lz.records(sealed) {
            match rec {
                Record::Literal(lit) => self.huff.counts[0][lit as usize] += 1,
                Record::Match { raw_len, raw_dist } => {
                    self.huff.counts[0][LEN_SYM[raw_len as usize] as usize] += 1;
                    let dist_sym = if raw_dist < 512 {
                        SMALL_DIST_SYM[raw_dist as usize]
                    } else {
                        LARGE_DIST_SYM[(raw_dist >> 8) as usize]
                    };
                    self.huff.counts[1][dist_sym as usize] += 1;
                }
            }
        }
        self.huff.counts[0][256] += 1;

        if self.block_src_bytes < STATIC_BLOCK_MAX_SRC_BYTES {
            self.start_static_block(last_block, sink);
        } else {
            self.start_dynamic_block(last_block, sink);
        }

        for rec in self.lz.records(sealed) {
            match rec {
                Record::Literal(lit) => {
                    let sym = lit as usize;
                    self.bits.put_bits(
                        self.huff.codes[0][sym] as u32,
                        self.huff.sizes[0][sym] as u32,
                        sink,
                    );
                }
                Record::Match { raw_len, raw_dist } => {
                    let len_sym = LEN_SYM[raw_len as usize] as usize;
                    let len_extra = LEN_EXTRA[raw_len as usize] as u32;
                    self.bits.put_bits(
                        self.huff.codes[0][len_sym] as u32,
                        self.huff.sizes[0][len_sym] as u32,
                        sink,
                    );
                    self.bits.put_bits(raw_len as u32 & ((1 << len_extra) - 1), len_extra, sink);

                    let (dist_sym, dist_extra) = if raw_dist < 512 {
                        (SMALL_DIST_SYM[raw_dist as usize], SMALL_DIST_EXTRA[raw_dist as usize])
                    } else {
                        let high = (raw_dist >> 8) as usize;
                        (LARGE_DIST_SYM[high], LARGE_DIST_EXTRA[high])
                    };
                    self.bits.put_bits(
                        self.huff.codes[1][dist_sym as usize] as u32,
                        self.huff.sizes[1][dist_sym as usize] as u32,
                        sink,
                    );
                    self.bits.put_bits(
                        raw_dist as u32 & ((1 << dist_extra) - 1),
                        dist_extra as u32,
                        sink,
                    );
                }
            }
        }
        self.bits.put_bits(self.huff.codes[0][256] as u32, self.huff.sizes[0][256] as u32, sink);

        if last_block {
            self.bits.align_to_byte(sink);
        }
        self.lz.reset();
        self.block_src_bytes = 0;
    }

    /// Fixed-code block header (RFC 1951 section 3.2.6); the code tables are
    /// rebuilt from the fixed lengths so the shared emit pass applies.
    fn start_static_block(&mut self, last_block: bool, sink: &mut S) {
        let lit_sizes = &mut self.huff.sizes[0];
        lit_sizes[..144].fill(8);
        lit_sizes[144..256].fill(9);
        lit_sizes[256..280].fill(7);
        lit_sizes[280..288].fill(8);
        self.huff.sizes[1][..NUM_DIST_SYMBOLS].fill(5);

        self.huff.rebuild_from_sizes(0, NUM_LIT_SYMBOLS, MAX_CODE_SIZE);
        self.huff.rebuild_from_sizes(1, NUM_DIST_SYMBOLS, MAX_CODE_SIZE);

        self.bits.put_bits(last_block as u32, 1, sink);
        self.bits.put_bits(1, 2, sink);
    }

    /// Dynamic block header: build both code tables, then the code-length
    /// code over their RLE-packed sizes, and write the whole preamble.
    fn start_dynamic_block(&mut self, last_block: bool, sink: &mut S) {
        self.huff.optimize_table(0, NUM_LIT_SYMBOLS, MAX_CODE_SIZE);
        self.huff.optimize_table(1, NUM_DIST_SYMBOLS, MAX_CODE_SIZE);

        let mut num_lit_codes = 286;
        while num_lit_codes > 257 && self.huff.sizes[0][num_lit_codes - 1] == 0 {
            num_lit_codes -= 1;
        }
        let mut num_dist_codes = 30;
        while num_dist_codes > 1 && self.huff.sizes[1][num_dist_codes - 1] == 0 {
            num_dist_codes -= 1;
        }

        let mut sizes_to_pack = [0u8; NUM_LIT_SYMBOLS + NUM_DIST_SYMBOLS];
        sizes_to_pack[..num_lit_codes].copy_from_slice(&self.huff.sizes[0][..num_lit_codes]);
        sizes_to_pack[num_lit_codes..num_lit_codes + num_dist_codes]
            .copy_from_slice(&self.huff.sizes[1][..num_dist_codes]);
        let total_sizes = num_lit_codes + num_dist_codes;

        self.huff.counts[2] = [0; MAX_HUFF_SYMBOLS];
        let packed = pack_code_sizes(&sizes_to_pack[..total_sizes], &mut self.huff.counts[2]);
        self.huff.optimize_table(2, NUM_CL_SYMBOLS, MAX_CL_CODE_SIZE);

        self.bits.put_bits(last_block as u32, 1, sink);
        self.bits.put_bits(2, 2, sink);
        self.bits.put_bits((num_lit_codes - 257) as u32, 5, sink);
        self.bits.put_bits((num_dist_codes - 1) as u32, 5, sink);

        let mut num_cl_lengths = 0;
        for i in (0..NUM_CL_SYMBOLS).rev() {
            if self.huff.sizes[2][CODE_LENGTH_ORDER[i]] != 0 {
                num_cl_lengths = i + 1;
                break;
            }
        }
        let num_cl_lengths = num_cl_lengths.max(4);
        self.bits.put_bits((num_cl_lengths - 4) as u32, 4, sink);
        for &sym in CODE_LENGTH_ORDER.iter().take(num_cl_lengths) {
            self.bits.put_bits(self.huff.sizes[2][sym] as u32, 3, sink);
        }

        let packed_bytes = packed.as_bytes();
        let mut i = 0;
        while i < packed_bytes.len() {
            let sym = packed_bytes[i] as usize;
            i += 1;
            debug_assert!(sym < NUM_CL_SYMBOLS);
            self.bits.put_bits(
                self.huff.codes[2][sym] as u32,
                self.huff.sizes[2][sym] as u32,
                sink,
            );
            let extra = match sym {
                16 => 2,
                17 => 3,
                18 => 7,
                _ => 0,
            };
            if extra > 0 {
                self.bits.put_bits(packed_bytes[i] as u32, extra, sink);
                i += 1;
            }
        }
    }
}
