//! Adler-32 checksum (RFC 1950) for the zlib trailer.

/// Largest number of bytes that can be summed before `s2` must be reduced
/// modulo 65521 to avoid u32 overflow.
const NMAX: usize = 5552;

const MOD_ADLER: u32 = 65_521;

/// Streaming Adler-32 state.
///
/// Starts at 1 per RFC 1950; `value()` packs the running sums as
/// `(s2 << 16) | s1`.
#[derive(Clone, Copy, Debug)]
pub struct Adler32 {
    s1: u32,
    s2: u32,
}

impl Adler32 {
    pub fn new() -> Self {
        Self { s1: 1, s2: 0 }
    }

    /// Fold `data` into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        for chunk in data.chunks(NMAX) {
            for &b in chunk {
                self.s1 += b as u32;
                self.s2 += self.s1;
            }
            self.s1 %= MOD_ADLER;
            self.s2 %= MOD_ADLER;
        }
    }

    pub fn value(&self) -> u32 {
        (self.s2 << 16) | self.s1
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot Adler-32 of `data`.
pub fn adler32(data: &[u8]) -> u32 {
    let mut state = Adler32::new();
    state.update(data);
    state.value()
}
