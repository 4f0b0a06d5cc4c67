//! Streaming DEFLATE (RFC 1951) and zlib (RFC 1950) encoder with a fixed
//! memory footprint: the whole encoder state is ~190 KiB of inline arrays
//! and never touches the heap. Heap use is confined to the optional sinks
//! and helpers.

pub mod checksum;
pub mod deflate;
pub mod error;
pub mod png;
pub mod sink;

mod bits;

pub use checksum::{adler32, Adler32};
pub use deflate::{Compressor, CompressorConfig, MAX_MATCH_LEN, MIN_MATCH_LEN};
pub use error::{Error, Result};
pub use sink::{IoSink, OutputSink, SliceSink, VecSink};

/// Compress `data` in one call, returning the compressed bytes.
pub fn compress_to_vec(data: &[u8], config: CompressorConfig) -> Result<Vec<u8>> {
    let sink = VecSink::with_capacity(32.max(data.len() / 2));
    let mut comp = Box::new(Compressor::new(sink, config));
    comp.compress(data)?;
    Ok(comp.finish()?.into_vec())
}

/// Compress `data` into a caller-provided buffer, returning the number of
/// bytes written. Fails with [`Error::SinkRejected`] if `out` is too small.
pub fn compress_to_slice(data: &[u8], out: &mut [u8], config: CompressorConfig) -> Result<usize> {
    let sink = SliceSink::new(out);
    let mut comp = Box::new(Compressor::new(sink, config));
    comp.compress(data)?;
    Ok(comp.finish()?.len())
}
