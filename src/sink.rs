use std::io::{self, Write};

/// Destination for compressed bytes.
///
/// The encoder hands over its staging buffer in runs of at most 4096 bytes;
/// the sink must copy or consume the slice before returning. Returning
/// `false` latches the encoder's failure flag and silences all further
/// output.
pub trait OutputSink {
    /// Accept `buf`. Returns `false` on failure (e.g. out of space).
    fn put_buf(&mut self, buf: &[u8]) -> bool;
}

/// Growable heap-backed sink.
///
/// Capacity doubles (from a floor of 128 bytes) until the incoming run fits;
/// allocation failure is reported to the encoder instead of aborting.
#[derive(Debug, Default)]
pub struct VecSink {
    buf: Vec<u8>,
}

impl VecSink {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Take ownership of the accumulated output.
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl OutputSink for VecSink {
    fn put_buf(&mut self, buf: &[u8]) -> bool {
        let needed = self.buf.len() + buf.len();
        if needed > self.buf.capacity() {
            let mut target = self.buf.capacity().max(128);
            while target < needed {
                target *= 2;
            }
            if self.buf.try_reserve_exact(target - self.buf.len()).is_err() {
                return false;
            }
        }
        self.buf.extend_from_slice(buf);
        true
    }
}

/// Fixed-capacity sink over a caller-provided byte buffer.
///
/// Refuses the write (and thereby fails the stream) once the buffer would
/// overflow.
#[derive(Debug)]
pub struct SliceSink<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, len: 0 }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

impl OutputSink for SliceSink<'_> {
    fn put_buf(&mut self, buf: &[u8]) -> bool {
        let end = self.len + buf.len();
        if end > self.buf.len() {
            return false;
        }
        self.buf[self.len..end].copy_from_slice(buf);
        self.len = end;
        true
    }
}

/// Adapter driving any `std::io::Write`.
///
/// The first write error is stored and every later `put_buf` fails fast;
/// recover it with [`IoSink::take_error`] to report the underlying cause.
#[derive(Debug)]
pub struct IoSink<W> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> IoSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, error: None }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// The stored write error, if any.
    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> OutputSink for IoSink<W> {
    fn put_buf(&mut self, buf: &[u8]) -> bool {
        if self.error.is_some() {
            return false;
        }
        match self.writer.write_all(buf) {
            Ok(()) => true,
            Err(e) => {
                self.error = Some(e);
                false
            }
        }
    }
}
