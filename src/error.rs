use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // I/O errors (io-backed sinks, CLI glue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Encoder lifecycle errors
    #[error("encoder already finished; call init() before writing more data")]
    Finished,

    #[error("output sink rejected a write; compressed stream is truncated")]
    SinkRejected,

    // PNG wrapper errors
    #[error("pixel buffer holds {got} bytes, expected {expected} for {width}x{height}x{channels}")]
    PixelBufferMismatch { got: usize, expected: usize, width: u32, height: u32, channels: u8 },

    #[error("unsupported channel count: {0} (expected 1, 2, 3 or 4)")]
    UnsupportedChannels(u8),

    #[error("image dimensions must be non-zero")]
    EmptyImage,
}

pub type Result<T> = std::result::Result<T, Error>;
