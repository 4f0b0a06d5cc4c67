use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use streamflate::{Compressor, CompressorConfig, Error, IoSink};

#[derive(Parser, Debug)]
#[command(name = "streamflate")]
#[command(about = "Compress a file or stream to zlib or raw DEFLATE")]
#[command(version)]
struct Args {
    /// Input file (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Output file (use - for stdout)
    #[arg(short, long)]
    output: PathBuf,

    /// Match-finder probes per position (1=fastest, 4095=best ratio)
    #[arg(short = 'p', long, default_value = "100", value_parser = clap::value_parser!(u16).range(1..=4095))]
    probes: u16,

    /// Greedy parsing: faster, slightly worse ratio
    #[arg(long)]
    greedy: bool,

    /// Emit raw DEFLATE data without the zlib header and Adler-32 trailer
    #[arg(long)]
    raw: bool,

    /// Show compression statistics on stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Writer wrapper that counts bytes for the statistics epilogue
struct CountingWriter<W: Write> {
    inner: W,
    written: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type Sink = IoSink<CountingWriter<Box<dyn Write>>>;

/// Prefer the sink's stored io error over the generic latch error.
fn write_error(comp: &mut Compressor<Sink>, fallback: Error) -> Box<dyn std::error::Error> {
    match comp.sink_mut().and_then(|s| s.take_error()) {
        Some(io_err) => Box::new(io_err),
        None => Box::new(fallback),
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = CompressorConfig {
        max_probes: args.probes,
        greedy_parsing: args.greedy,
        zlib_wrapper: !args.raw,
        ..Default::default()
    };

    let mut input: Box<dyn Read> = if args.input.to_str() == Some("-") {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(File::open(&args.input)?))
    };

    let output: Box<dyn Write> = if args.output.to_str() == Some("-") {
        Box::new(io::stdout().lock())
    } else {
        Box::new(BufWriter::new(File::create(&args.output)?))
    };

    let start = Instant::now();
    let mut comp = Box::new(Compressor::new(IoSink::new(CountingWriter::new(output)), config));

    let mut buf = vec![0u8; 64 * 1024];
    let mut bytes_in = 0u64;
    loop {
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        bytes_in += n as u64;
        if let Err(e) = comp.compress(&buf[..n]) {
            return Err(write_error(&mut comp, e));
        }
    }

    let mut writer = match comp.finish() {
        Ok(sink) => sink.into_inner(),
        Err(e) => return Err(write_error(&mut comp, e)),
    };
    writer.flush()?;
    let elapsed = start.elapsed();

    if args.verbose {
        let ratio = if writer.written > 0 { bytes_in as f64 / writer.written as f64 } else { 0.0 };
        eprintln!("Compression complete:");
        eprintln!("  Input bytes:      {}", bytes_in);
        eprintln!("  Output bytes:     {}", writer.written);
        eprintln!("  Ratio:            {:.2}x", ratio);
        eprintln!("  Time:             {:.2?}", elapsed);
        eprintln!(
            "  Throughput:       {:.1} MB/s",
            bytes_in as f64 / elapsed.as_secs_f64() / 1_000_000.0
        );
    }

    Ok(())
}
