//! Streaming gzip → NDJSON decoding.
//!
//! `RecordDecoder` wraps any compressed byte stream and yields one `Decoded` item per
//! non-empty line. Decompression is incremental: only the read buffer and the current
//! line are held in memory. Multi-member gzip files (concatenated `.gz` chunks, as
//! produced by log shippers that append) are decoded as one stream.

use flate2::read::MultiGzDecoder;
use serde_json::{Map, Value};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// One decoded JSON object.
pub type LogRecord = Map<String, Value>;

/// Why a line (or the rest of a stream) produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The line is not a JSON object. Decoding continues with the next line.
    MalformedJson { line: u64, error: String },
    /// Decompression or read failure. Nothing more is produced for this stream.
    Corrupt { line: u64, error: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MalformedJson { line, error } => write!(f, "malformed JSON at line {}: {}", line, error),
            SkipReason::Corrupt { line, error } => {
                write!(f, "stream unreadable after line {}: {}", line.saturating_sub(1), error)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Record(LogRecord),
    Skip(SkipReason),
}

/// A `Read` wrapper that counts compressed bytes read.
struct CountingReader<R: Read> {
    inner: R,
    counter: Arc<AtomicU64>,
}
impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.counter.fetch_add(n as u64, Ordering::Relaxed);
        Ok(n)
    }
}

/// Lazy, finite, non-restartable sequence of records from a gzip NDJSON stream.
pub struct RecordDecoder<R: Read> {
    reader: BufReader<MultiGzDecoder<CountingReader<R>>>,
    counter: Arc<AtomicU64>,
    buf: Vec<u8>,
    line_no: u64,
    done: bool,
}

impl<R: Read> RecordDecoder<R> {
    pub fn new(compressed: R, read_buf_bytes: usize) -> Self {
        let counter = Arc::new(AtomicU64::new(0));
        let cnt = CountingReader { inner: compressed, counter: counter.clone() };
        let reader = BufReader::with_capacity(read_buf_bytes.max(8 * 1024), MultiGzDecoder::new(cnt));
        Self { reader, counter, buf: Vec::with_capacity(16 * 1024), line_no: 0, done: false }
    }

    /// Lines read so far (including empty and malformed ones).
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    /// Compressed bytes pulled from the underlying stream so far.
    pub fn compressed_bytes(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

impl<R: Read> Iterator for RecordDecoder<R> {
    type Item = Decoded;

    fn next(&mut self) -> Option<Decoded> {
        loop {
            if self.done {
                return None;
            }
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.done = true;
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.done = true;
                    return Some(Decoded::Skip(SkipReason::Corrupt { line: self.line_no + 1, error: e.to_string() }));
                }
            }
            self.line_no += 1;

            if self.buf.ends_with(b"\n") {
                self.buf.pop();
                if self.buf.ends_with(b"\r") {
                    self.buf.pop();
                }
            }
            if self.buf.iter().all(|b| b.is_ascii_whitespace()) {
                continue;
            }

            let text = String::from_utf8_lossy(&self.buf);
            let item = match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => Decoded::Record(map),
                Ok(_) => Decoded::Skip(SkipReason::MalformedJson {
                    line: self.line_no,
                    error: "value is not a JSON object".to_string(),
                }),
                Err(e) => Decoded::Skip(SkipReason::MalformedJson { line: self.line_no, error: e.to_string() }),
            };
            return Some(item);
        }
    }
}
