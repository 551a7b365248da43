//! The throttled, size-rotated NDJSON output.
//!
//! `ThrottledSink` is the only owner of the output handle. Every emitted record advances
//! two counters held on the instance:
//!  - the throttle counter: once it reaches `eps_max`, the sink asks its `Pacer` to pause
//!    for `pause` and resets the counter;
//!  - the byte counter: once it reaches `max_bytes`, the output is rotated and the counter
//!    restarts at zero; the fresh handle is opened by the next write.

use crate::gz_jsonl::LogRecord;
use crate::util::{create_with_backoff, rename_with_backoff};
use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_PAUSE: Duration = Duration::from_secs(2);

/// How the sink waits once the events-per-second ceiling is hit.
pub trait Pacer {
    fn pause(&mut self, interval: Duration);
}

/// Blocks the calling thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct SleepPacer;

impl Pacer for SleepPacer {
    fn pause(&mut self, interval: Duration) {
        std::thread::sleep(interval);
    }
}

/// Never waits. Useful for dry runs and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPacer;

impl Pacer for NoopPacer {
    fn pause(&mut self, _interval: Duration) {}
}

/// What happens to the full output file when the size ceiling is reached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RotationMode {
    /// Move the full file to `<path>.<n>` (first free n from 1) and start a new `<path>`.
    #[default]
    Rename,
    /// Reopen `<path>` truncated; whatever it held is discarded.
    Truncate,
}

impl FromStr for RotationMode {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rename" => Ok(Self::Rename),
            "truncate" => Ok(Self::Truncate),
            other => Err(anyhow!("unknown rotation mode {:?} (expected rename or truncate)", other)),
        }
    }
}

impl fmt::Display for RotationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RotationMode::Rename => "rename",
            RotationMode::Truncate => "truncate",
        })
    }
}

#[derive(Clone, Debug)]
pub struct SinkConfig {
    pub path: PathBuf,
    pub max_bytes: u64,
    pub eps_max: u64,
    pub pause: Duration,
    pub rotation: RotationMode,
    pub write_buffer_bytes: usize,
}

impl SinkConfig {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_bytes: 1 << 30,
            eps_max: 400,
            pause: DEFAULT_PAUSE,
            rotation: RotationMode::Rename,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

/// Pause-after-N counter.
#[derive(Clone, Debug)]
struct Throttle {
    eps_max: u64,
    since_pause: u64,
}

impl Throttle {
    /// Count one record; true when a pause is due (the counter is reset).
    #[inline]
    fn tick(&mut self) -> bool {
        self.since_pause += 1;
        if self.since_pause >= self.eps_max {
            self.since_pause = 0;
            true
        } else {
            false
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SinkStats {
    pub records: u64,
    pub bytes: u64,
    pub pauses: u64,
    pub rotations: u64,
    /// Files produced by `RotationMode::Rename`, oldest first.
    pub rotated_files: Vec<PathBuf>,
}

pub struct ThrottledSink<P: Pacer = SleepPacer> {
    cfg: SinkConfig,
    writer: Option<BufWriter<File>>,
    bytes_in_file: u64,
    throttle: Throttle,
    pacer: P,
    next_suffix: u32,
    stats: SinkStats,
}

impl ThrottledSink<SleepPacer> {
    pub fn create(cfg: SinkConfig) -> Result<Self> {
        Self::with_pacer(cfg, SleepPacer)
    }
}

impl<P: Pacer> ThrottledSink<P> {
    /// Create (truncate) the output file. Fails on an unwritable destination or on
    /// zero `eps_max` / `max_bytes`.
    pub fn with_pacer(cfg: SinkConfig, pacer: P) -> Result<Self> {
        if cfg.eps_max == 0 {
            bail!("events-per-second ceiling must be > 0");
        }
        if cfg.max_bytes == 0 {
            bail!("max output size must be > 0");
        }
        let writer = open_output(&cfg)?;
        let throttle = Throttle { eps_max: cfg.eps_max, since_pause: 0 };
        Ok(Self {
            cfg,
            writer: Some(writer),
            bytes_in_file: 0,
            throttle,
            pacer,
            next_suffix: 1,
            stats: SinkStats::default(),
        })
    }

    /// Serialize and write one record.
    pub fn emit(&mut self, record: &LogRecord) -> Result<()> {
        let line = serde_json::to_vec(record).context("serialize record")?;
        self.write_line(&line)
    }

    /// Write one already-serialized NDJSON line (without its `\n`).
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        if self.writer.is_none() {
            self.writer = Some(open_output(&self.cfg)?);
        }
        let w = self.writer.as_mut().ok_or_else(|| anyhow!("output {} is closed", self.cfg.path.display()))?;
        w.write_all(line)
            .and_then(|_| w.write_all(b"\n"))
            .with_context(|| format!("write {}", self.cfg.path.display()))?;

        let n = line.len() as u64 + 1;
        self.bytes_in_file += n;
        self.stats.bytes += n;
        self.stats.records += 1;

        if self.throttle.tick() {
            tracing::trace!(eps_max = self.cfg.eps_max, pause_ms = self.cfg.pause.as_millis() as u64, "throttling");
            self.pacer.pause(self.cfg.pause);
            self.stats.pauses += 1;
        }

        if self.bytes_in_file >= self.cfg.max_bytes {
            self.rotate()?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(mut w) = self.writer.take() {
            w.flush().with_context(|| format!("flush {}", self.cfg.path.display()))?;
        }

        match self.cfg.rotation {
            RotationMode::Rename => {
                let dest = self.next_rotated_path();
                rename_with_backoff(&self.cfg.path, &dest, 16, 50)?;
                tracing::info!(
                    output = %self.cfg.path.display(),
                    rotated_to = %dest.display(),
                    bytes = self.bytes_in_file,
                    "Output file reached max size, rotated"
                );
                self.stats.rotated_files.push(dest);
            }
            RotationMode::Truncate => {
                tracing::warn!(
                    output = %self.cfg.path.display(),
                    bytes = self.bytes_in_file,
                    "Output file reached max size, it will be truncated on the next write"
                );
            }
        }

        // Reopened by the next write; a run ending here leaves no empty `<path>`.
        self.bytes_in_file = 0;
        self.stats.rotations += 1;
        Ok(())
    }

    fn next_rotated_path(&mut self) -> PathBuf {
        loop {
            let mut name = self.cfg.path.as_os_str().to_os_string();
            name.push(format!(".{}", self.next_suffix));
            self.next_suffix += 1;
            let candidate = PathBuf::from(name);
            if !candidate.exists() {
                return candidate;
            }
        }
    }

    /// Bytes written to the current output handle since it was opened.
    pub fn bytes_in_current_file(&self) -> u64 {
        self.bytes_in_file
    }

    /// Records emitted since the last throttle pause.
    pub fn throttle_count(&self) -> u64 {
        self.throttle.since_pause
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn stats(&self) -> &SinkStats {
        &self.stats
    }

    pub fn path(&self) -> &Path {
        &self.cfg.path
    }

    /// Flush and close the output.
    pub fn finish(mut self) -> Result<SinkStats> {
        if let Some(mut w) = self.writer.take() {
            w.flush().with_context(|| format!("flush {}", self.cfg.path.display()))?;
        }
        Ok(self.stats)
    }
}

fn open_output(cfg: &SinkConfig) -> Result<BufWriter<File>> {
    let f = create_with_backoff(&cfg.path, 16, 50)
        .with_context(|| format!("create output {}", cfg.path.display()))?;
    Ok(BufWriter::with_capacity(cfg.write_buffer_bytes.max(8 * 1024), f))
}
