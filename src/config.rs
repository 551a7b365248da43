use crate::filters::DEFAULT_TIMESTAMP_FIELD;
use crate::query::FieldPredicate;
use crate::sink::{RotationMode, DEFAULT_PAUSE};
use anyhow::{anyhow, bail, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::PrimitiveDateTime;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Convert a size in GB (GiB, fractional allowed) to bytes. Must be > 0.
pub fn gb_to_bytes(gb: f64) -> Result<u64> {
    if !gb.is_finite() || gb <= 0.0 {
        bail!("max size must be > 0 GB (got {})", gb);
    }
    let bytes = (gb * GIB) as u64;
    if bytes == 0 {
        bail!("max size {} GB rounds down to zero bytes", gb);
    }
    Ok(bytes)
}

/// Convert a pause given in seconds. Negative, NaN and values too large for a
/// `Duration` are rejected instead of panicking.
pub fn secs_to_pause(secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs).map_err(|e| anyhow!("invalid pause of {} seconds: {}", secs, e))
}

/// User-facing options with sensible defaults and builder chaining.
#[derive(Clone, Debug)]
pub struct RecoveryOptions {
    pub min: Option<PrimitiveDateTime>, // inclusive
    pub max: Option<PrimitiveDateTime>, // exclusive
    pub predicates: Vec<FieldPredicate>,
    pub timestamp_field: String,
    pub output: Option<PathBuf>,

    // pacing / rotation
    pub eps_max: u64,
    pub pause: Duration,
    pub max_bytes: u64,
    pub rotation: RotationMode,

    // record rewrite: pad `.5+0000` fractions to `.005+0000`
    pub normalize_timestamps: bool,

    pub progress: bool,
    pub progress_label: Option<String>,

    // IO tuning
    pub read_buffer_bytes: usize,
    pub write_buffer_bytes: usize,
}

impl Default for RecoveryOptions {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
            predicates: Vec::new(),
            timestamp_field: DEFAULT_TIMESTAMP_FIELD.to_string(),
            output: None,
            eps_max: 400,
            pause: DEFAULT_PAUSE,
            max_bytes: 1 << 30,
            rotation: RotationMode::Rename,
            normalize_timestamps: true,
            progress: false,
            progress_label: None,
            read_buffer_bytes: 256 * 1024,
            write_buffer_bytes: 256 * 1024,
        }
    }
}

impl RecoveryOptions {
    pub fn with_time_range(mut self, min: PrimitiveDateTime, max: PrimitiveDateTime) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
    pub fn with_predicate(mut self, p: FieldPredicate) -> Self {
        self.predicates.push(p);
        self
    }
    pub fn with_predicates<I>(mut self, preds: I) -> Self
    where
        I: IntoIterator<Item = FieldPredicate>,
    {
        self.predicates.extend(preds);
        self
    }
    pub fn with_timestamp_field(mut self, key: impl Into<String>) -> Self {
        self.timestamp_field = key.into();
        self
    }
    pub fn with_output(mut self, path: impl AsRef<Path>) -> Self {
        self.output = Some(path.as_ref().to_path_buf());
        self
    }
    pub fn with_eps(mut self, eps: u64) -> Self {
        self.eps_max = eps;
        self
    }
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }
    pub fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = bytes;
        self
    }
    pub fn with_rotation(mut self, mode: RotationMode) -> Self {
        self.rotation = mode;
        self
    }
    pub fn with_normalize_timestamps(mut self, yes: bool) -> Self {
        self.normalize_timestamps = yes;
        self
    }
    pub fn with_progress(mut self, yes: bool) -> Self {
        self.progress = yes;
        self
    }
    pub fn with_progress_label(mut self, label: impl Into<String>) -> Self {
        self.progress_label = Some(label.into());
        self
    }
    pub fn with_io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self {
        self.read_buffer_bytes = read_bytes.max(8 * 1024);
        self.write_buffer_bytes = write_bytes.max(8 * 1024);
        self
    }
}
