use crate::config::RecoveryOptions;
use crate::date::{day_label, iter_days};
use crate::filters::{FilterSpec, TimeRange};
use crate::gz_jsonl::{Decoded, RecordDecoder, SkipReason};
use crate::json_utils::normalize_timestamp_in_place;
use crate::progress::make_progress_bar_labeled;
use crate::query::FieldPredicate;
use crate::sink::{Pacer, RotationMode, SinkConfig, SleepPacer, ThrottledSink};
use crate::source::{BlobHandle, BlobSource};
use anyhow::{anyhow, Result};
use indicatif::ProgressBar;
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::PrimitiveDateTime;

/// Malformed lines per blob reported at `warn`; the rest go to `debug`.
const MALFORMED_WARN_PER_BLOB: u64 = 10;

/// Counters for one recovery run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoverySummary {
    pub days_visited: u64,
    /// Days with no archive at all.
    pub days_missing: u64,
    /// Days whose listing failed; they are skipped but not counted as missing.
    pub days_list_failed: u64,
    pub blobs_read: u64,
    /// Blobs that could not be opened.
    pub blobs_failed: u64,
    /// Blobs abandoned part-way on a decompression/read error.
    pub blobs_truncated: u64,
    pub lines_read: u64,
    pub malformed_lines: u64,
    pub records_written: u64,
    pub bytes_written: u64,
    pub pauses: u64,
    pub rotations: u64,
    pub rotated_files: Vec<PathBuf>,
}

#[derive(Clone, Debug, Default)]
pub struct Recovery {
    pub(crate) opts: RecoveryOptions,
}

impl Recovery {
    pub fn new() -> Self {
        Self { opts: RecoveryOptions::default() }
    }

    pub fn from_options(opts: RecoveryOptions) -> Self {
        Self { opts }
    }

    pub fn options(&self) -> &RecoveryOptions {
        &self.opts
    }

    // -------- Builder methods --------
    pub fn time_range(mut self, min: PrimitiveDateTime, max: PrimitiveDateTime) -> Self { self.opts = self.opts.with_time_range(min, max); self }
    pub fn field(mut self, p: FieldPredicate) -> Self { self.opts = self.opts.with_predicate(p); self }
    pub fn fields<I: IntoIterator<Item = FieldPredicate>>(mut self, preds: I) -> Self { self.opts = self.opts.with_predicates(preds); self }
    pub fn timestamp_field(mut self, key: impl Into<String>) -> Self { self.opts = self.opts.with_timestamp_field(key); self }
    pub fn output(mut self, path: impl AsRef<Path>) -> Self { self.opts = self.opts.with_output(path); self }
    pub fn eps(mut self, eps: u64) -> Self { self.opts = self.opts.with_eps(eps); self }
    pub fn pause(mut self, pause: Duration) -> Self { self.opts = self.opts.with_pause(pause); self }
    pub fn max_bytes(mut self, bytes: u64) -> Self { self.opts = self.opts.with_max_bytes(bytes); self }
    pub fn rotation(mut self, mode: RotationMode) -> Self { self.opts = self.opts.with_rotation(mode); self }
    pub fn normalize_timestamps(mut self, yes: bool) -> Self { self.opts = self.opts.with_normalize_timestamps(yes); self }
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    pub fn io_buffers(mut self, read_bytes: usize, write_bytes: usize) -> Self { self.opts = self.opts.with_io_buffers(read_bytes, write_bytes); self }

    /// Validated filter for the configured window and predicates.
    pub fn filter_spec(&self) -> Result<FilterSpec> {
        let min = self.opts.min.ok_or_else(|| anyhow!("min timestamp is required"))?;
        let max = self.opts.max.ok_or_else(|| anyhow!("max timestamp is required"))?;
        let mut spec = FilterSpec::new(TimeRange::new(min, max)?, self.opts.predicates.clone());
        spec.timestamp_field = self.opts.timestamp_field.clone();
        Ok(spec)
    }

    pub fn sink_config(&self) -> Result<SinkConfig> {
        let path = self.opts.output.clone().ok_or_else(|| anyhow!("output path is required"))?;
        Ok(SinkConfig {
            path,
            max_bytes: self.opts.max_bytes,
            eps_max: self.opts.eps_max,
            pause: self.opts.pause,
            rotation: self.opts.rotation,
            write_buffer_bytes: self.opts.write_buffer_bytes,
        })
    }

    /// Recover every matching record in the window from `source`, pacing with real sleeps.
    pub fn run<S: BlobSource + ?Sized>(&self, source: &S) -> Result<RecoverySummary> {
        self.run_with_pacer(source, SleepPacer)
    }

    /// Same as `run` with a caller-supplied pacing strategy.
    /// Setup problems (bad window, unwritable output) fail before any day is fetched.
    pub fn run_with_pacer<S, P>(&self, source: &S, pacer: P) -> Result<RecoverySummary>
    where
        S: BlobSource + ?Sized,
        P: Pacer,
    {
        let filter = self.filter_spec()?;
        let sink = ThrottledSink::with_pacer(self.sink_config()?, pacer)?;
        self.drive(source, &filter, sink)
    }

    fn drive<S, P>(&self, source: &S, filter: &FilterSpec, mut sink: ThrottledSink<P>) -> Result<RecoverySummary>
    where
        S: BlobSource + ?Sized,
        P: Pacer,
    {
        let (first_day, last_day) = filter.range.day_bounds();
        tracing::info!(
            source = %source.describe(),
            min = %filter.range.min(),
            max = %filter.range.max(),
            predicates = filter.predicates.len(),
            output = %sink.path().display(),
            "Starting recovery"
        );

        let pb = if self.opts.progress {
            Some(make_progress_bar_labeled(self.opts.progress_label.as_deref()))
        } else {
            None
        };

        let mut summary = RecoverySummary::default();

        for day in iter_days(first_day, last_day) {
            summary.days_visited += 1;
            let label = day_label(day);
            tracing::info!(day = %label, "Checking for archives of {}", label);

            let blobs = match source.list_daily_blobs(day) {
                Ok(b) => b,
                Err(e) => {
                    tracing::warn!(day = %label, error = %format!("{:#}", e), "Error listing archives; skipping day");
                    summary.days_list_failed += 1;
                    continue;
                }
            };
            if blobs.is_empty() {
                tracing::warn!(day = %label, "Archive not found; skipping day");
                summary.days_missing += 1;
                continue;
            }
            if let Some(pb) = &pb {
                pb.inc_length(blobs.iter().filter_map(|b| b.size).sum());
            }

            let mut daily = 0u64;
            for handle in &blobs {
                daily += self.stream_blob(source, handle, filter, &mut sink, &mut summary, pb.as_ref())?;
            }
            tracing::info!(day = %label, records = daily, "Extracted {} records from day {}", daily, label);
        }

        if let Some(pb) = pb {
            pb.finish_with_message("done");
        }

        let stats = sink.finish()?;
        summary.records_written = stats.records;
        summary.bytes_written = stats.bytes;
        summary.pauses = stats.pauses;
        summary.rotations = stats.rotations;
        summary.rotated_files = stats.rotated_files;

        tracing::info!(
            days = summary.days_visited,
            days_missing = summary.days_missing,
            days_list_failed = summary.days_list_failed,
            blobs = summary.blobs_read,
            blobs_failed = summary.blobs_failed,
            blobs_truncated = summary.blobs_truncated,
            lines = summary.lines_read,
            malformed = summary.malformed_lines,
            records = summary.records_written,
            bytes = summary.bytes_written,
            rotations = summary.rotations,
            "Recovery finished"
        );
        Ok(summary)
    }

    /// Decode one blob and emit its matching records. Returns the number emitted.
    /// Only sink (write) errors are returned; everything else is logged and counted.
    fn stream_blob<S, P>(
        &self,
        source: &S,
        handle: &BlobHandle,
        filter: &FilterSpec,
        sink: &mut ThrottledSink<P>,
        summary: &mut RecoverySummary,
        pb: Option<&ProgressBar>,
    ) -> Result<u64>
    where
        S: BlobSource + ?Sized,
        P: Pacer,
    {
        let stream = match source.open_blob_stream(handle) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(blob = %handle.key, error = %format!("{:#}", e), "Error opening archive; skipping it");
                summary.blobs_failed += 1;
                if let (Some(pb), Some(sz)) = (pb, handle.size) {
                    pb.inc(sz);
                }
                return Ok(0);
            }
        };
        tracing::info!(blob = %handle.key, size = ?handle.size, "Reading archive {}", handle.key);
        summary.blobs_read += 1;

        let mut decoder = RecordDecoder::new(stream, self.opts.read_buffer_bytes);
        let mut written = 0u64;
        let mut malformed = 0u64;
        let mut last = 0u64;

        while let Some(item) = decoder.next() {
            match item {
                Decoded::Record(mut rec) => {
                    if filter.matches(&rec) {
                        if self.opts.normalize_timestamps {
                            normalize_timestamp_in_place(&mut rec, &filter.timestamp_field);
                        }
                        sink.emit(&rec)?;
                        written += 1;
                    }
                }
                Decoded::Skip(reason @ SkipReason::MalformedJson { .. }) => {
                    malformed += 1;
                    if malformed <= MALFORMED_WARN_PER_BLOB {
                        tracing::warn!(blob = %handle.key, "Skipping line: {}", reason);
                    } else {
                        tracing::debug!(blob = %handle.key, "Skipping line: {}", reason);
                    }
                }
                Decoded::Skip(reason @ SkipReason::Corrupt { .. }) => {
                    summary.blobs_truncated += 1;
                    tracing::warn!(
                        blob = %handle.key,
                        "Skipping rest of archive after decode error: {}. \
                         The file is probably truncated or corrupt; records before this point were kept.",
                        reason
                    );
                }
            }
            if let Some(pb) = pb {
                let cur = decoder.compressed_bytes();
                if cur > last {
                    pb.inc(cur - last);
                    last = cur;
                }
            }
        }

        summary.lines_read += decoder.lines_read();
        summary.malformed_lines += malformed;
        if malformed > MALFORMED_WARN_PER_BLOB {
            tracing::warn!(blob = %handle.key, malformed, "Skipped {} malformed lines in archive", malformed);
        }
        Ok(written)
    }
}
