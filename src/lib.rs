mod config;
mod date;
mod layout;
mod source;
mod local;
#[cfg(feature = "s3")]
mod s3;

mod gz_jsonl;
mod query;
mod filters;
mod json_utils;
mod sink;
mod progress;
mod util;
mod pipeline;

pub use crate::config::{gb_to_bytes, secs_to_pause, RecoveryOptions};
pub use crate::date::{day_label, iter_days, parse_record_timestamp, parse_timestamp};
pub use crate::layout::{ArchiveLayout, DEFAULT_STEM};
pub use crate::pipeline::{Recovery, RecoverySummary};

// Blob sources: the capability plus the local and object-store implementations.
pub use crate::source::{BlobHandle, BlobSource};
pub use crate::local::LocalArchive;
#[cfg(feature = "s3")]
pub use crate::s3::{S3Archive, S3Settings};

// Decoder, filter engine and sink, usable on their own.
pub use crate::gz_jsonl::{Decoded, LogRecord, RecordDecoder, SkipReason};
pub use crate::query::FieldPredicate;
pub use crate::filters::{matches, matches_with_field, FilterSpec, TimeRange, DEFAULT_TIMESTAMP_FIELD};
pub use crate::json_utils::{lookup_path, normalize_timestamp_in_place, pad_fraction};
pub use crate::sink::{NoopPacer, Pacer, RotationMode, SinkConfig, SinkStats, SleepPacer, ThrottledSink, DEFAULT_PAUSE};

// Logging setup for the binary and tests.
pub use crate::util::{init_logging, init_tracing_once};
