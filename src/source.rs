//! The blob source capability: where a day's compressed archives come from.

use anyhow::Result;
use std::io::Read;
use time::Date;

/// One compressed archive belonging to a day.
/// `key` is the object key (S3) or the path relative to the archive root (local).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobHandle {
    pub key: String,
    pub size: Option<u64>,
}

/// Anything that can list and open daily archives.
///
/// An empty list from `list_daily_blobs` means the archive for that day is absent.
/// Errors from either method are treated by the driver as "day/blob unavailable"
/// and never abort the run.
pub trait BlobSource {
    fn list_daily_blobs(&self, day: Date) -> Result<Vec<BlobHandle>>;
    fn open_blob_stream(&self, handle: &BlobHandle) -> Result<Box<dyn Read + '_>>;

    /// Human-readable location for log lines (`s3://bucket`, `/var/ossec/logs/archives`).
    fn describe(&self) -> String;
}
