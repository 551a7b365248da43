#![allow(dead_code)]

use anyhow::{anyhow, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use logrecover::{BlobHandle, BlobSource, Pacer};
use serde_json::{json, Map, Value};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use time::Date;

/// Gzip the provided lines, one per `\n`.
pub fn gz_bytes(lines: &[String]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    for l in lines {
        writeln!(&mut enc, "{}", l).unwrap();
    }
    enc.finish().unwrap()
}

/// A Wazuh-style archive event carrying `data.win.eventInfo.resource`.
pub fn event(ts: &str, resource: &str) -> String {
    json!({
        "timestamp": ts,
        "agent": {"id": "001", "name": "dc01"},
        "data": {"win": {"eventInfo": {"resource": resource}}},
        "location": "EventChannel"
    })
    .to_string()
}

pub fn record(v: Value) -> Map<String, Value> {
    v.as_object().unwrap().clone()
}

/// Write `<root>/<YYYY>/<Mon>/<file_name>` gzip-compressed.
pub fn write_archive(root: &Path, year: i32, month: &str, file_name: &str, lines: &[String]) -> PathBuf {
    let dir = root.join(year.to_string()).join(month);
    fs::create_dir_all(&dir).unwrap();
    let path = dir.join(file_name);
    fs::write(&path, gz_bytes(lines)).unwrap();
    path
}

/// Read a JSONL file into a vector of `serde_json::Value` (skips empty lines).
pub fn read_jsonl_values(path: &Path) -> Vec<Value> {
    read_lines(path).iter().map(|s| serde_json::from_str(s).unwrap()).collect()
}

/// Read a text file line-by-line into strings.
pub fn read_lines(path: &Path) -> Vec<String> {
    let f = File::open(path).unwrap();
    let r = BufReader::new(f);
    r.lines().map(|l| l.unwrap()).filter(|s| !s.is_empty()).collect()
}

/// Pacer that records requested pauses instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pub pauses: Vec<Duration>,
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, interval: Duration) {
        self.pauses.push(interval);
    }
}

/// In-memory blob source that remembers which days were asked for.
#[derive(Default)]
pub struct MemorySource {
    blobs: BTreeMap<String, Vec<u8>>,
    by_day: BTreeMap<Date, Vec<String>>,
    fail_list: BTreeSet<Date>,
    fail_open: BTreeSet<String>,
    pub requested: RefCell<Vec<Date>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw (already compressed, or deliberately broken) blob for `day`.
    pub fn with_blob(mut self, day: Date, bytes: Vec<u8>) -> Self {
        let keys = self.by_day.entry(day).or_default();
        let key = format!("{}/{}", day, keys.len());
        keys.push(key.clone());
        self.blobs.insert(key, bytes);
        self
    }

    pub fn with_lines(self, day: Date, lines: &[String]) -> Self {
        self.with_blob(day, gz_bytes(lines))
    }

    pub fn failing_list(mut self, day: Date) -> Self {
        self.fail_list.insert(day);
        self
    }

    /// Make the `index`-th blob of `day` fail to open.
    pub fn failing_open(mut self, day: Date, index: usize) -> Self {
        self.fail_open.insert(format!("{}/{}", day, index));
        self
    }
}

impl BlobSource for MemorySource {
    fn list_daily_blobs(&self, day: Date) -> Result<Vec<BlobHandle>> {
        self.requested.borrow_mut().push(day);
        if self.fail_list.contains(&day) {
            return Err(anyhow!("listing failed for {}", day));
        }
        Ok(self
            .by_day
            .get(&day)
            .map(|keys| {
                keys.iter()
                    .map(|k| BlobHandle { key: k.clone(), size: Some(self.blobs[k].len() as u64) })
                    .collect()
            })
            .unwrap_or_default())
    }

    fn open_blob_stream(&self, handle: &BlobHandle) -> Result<Box<dyn Read + '_>> {
        if self.fail_open.contains(&handle.key) {
            return Err(anyhow!("connection reset while opening {}", handle.key));
        }
        let bytes = self.blobs.get(&handle.key).ok_or_else(|| anyhow!("no such blob {}", handle.key))?;
        Ok(Box::new(Cursor::new(bytes.as_slice())))
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
