use crate::layout::ArchiveLayout;
use crate::source::{BlobHandle, BlobSource};
use crate::util::open_with_backoff;
use anyhow::{bail, Context, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use time::Date;
use walkdir::WalkDir;

/// Daily archives stored under a local root, e.g. `/var/ossec/logs/archives`.
#[derive(Clone, Debug)]
pub struct LocalArchive {
    root: PathBuf,
    layout: ArchiveLayout,
}

impl LocalArchive {
    pub fn new(root: impl AsRef<Path>, layout: ArchiveLayout) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            bail!("archive root {} is not a readable directory", root.display());
        }
        Ok(Self { root, layout })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl BlobSource for LocalArchive {
    fn list_daily_blobs(&self, day: Date) -> Result<Vec<BlobHandle>> {
        let rel_dir = self.layout.day_dir(day);
        let dir = self.root.join(&rel_dir);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let mut found: Vec<(u32, BlobHandle)> = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let ent = entry.with_context(|| format!("listing {}", dir.display()))?;
            if !ent.file_type().is_file() {
                continue;
            }
            let Some(name) = ent.file_name().to_str() else { continue };
            if let Some(part) = self.layout.part_of(name, day) {
                let size = ent.metadata().ok().map(|m| m.len());
                found.push((part, BlobHandle { key: format!("{}/{}", rel_dir, name), size }));
            }
        }
        found.sort_by_key(|(part, _)| *part);
        Ok(found.into_iter().map(|(_, h)| h).collect())
    }

    fn open_blob_stream(&self, handle: &BlobHandle) -> Result<Box<dyn Read + '_>> {
        let path = self.root.join(&handle.key);
        let f = open_with_backoff(&path, 16, 50).with_context(|| format!("open {}", path.display()))?;
        Ok(Box::new(f))
    }

    fn describe(&self) -> String {
        self.root.display().to_string()
    }
}
