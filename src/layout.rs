//! Daily archive naming: `<YYYY>/<Mon>/<stem>-<DD>.json.gz`, optionally split into
//! numbered parts `<stem>-<DD>-<N>.json.gz`. Shared by the local and S3 sources.

use crate::date::month_abbr;
use anyhow::{Context, Result};
use regex::Regex;
use time::Date;

pub const DEFAULT_STEM: &str = "ossec-archive";

#[derive(Clone, Debug)]
pub struct ArchiveLayout {
    stem: String,
    re: Regex,
}

impl ArchiveLayout {
    pub fn new(stem: impl Into<String>) -> Result<Self> {
        let stem = stem.into();
        let re = Regex::new(&format!(r"^{}-(\d{{2}})(?:-(\d+))?\.json\.gz$", regex::escape(&stem)))
            .with_context(|| format!("building archive name pattern for stem {:?}", stem))?;
        Ok(Self { stem, re })
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    /// Directory holding a day's archives, relative to the archive root: `2024/Jan`.
    pub fn day_dir(&self, day: Date) -> String {
        format!("{}/{}", day.year(), month_abbr(day.month()))
    }

    /// Key prefix every archive of `day` starts with: `2024/Jan/ossec-archive-01`.
    pub fn day_prefix(&self, day: Date) -> String {
        format!("{}/{}-{:02}", self.day_dir(day), self.stem, day.day())
    }

    /// If `file_name` is an archive of `day`, return its part number
    /// (0 for the unsuffixed file).
    pub fn part_of(&self, file_name: &str, day: Date) -> Option<u32> {
        let caps = self.re.captures(file_name)?;
        let dd: u8 = caps[1].parse().ok()?;
        if dd != day.day() {
            return None;
        }
        match caps.get(2) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    }
}
