//! Catalog of regular file sets.
//!
//! The reader only needs one thing from a catalog: every file set record
//! whose span intersects a query interval. [`FileSetIndex`] is that seam,
//! any store can sit behind it. [`MemoryIndex`] is the one shipped here, it
//! can be loaded from and saved to a RON file.
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::file_set::{self, FileCount, FileSpacing, RegularFileSet};
use crate::template::FilenameTemplate;
use crate::Timestamp;

mod memory;
mod scan;

pub use memory::MemoryIndex;
pub use scan::scan_file_names;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not access catalog file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Catalog is not valid RON: {0}")]
    Deserialize(#[from] ron::error::SpannedError),
    #[error("Could not serialize catalog to RON: {0}")]
    Serialize(#[from] ron::Error),
    #[error("Catalog record is not a valid file set: {0}")]
    InvalidRecord(#[source] file_set::Error),
    #[error("Could not derive a start time from file name: {0}")]
    FileName(#[source] crate::template::ParseError),
}

/// One catalogued run of files as stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSetRecord {
    pub start: Timestamp,
    pub end: Timestamp,
    pub seconds_per_file: f64,
    /// Zero or negative for a set that is still being recorded.
    pub file_count: i64,
}

impl FileSetRecord {
    /// Where the record ends, a set that is still recording ends now
    /// whatever end was stored.
    #[must_use]
    pub fn end_time(&self) -> Timestamp {
        match FileCount::from_catalog(self.file_count) {
            FileCount::Bounded(_) => self.end,
            FileCount::OpenEnded => self.end.max(Utc::now()),
        }
    }

    /// Whether `[start, end)` of this record intersects `[start, end)`.
    #[must_use]
    pub fn overlaps(&self, start: Timestamp, end: Timestamp) -> bool {
        !(self.start >= end || self.end_time() <= start)
    }

    /// Build the file set this record describes. The set is derived from the
    /// start, spacing and count. A stored end that disagrees is logged and
    /// otherwise ignored.
    ///
    /// # Errors
    /// If the spacing is not positive or the set would end out of range.
    pub fn materialize(
        &self,
        template: Arc<FilenameTemplate>,
    ) -> Result<RegularFileSet, file_set::Error> {
        let spacing = FileSpacing::from_secs_f64(self.seconds_per_file)?;
        let count = FileCount::from_catalog(self.file_count);
        let set = RegularFileSet::new(template, self.start, spacing, count)?;
        if count != FileCount::OpenEnded && set.end_time() != self.end {
            warn!(
                "catalog record ending at {} holds {} files of {}s, these end at {}",
                self.end,
                self.file_count,
                self.seconds_per_file,
                set.end_time()
            );
        }
        Ok(set)
    }
}

impl From<&RegularFileSet> for FileSetRecord {
    fn from(set: &RegularFileSet) -> Self {
        Self {
            start: set.start_time(),
            end: set.end_time(),
            seconds_per_file: set.spacing().as_secs_f64(),
            file_count: match set.file_count() {
                FileCount::Bounded(n) => i64::try_from(n).unwrap_or(i64::MAX),
                FileCount::OpenEnded => 0,
            },
        }
    }
}

/// Read only lookup of catalogued file sets.
pub trait FileSetIndex {
    type Error: std::error::Error + Send + Sync + 'static;

    /// All records intersecting `[start, end)`, a record intersects unless
    /// `record.start >= end` or `record.end <= start`. Order is not
    /// guaranteed.
    fn lookup(&self, start: Timestamp, end: Timestamp)
        -> Result<Vec<FileSetRecord>, Self::Error>;
}

impl<T: FileSetIndex + ?Sized> FileSetIndex for &T {
    type Error = T::Error;

    fn lookup(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<FileSetRecord>, Self::Error> {
        (**self).lookup(start, end)
    }
}

impl<T: FileSetIndex + ?Sized> FileSetIndex for Arc<T> {
    type Error = T::Error;

    fn lookup(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<FileSetRecord>, Self::Error> {
        (**self).lookup(start, end)
    }
}
