//! A run of regularly spaced files.
//!
//! All boundary math happens on whole milliseconds: the file with index `k`
//! starts at `start + k * spacing`. Nothing is ever found by repeatedly
//! adding the spacing so long runs do not drift.
use core::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};

use crate::template::FilenameTemplate;
use crate::Timestamp;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Time {requested} lies outside this file set: {start}..{end}")]
    OutOfRange {
        requested: Timestamp,
        start: Timestamp,
        end: Timestamp,
    },
    #[error("Range start {start} lies after its end {end}")]
    InvalidRange { start: Timestamp, end: Timestamp },
    #[error("Seconds per file must be a positive, finite number of at least a millisecond, got: {0}")]
    InvalidSpacing(String),
    #[error("The file set would end beyond the representable time range")]
    Overflow,
}

/// Time between the starts of two consecutive files, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSpacing {
    millis: i64,
}

impl FileSpacing {
    /// Rounds to the nearest millisecond.
    ///
    /// # Errors
    /// If `secs` is not finite or rounds to zero or less.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_secs_f64(secs: f64) -> Result<Self, Error> {
        let millis = (secs * 1000.0).round();
        if !millis.is_finite() || millis < 1.0 || millis > i64::MAX as f64 {
            return Err(Error::InvalidSpacing(secs.to_string()));
        }
        Ok(Self {
            millis: millis as i64,
        })
    }

    /// # Errors
    /// If `millis` is zero or negative.
    pub fn from_millis(millis: i64) -> Result<Self, Error> {
        if millis < 1 {
            return Err(Error::InvalidSpacing(format!("{millis}ms")));
        }
        Ok(Self { millis })
    }

    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.millis
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(&self) -> f64 {
        self.millis as f64 / 1000.0
    }

    #[must_use]
    pub fn as_duration(&self) -> Duration {
        Duration::milliseconds(self.millis)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCount {
    Bounded(u64),
    /// Still recording, the set ends at the current time.
    OpenEnded,
}

impl FileCount {
    /// Catalogs flag sets that are still being recorded with a count of zero
    /// or -1.
    #[must_use]
    pub fn from_catalog(raw: i64) -> Self {
        match u64::try_from(raw) {
            Ok(count) if count > 0 => FileCount::Bounded(count),
            _ => FileCount::OpenEnded,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegularFileSet {
    template: Arc<FilenameTemplate>,
    start: Timestamp,
    spacing: FileSpacing,
    count: FileCount,
}

impl RegularFileSet {
    /// # Errors
    /// Returns [`Error::Overflow`] if the end of the set can not be
    /// represented.
    pub fn new(
        template: Arc<FilenameTemplate>,
        start: Timestamp,
        spacing: FileSpacing,
        count: FileCount,
    ) -> Result<Self, Error> {
        if let FileCount::Bounded(n) = count {
            offset_by_files(start, spacing, n).ok_or(Error::Overflow)?;
        }
        Ok(Self {
            template,
            start,
            spacing,
            count,
        })
    }

    #[must_use]
    pub fn start_time(&self) -> Timestamp {
        self.start
    }

    #[must_use]
    pub fn spacing(&self) -> FileSpacing {
        self.spacing
    }

    #[must_use]
    pub fn file_count(&self) -> FileCount {
        self.count
    }

    #[must_use]
    pub fn template(&self) -> &FilenameTemplate {
        &self.template
    }

    /// End of the set, an open ended set ends now.
    #[must_use]
    pub fn end_time(&self) -> Timestamp {
        self.end_time_at(Utc::now())
    }

    /// End of the set where `now` is used as the end of an open ended set.
    /// Never earlier then the start of the set.
    #[must_use]
    pub fn end_time_at(&self, now: Timestamp) -> Timestamp {
        match self.count {
            FileCount::Bounded(n) => {
                offset_by_files(self.start, self.spacing, n).unwrap_or(Timestamp::MAX_UTC)
            }
            FileCount::OpenEnded => now.max(self.start),
        }
    }

    /// Start of file `index` counting from zero. Only called with indices for
    /// which [`new`](Self::new) checked the result is representable.
    fn boundary(&self, index: i64) -> Timestamp {
        self.start + Duration::milliseconds(index * self.spacing.millis)
    }

    fn millis_into_set(&self, t: Timestamp) -> i64 {
        (t - self.start).num_milliseconds()
    }

    /// Start of the file that contains `t`. A time exactly on a boundary
    /// belongs to the file starting there. The set is half open: its end
    /// time is not part of it.
    ///
    /// # Errors
    /// Returns [`Error::OutOfRange`] if `t` is not in `[start, end)`.
    pub fn file_start_at(&self, t: Timestamp) -> Result<Timestamp, Error> {
        let end = self.end_time();
        if t < self.start || t >= end {
            return Err(Error::OutOfRange {
                requested: t,
                start: self.start,
                end,
            });
        }
        let index = self.millis_into_set(t).div_euclid(self.spacing.millis);
        Ok(self.boundary(index))
    }

    /// Name of the file that contains `t`, see [`file_start_at`](Self::file_start_at).
    ///
    /// # Errors
    /// Returns [`Error::OutOfRange`] if `t` is not in `[start, end)`.
    pub fn file_name_at(&self, t: Timestamp) -> Result<PathBuf, Error> {
        self.file_start_at(t).map(|start| self.template.render(start))
    }

    /// Start times, in ascending order, of every file overlapping
    /// `[range_start, range_end)`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRange`] if `range_start > range_end`.
    pub fn file_starts_in_range(
        &self,
        range_start: Timestamp,
        range_end: Timestamp,
    ) -> Result<Vec<Timestamp>, Error> {
        if range_start > range_end {
            return Err(Error::InvalidRange {
                start: range_start,
                end: range_end,
            });
        }

        let from = range_start.max(self.start);
        let till = range_end.min(self.end_time());
        if from >= till {
            return Ok(Vec::new());
        }

        let first = self.millis_into_set(from).div_euclid(self.spacing.millis);
        let stop = ceil_div(self.millis_into_set(till), self.spacing.millis);

        Ok((first..stop).map(|index| self.boundary(index)).collect())
    }

    /// Names, in ascending time order, of every file overlapping
    /// `[range_start, range_end)`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidRange`] if `range_start > range_end`.
    pub fn file_names_in_range(
        &self,
        range_start: Timestamp,
        range_end: Timestamp,
    ) -> Result<Vec<PathBuf>, Error> {
        Ok(self
            .file_starts_in_range(range_start, range_end)?
            .into_iter()
            .map(|start| self.template.render(start))
            .collect())
    }

    /// Part of the given UTC day this set covers, `None` if they do not
    /// intersect.
    fn day_overlap(&self, date: NaiveDate) -> Option<(Timestamp, Timestamp)> {
        let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
        let next_midnight = midnight.checked_add_signed(Duration::days(1))?;
        let from = midnight.max(self.start);
        let till = next_midnight.min(self.end_time());
        (from < till).then_some((from, till))
    }

    /// The file starting at the first file boundary on `date`. Returns `None`
    /// if the set does not cover that day or no file starts on it.
    #[must_use]
    pub fn first_file_of_day(&self, date: NaiveDate) -> Option<PathBuf> {
        let (from, till) = self.day_overlap(date)?;
        let index = ceil_div(self.millis_into_set(from), self.spacing.millis);
        let first = self.boundary(index);
        (first < till).then(|| self.template.render(first))
    }

    /// The file starting at the last file boundary on `date`. Returns `None`
    /// if the set does not cover that day or no file starts on it.
    #[must_use]
    pub fn last_file_of_day(&self, date: NaiveDate) -> Option<PathBuf> {
        let (from, till) = self.day_overlap(date)?;
        let index = ceil_div(self.millis_into_set(till), self.spacing.millis) - 1;
        let last = self.boundary(index);
        (last >= from).then(|| self.template.render(last))
    }

    /// `None` if the set holds no files.
    #[must_use]
    pub fn last_file_name(&self) -> Option<PathBuf> {
        let files = ceil_div(self.millis_into_set(self.end_time()), self.spacing.millis);
        (files > 0).then(|| self.template.render(self.boundary(files - 1)))
    }

    /// Merge two sets with the same spacing that overlap or touch. The result
    /// spans from the earliest start to the latest end. It is open ended if
    /// either input is. Returns `None` if the sets can not be merged, that
    /// includes sets whose file boundaries do not line up.
    #[must_use]
    pub fn union(&self, other: &Self) -> Option<Self> {
        if self.spacing != other.spacing {
            return None;
        }
        let offset = (other.start - self.start).num_milliseconds();
        if offset.rem_euclid(self.spacing.millis) != 0 {
            return None;
        }
        let (self_end, other_end) = (self.end_time(), other.end_time());
        let touching = self.start <= other_end && other.start <= self_end;
        if !touching {
            return None;
        }

        let start = self.start.min(other.start);
        let count = match (self.count, other.count) {
            (FileCount::Bounded(_), FileCount::Bounded(_)) => {
                let span = (self_end.max(other_end) - start).num_milliseconds();
                FileCount::Bounded(span.div_euclid(self.spacing.millis).unsigned_abs())
            }
            _ => FileCount::OpenEnded,
        };

        Some(Self {
            template: Arc::clone(&self.template),
            start,
            spacing: self.spacing,
            count,
        })
    }

    /// Grow the set by `n` files at its end. An open ended set already
    /// reaches up to now and stays as is.
    ///
    /// # Errors
    /// Returns [`Error::Overflow`] if the new end can not be represented.
    /// The set is left unchanged in that case.
    pub fn add_files_to_end(&mut self, n: u64) -> Result<(), Error> {
        if let FileCount::Bounded(count) = self.count {
            let count = count.checked_add(n).ok_or(Error::Overflow)?;
            offset_by_files(self.start, self.spacing, count).ok_or(Error::Overflow)?;
            self.count = FileCount::Bounded(count);
        }
        Ok(())
    }

    /// Grow the set by `n` files before its start, the end stays put.
    ///
    /// # Errors
    /// Returns [`Error::Overflow`] if the new start can not be represented.
    /// The set is left unchanged in that case.
    pub fn add_files_to_start(&mut self, n: u64) -> Result<(), Error> {
        let shift = i64::try_from(n)
            .ok()
            .and_then(|n| n.checked_mul(self.spacing.millis))
            .ok_or(Error::Overflow)?;
        let start = self
            .start
            .checked_sub_signed(Duration::milliseconds(shift))
            .ok_or(Error::Overflow)?;
        let count = match self.count {
            FileCount::Bounded(count) => {
                FileCount::Bounded(count.checked_add(n).ok_or(Error::Overflow)?)
            }
            FileCount::OpenEnded => FileCount::OpenEnded,
        };
        self.start = start;
        self.count = count;
        Ok(())
    }
}

impl fmt::Display for RegularFileSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.count {
            FileCount::Bounded(n) => write!(
                f,
                "{n} files of {}s from {}",
                self.spacing.as_secs_f64(),
                self.start
            ),
            FileCount::OpenEnded => write!(
                f,
                "files of {}s from {} still recording",
                self.spacing.as_secs_f64(),
                self.start
            ),
        }
    }
}

fn offset_by_files(start: Timestamp, spacing: FileSpacing, files: u64) -> Option<Timestamp> {
    let millis = i64::try_from(files).ok()?.checked_mul(spacing.millis)?;
    start.checked_add_signed(Duration::try_milliseconds(millis)?)
}

fn ceil_div(numerator: i64, denominator: i64) -> i64 {
    -(-numerator).div_euclid(denominator)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn set(spacing_secs: i64, count: FileCount) -> RegularFileSet {
        let template = FilenameTemplate::from_pattern("{YYYY}{MM}{DD}_{HH}{mm}{SS}.{mmm}").unwrap();
        RegularFileSet::new(
            Arc::new(template),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap(),
            FileSpacing::from_millis(spacing_secs * 1000).unwrap(),
            count,
        )
        .unwrap()
    }

    #[test]
    fn ceil_div_rounds_up() {
        assert_eq!(ceil_div(0, 30), 0);
        assert_eq!(ceil_div(1, 30), 1);
        assert_eq!(ceil_div(30, 30), 1);
        assert_eq!(ceil_div(31, 30), 2);
    }

    #[test]
    fn spacing_must_be_positive() {
        assert!(FileSpacing::from_secs_f64(0.0).is_err());
        assert!(FileSpacing::from_secs_f64(-30.0).is_err());
        assert!(FileSpacing::from_secs_f64(f64::NAN).is_err());
        assert!(FileSpacing::from_secs_f64(0.0004).is_err());
        assert_eq!(FileSpacing::from_secs_f64(0.5).unwrap().as_millis(), 500);
    }

    #[test]
    fn catalog_sentinels_are_open_ended() {
        assert_eq!(FileCount::from_catalog(0), FileCount::OpenEnded);
        assert_eq!(FileCount::from_catalog(-1), FileCount::OpenEnded);
        assert_eq!(FileCount::from_catalog(120), FileCount::Bounded(120));
    }

    #[test]
    fn open_ended_resolves_to_given_now() {
        let set = set(30, FileCount::OpenEnded);
        let now = Utc.with_ymd_and_hms(2020, 1, 1, 1, 0, 0).unwrap();
        assert_eq!(set.end_time_at(now), now);
        let before_start = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(set.end_time_at(before_start), set.start_time());
    }

    #[test]
    fn empty_set_has_no_last_file() {
        assert_eq!(set(30, FileCount::Bounded(0)).last_file_name(), None);
        assert_eq!(
            set(30, FileCount::Bounded(2)).last_file_name(),
            Some(PathBuf::from("20200101_000030.000"))
        );
    }
}
