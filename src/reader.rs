//! Fill a window with samples from the catalogued files.
//!
//! [`Reader::locate`] finds the file sets covering a window,
//! [`Reader::read`] then walks their files in time order and copies the
//! requested sample range of every channel into one [`AssembledBuffer`].
//!
//! A window either gets completely filled or nothing is returned. Missing
//! coverage, sampling rate drift and unreadable files are expected in sparse
//! archives, they make the read return [`Outcome::NoData`] with a reason
//! instead of an error. [`Error`] is reserved for invalid arguments, a
//! failing catalog and broken internal invariants.
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Duration;
use tracing::{instrument, warn};

use crate::buffer::AssembledBuffer;
use crate::file_set::{self, RegularFileSet};
use crate::index::FileSetIndex;
use crate::template::{self, FilenameTemplate};
use crate::trace::{self, ByteOrder, TraceLayout};
use crate::window::{self, LeapSecond, TimeWindow};
use crate::Timestamp;

mod assemble;
pub mod builder;

pub use builder::ReaderBuilder;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Catalog lookup failed: {0}")]
    Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Catalog returned an invalid file set: {0}")]
    InvalidRecord(#[source] file_set::Error),
    #[error("Invalid window: {0}")]
    Window(#[from] window::Error),
    #[error("Could not list files in window: {0}")]
    Listing(#[source] file_set::Error),
    #[error("File name does not match the template: {0}")]
    FileName(#[source] template::ParseError),
    #[error("At least one channel is needed")]
    NoChannels,
    #[error("Channels are trace numbers and start at 1")]
    ChannelZero,
    #[error("Sampling rate must be a positive finite number, got: {0}")]
    InvalidSamplingRate(f64),
    #[error(
        "Sampling rate of {0} Hz has a sample interval too long for the \
        binary header, the lowest supported rate is about 15.26 Hz"
    )]
    IntervalTooLong(f64),
    #[error(
        "Files in window provided {filled} samples per channel while the \
        window spans {expected}"
    )]
    CursorMismatch { filled: usize, expected: usize },
}

/// Why a window could not be filled.
#[derive(Debug, thiserror::Error)]
pub enum NoData {
    #[error("no file set covers the window")]
    NoFileSets,
    #[error(
        "file sets are disjoint: coverage ends at {covered_until} and resumes \
        at {resumes_at}"
    )]
    Disjoint {
        covered_until: Timestamp,
        resumes_at: Timestamp,
    },
    #[error(
        "file sets cover {covered_start}..{covered_end} which does not strictly \
        bracket the window {window_start}..{window_end}"
    )]
    NotBracketed {
        covered_start: Timestamp,
        covered_end: Timestamp,
        window_start: Timestamp,
        window_end: Timestamp,
    },
    #[error("{path} is sampled at {declared} Hz, expected {expected} Hz")]
    SamplingRateMismatch {
        path: PathBuf,
        declared: f64,
        expected: f64,
    },
    #[error("{path} holds {declared} samples per trace, expected {expected}")]
    SamplesPerTraceMismatch {
        path: PathBuf,
        declared: usize,
        expected: usize,
    },
    #[error("could not read trace data: {0}")]
    Io(#[from] trace::ReadError),
}

#[derive(Debug)]
pub enum Outcome {
    Data(AssembledBuffer),
    NoData(NoData),
}

impl Outcome {
    #[must_use]
    pub fn data(self) -> Option<AssembledBuffer> {
        match self {
            Outcome::Data(buffer) => Some(buffer),
            Outcome::NoData(_) => None,
        }
    }

    #[must_use]
    pub fn no_data(&self) -> Option<&NoData> {
        match self {
            Outcome::Data(_) => None,
            Outcome::NoData(reason) => Some(reason),
        }
    }

    #[must_use]
    pub fn is_data(&self) -> bool {
        matches!(self, Outcome::Data(_))
    }
}

/// Result of [`Reader::locate`].
#[derive(Debug)]
pub enum Coverage {
    /// File sets in ascending start order, together they strictly bracket
    /// the window without gaps.
    Complete(Vec<RegularFileSet>),
    Missing(NoData),
}

/// Reads windows of multi-channel data from a catalog of file sets.
///
/// Holds no mutable state, windows can be read from multiple threads at
/// once if the index allows it.
#[derive(Debug)]
pub struct Reader<I> {
    index: I,
    template: Arc<FilenameTemplate>,
    channels: Vec<u32>,
    sampling_rate: f64,
    layout: TraceLayout,
    byte_order: ByteOrder,
    leap_second: Option<LeapSecond>,
}

impl<I: FileSetIndex> Reader<I> {
    pub fn builder(index: I) -> ReaderBuilder<I, false, false> {
        ReaderBuilder::new(index)
    }

    #[must_use]
    pub fn index(&self) -> &I {
        &self.index
    }

    #[must_use]
    pub fn channels(&self) -> &[u32] {
        &self.channels
    }

    #[must_use]
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    #[must_use]
    pub fn template(&self) -> &FilenameTemplate {
        &self.template
    }

    fn corrected(&self, window: &TimeWindow) -> TimeWindow {
        match &self.leap_second {
            Some(leap) => leap.adjust_window(window),
            None => *window,
        }
    }

    /// Find the file sets that together cover `window`.
    ///
    /// Coverage is missing if there are no sets, if there is a gap between
    /// consecutive sets or if the sets do not start strictly before and end
    /// strictly after the window.
    ///
    /// # Errors
    /// If the catalog lookup fails or returns an invalid record.
    #[instrument(skip(self), fields(start = %window.start(), end = %window.end()))]
    pub fn locate(&self, window: &TimeWindow) -> Result<Coverage, Error> {
        let window = self.corrected(window);
        self.locate_corrected(&window)
    }

    fn locate_corrected(&self, window: &TimeWindow) -> Result<Coverage, Error> {
        let records = self
            .index
            .lookup(window.start(), window.end())
            .map_err(|e| Error::Lookup(Box::new(e)))?;

        let mut sets = records
            .iter()
            .filter(|record| record.overlaps(window.start(), window.end()))
            .map(|record| record.materialize(Arc::clone(&self.template)))
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::InvalidRecord)?;
        sets.sort_by_key(RegularFileSet::start_time);

        let Some(first) = sets.first() else {
            warn!("No data for window {} (No file set)", window.start());
            return Ok(Coverage::Missing(NoData::NoFileSets));
        };

        let mut covered_until = first.end_time();
        for set in &sets[1..] {
            if set.start_time() > covered_until {
                warn!("No data for window {} (Disjoint file sets)", window.start());
                return Ok(Coverage::Missing(NoData::Disjoint {
                    covered_until,
                    resumes_at: set.start_time(),
                }));
            }
            covered_until = covered_until.max(set.end_time());
        }

        let covered_start = first.start_time();
        if !(covered_start < window.start() && covered_until > window.end()) {
            warn!("No data for window {} (Not bracketed)", window.start());
            return Ok(Coverage::Missing(NoData::NotBracketed {
                covered_start,
                covered_end: covered_until,
                window_start: window.start(),
                window_end: window.end(),
            }));
        }

        Ok(Coverage::Complete(sets))
    }

    /// Read the configured channels for the window `[start, start + length)`.
    ///
    /// # Errors
    /// See [`read_channels`](Self::read_channels).
    pub fn read(&self, start: Timestamp, length: Duration) -> Result<Outcome, Error> {
        let window = TimeWindow::new(start, length)?;
        self.read_channels(&window, &self.channels, self.sampling_rate)
    }

    /// Read `channels` (trace numbers, starting at 1) sampled at
    /// `sampling_rate` for `window`. Rows of the returned buffer follow the
    /// order of `channels`.
    ///
    /// # Errors
    /// On invalid arguments, a failing catalog or if the files did not add up
    /// to exactly the window length. Missing data is not an error but an
    /// [`Outcome::NoData`].
    #[instrument(skip(self, channels), fields(start = %window.start(), channels = channels.len()))]
    pub fn read_channels(
        &self,
        window: &TimeWindow,
        channels: &[u32],
        sampling_rate: f64,
    ) -> Result<Outcome, Error> {
        check_channels(channels)?;
        check_sampling_rate(sampling_rate)?;

        let window = self.corrected(window);
        let sets = match self.locate_corrected(&window)? {
            Coverage::Complete(sets) => sets,
            Coverage::Missing(reason) => return Ok(Outcome::NoData(reason)),
        };

        let assembly = assemble::Assembly {
            layout: &self.layout,
            byte_order: self.byte_order,
            channels,
            sampling_rate,
        };
        match assembly.run(&window, &sets) {
            Ok(buffer) => Ok(Outcome::Data(buffer)),
            Err(assemble::Abort::NoData(reason)) => {
                warn!("No data for window {} ({reason})", window.start());
                Ok(Outcome::NoData(reason))
            }
            Err(assemble::Abort::Error(err)) => Err(err),
        }
    }
}

fn check_channels(channels: &[u32]) -> Result<(), Error> {
    if channels.is_empty() {
        return Err(Error::NoChannels);
    }
    if channels.contains(&0) {
        return Err(Error::ChannelZero);
    }
    Ok(())
}

/// The binary header stores the sample interval as whole microseconds in a
/// u16, rates with a longer interval can never match a file.
fn check_sampling_rate(sampling_rate: f64) -> Result<(), Error> {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(Error::InvalidSamplingRate(sampling_rate));
    }
    if (1e6 / sampling_rate).round() > f64::from(u16::MAX) {
        return Err(Error::IntervalTooLong(sampling_rate));
    }
    Ok(())
}
