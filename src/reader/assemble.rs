use std::path::Path;

use chrono::Duration;
use tracing::debug;

use super::{Error, NoData};
use crate::buffer::AssembledBuffer;
use crate::file_set::RegularFileSet;
use crate::trace::{self, BinaryHeader, ByteOrder, TraceLayout, TraceSpec, BYTES_PER_SAMPLE};
use crate::window::{millis_to_samples, TimeWindow};
use crate::Timestamp;

pub(super) enum Abort {
    NoData(NoData),
    Error(Error),
}

impl From<NoData> for Abort {
    fn from(reason: NoData) -> Self {
        Abort::NoData(reason)
    }
}

impl From<Error> for Abort {
    fn from(err: Error) -> Self {
        Abort::Error(err)
    }
}

impl From<trace::ReadError> for Abort {
    fn from(err: trace::ReadError) -> Self {
        Abort::NoData(NoData::Io(err))
    }
}

pub(super) struct Assembly<'a> {
    pub(super) layout: &'a TraceLayout,
    pub(super) byte_order: ByteOrder,
    pub(super) channels: &'a [u32],
    pub(super) sampling_rate: f64,
}

/// Where the next file's samples go. Only lives for one window.
struct Cursor {
    /// Samples per channel written so far
    filled: usize,
    /// Samples per channel the window spans
    expected: usize,
    /// Data before this time has been consumed already
    consumed_until: Timestamp,
}

impl Cursor {
    fn remaining(&self) -> usize {
        self.expected - self.filled
    }
}

impl Assembly<'_> {
    /// Files are consumed strictly in time order, every file appends its
    /// samples right after those of the previous one.
    ///
    /// The first sample is the one nearest to the window start, from there on
    /// exactly `window.sample_count()` consecutive samples are taken. Those
    /// never start after the window end, the listing range is extended by a
    /// millisecond so a file starting exactly at the window end is included.
    pub(super) fn run(
        &self,
        window: &TimeWindow,
        sets: &[RegularFileSet],
    ) -> Result<AssembledBuffer, Abort> {
        let mut cursor = Cursor {
            filled: 0,
            expected: window.sample_count(self.sampling_rate),
            consumed_until: window.start(),
        };
        let mut buffer = AssembledBuffer::zeroed(self.channels, cursor.expected);
        let till = window.end() + Duration::milliseconds(1);

        for set in sets {
            if cursor.remaining() == 0 {
                break;
            }
            // overlapping sets must not provide the same samples twice
            let from = cursor.consumed_until;
            if from >= till {
                break;
            }
            let names = set
                .file_names_in_range(from, till)
                .map_err(Error::Listing)?;
            for name in names {
                if cursor.remaining() == 0 {
                    break;
                }
                let read = self.read_file(set, &name, from, &mut buffer, &cursor)?;
                cursor.filled += read;
            }
            cursor.consumed_until = cursor.consumed_until.max(set.end_time());
        }

        if cursor.filled != cursor.expected {
            return Err(Error::CursorMismatch {
                filled: cursor.filled,
                expected: cursor.expected,
            }
            .into());
        }
        Ok(buffer)
    }

    /// Returns the number of samples per channel read from this file.
    fn read_file(
        &self,
        set: &RegularFileSet,
        path: &Path,
        from: Timestamp,
        buffer: &mut AssembledBuffer,
        cursor: &Cursor,
    ) -> Result<usize, Abort> {
        let samples_per_file = millis_to_samples(set.spacing().as_millis(), self.sampling_rate);
        self.check_sampling(path, samples_per_file)?;

        let file_start = set.template().parse(path).map_err(Error::FileName)?;
        let into_file = (from - file_start).num_milliseconds();
        let start_sample = millis_to_samples(into_file, self.sampling_rate).min(samples_per_file);
        let end_sample = samples_per_file.min(start_sample + cursor.remaining());
        let count = end_sample - start_sample;

        let range = cursor.filled..cursor.filled + count;
        debug!(
            "reading samples {start_sample}..{end_sample} of {} into {range:?}",
            path.display()
        );

        let capacity = buffer.sample_count();
        for (row, channel) in self.channels.iter().enumerate() {
            let out = buffer
                .row_slice_mut(row, range.clone())
                .ok_or(Error::CursorMismatch {
                    filled: range.end,
                    expected: capacity,
                })?;
            let spec = TraceSpec {
                path: path.to_owned(),
                samples_per_trace: samples_per_file as u64,
                bytes_per_sample: BYTES_PER_SAMPLE,
                trace_number: *channel,
                byte_order: self.byte_order,
                start_sample: start_sample as u64,
                sample_count: count as u64,
            };
            trace::read_trace_into(self.layout, &spec, out)?;
        }
        Ok(count)
    }

    /// Any drift in sampling invalidates the whole window.
    fn check_sampling(&self, path: &Path, samples_per_file: usize) -> Result<(), Abort> {
        let header = BinaryHeader::read(path, self.layout, self.byte_order)?;

        let expected_interval = (1e6 / self.sampling_rate).round();
        if f64::from(header.sample_interval_us) != expected_interval {
            return Err(NoData::SamplingRateMismatch {
                path: path.to_owned(),
                declared: header.sampling_rate(),
                expected: self.sampling_rate,
            }
            .into());
        }

        // zero means the file does not say, longer traces do not fit the field
        let declared = usize::from(header.samples_per_trace);
        let representable = samples_per_file <= usize::from(u16::MAX);
        if declared != 0 && representable && declared != samples_per_file {
            return Err(NoData::SamplesPerTraceMismatch {
                path: path.to_owned(),
                declared,
                expected: samples_per_file,
            }
            .into());
        }
        Ok(())
    }
}
