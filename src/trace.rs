//! Extract one channel's samples from a trace file.
//!
//! The files have a fixed layout:
//!
//! ```text
//! [text header][binary header][trace header][payload][trace header][payload]...
//! ```
//!
//! Every payload holds `samples_per_trace` 32 bit IEEE floats. Header sizes
//! are configuration, they are never discovered from the file. The only
//! thing read from the headers is the sampling metadata in the binary
//! header, see [`BinaryHeader`].
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use byteorder::{BigEndian, ByteOrder as _, LittleEndian, ReadBytesExt};
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Only 32 bit floats are supported.
pub const BYTES_PER_SAMPLE: u64 = 4;

/// Byte offset of the sample interval (in microseconds) within the binary header.
pub const SAMPLE_INTERVAL_OFFSET: u64 = 16;
/// Byte offset of the number of samples per trace within the binary header.
pub const SAMPLES_PER_TRACE_OFFSET: u64 = 20;
/// From the start of the sample interval up to the end of samples per trace.
const SAMPLING_FIELDS_BYTES: u64 = SAMPLES_PER_TRACE_OFFSET - SAMPLE_INTERVAL_OFFSET + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceLayout {
    pub text_header_bytes: u64,
    pub binary_header_bytes: u64,
    pub trace_header_bytes: u64,
}

impl Default for TraceLayout {
    fn default() -> Self {
        Self {
            text_header_bytes: 3200,
            binary_header_bytes: 400,
            trace_header_bytes: 240,
        }
    }
}

impl TraceLayout {
    /// Offset of the first byte of the binary header.
    #[must_use]
    pub fn binary_header_start(&self) -> u64 {
        self.text_header_bytes
    }

    /// Offset of the first byte of the first trace header.
    #[must_use]
    pub fn traces_start(&self) -> u64 {
        self.text_header_bytes + self.binary_header_bytes
    }

    /// Size of one trace header plus its payload.
    #[must_use]
    pub fn trace_block_bytes(&self, samples_per_trace: u64, bytes_per_sample: u64) -> u64 {
        self.trace_header_bytes + samples_per_trace * bytes_per_sample
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    #[default]
    Big,
    Little,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("Could not open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Could not seek to byte {offset} in {path}: {source}")]
    Seek {
        path: PathBuf,
        offset: u64,
        #[source]
        source: io::Error,
    },
    #[error("Could not read from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Short read from {path}: needed {expected} bytes at offset {offset} got only {got}")]
    ShortRead {
        path: PathBuf,
        offset: u64,
        expected: u64,
        got: u64,
    },
    #[error("Trace numbers start at 1")]
    TraceNumberZero,
    #[error(
        "Can not read {count} samples starting at {start}, a trace only \
        holds {samples_per_trace} samples"
    )]
    BeyondTrace {
        start: u64,
        count: u64,
        samples_per_trace: u64,
    },
    #[error("Only 4 byte samples are supported, got: {0}")]
    UnsupportedSampleSize(u64),
    #[error("Output has room for {available} samples, {needed} are read")]
    OutputSize { available: usize, needed: u64 },
    #[error("Binary header of {0} bytes is too small to hold the sampling fields")]
    BinaryHeaderTooSmall(u64),
}

/// What to read: a sample range of one trace in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSpec {
    pub path: PathBuf,
    pub samples_per_trace: u64,
    pub bytes_per_sample: u64,
    /// Starts at 1
    pub trace_number: u32,
    pub byte_order: ByteOrder,
    pub start_sample: u64,
    pub sample_count: u64,
}

impl TraceSpec {
    /// # Errors
    /// If the trace number is zero, the sample size is not 4 or the sample
    /// range does not fit in the trace.
    pub fn validate(&self) -> Result<(), ReadError> {
        if self.trace_number == 0 {
            return Err(ReadError::TraceNumberZero);
        }
        if self.bytes_per_sample != BYTES_PER_SAMPLE {
            return Err(ReadError::UnsupportedSampleSize(self.bytes_per_sample));
        }
        let fits = self
            .start_sample
            .checked_add(self.sample_count)
            .is_some_and(|end| end <= self.samples_per_trace);
        if !fits {
            return Err(ReadError::BeyondTrace {
                start: self.start_sample,
                count: self.sample_count,
                samples_per_trace: self.samples_per_trace,
            });
        }
        Ok(())
    }

    /// Offset of the first sample to read. Skips the file headers, every
    /// earlier trace block and then this trace's own header.
    #[must_use]
    pub fn byte_offset(&self, layout: &TraceLayout) -> u64 {
        let earlier_traces = u64::from(self.trace_number.saturating_sub(1));
        layout.traces_start()
            + earlier_traces
                * layout.trace_block_bytes(self.samples_per_trace, self.bytes_per_sample)
            + layout.trace_header_bytes
            + self.start_sample * self.bytes_per_sample
    }

    fn byte_len(&self) -> u64 {
        self.sample_count * self.bytes_per_sample
    }
}

/// Read the samples described by `spec`.
///
/// # Errors
/// See [`read_trace_into`].
pub fn read_trace(layout: &TraceLayout, spec: &TraceSpec) -> Result<Vec<f32>, ReadError> {
    let len = usize::try_from(spec.sample_count).map_err(|_| ReadError::OutputSize {
        available: usize::MAX,
        needed: spec.sample_count,
    })?;
    let mut samples = vec![0f32; len];
    read_trace_into(layout, spec, &mut samples)?;
    Ok(samples)
}

/// Read the samples described by `spec` into `out`, which must be exactly
/// `spec.sample_count` long. The file is closed before returning, also on
/// error.
///
/// # Errors
/// If the spec is invalid, the file can not be opened or does not hold all
/// requested samples. A short read is an error, nothing is zero filled.
#[instrument(level = "debug", skip(out), fields(path = %spec.path.display()), err)]
pub fn read_trace_into(
    layout: &TraceLayout,
    spec: &TraceSpec,
    out: &mut [f32],
) -> Result<(), ReadError> {
    spec.validate()?;
    if out.len() as u64 != spec.sample_count {
        return Err(ReadError::OutputSize {
            available: out.len(),
            needed: spec.sample_count,
        });
    }

    let bytes = read_exactly(&spec.path, spec.byte_offset(layout), spec.byte_len())?;
    match spec.byte_order {
        ByteOrder::Big => BigEndian::read_f32_into(&bytes, out),
        ByteOrder::Little => LittleEndian::read_f32_into(&bytes, out),
    }
    Ok(())
}

/// Sampling metadata from a file's binary header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryHeader {
    pub sample_interval_us: u16,
    pub samples_per_trace: u16,
}

impl BinaryHeader {
    /// Samples per second, infinite if the interval is zero.
    #[must_use]
    pub fn sampling_rate(&self) -> f64 {
        1e6 / f64::from(self.sample_interval_us)
    }

    /// Reads only the two fields needed, the traces are not touched.
    ///
    /// # Errors
    /// If the file can not be opened or is too short to hold the fields.
    #[instrument(level = "debug", err)]
    pub fn read(
        path: &Path,
        layout: &TraceLayout,
        byte_order: ByteOrder,
    ) -> Result<Self, ReadError> {
        if layout.binary_header_bytes < SAMPLE_INTERVAL_OFFSET + SAMPLING_FIELDS_BYTES {
            return Err(ReadError::BinaryHeaderTooSmall(layout.binary_header_bytes));
        }

        let offset = layout.binary_header_start() + SAMPLE_INTERVAL_OFFSET;
        let fields = read_exactly(path, offset, SAMPLING_FIELDS_BYTES)?;

        let mut fields = &fields[..];
        let (sample_interval_us, _, samples_per_trace) = match byte_order {
            ByteOrder::Big => read_fields::<BigEndian>(&mut fields),
            ByteOrder::Little => read_fields::<LittleEndian>(&mut fields),
        }
        .map_err(|source| ReadError::Read {
            path: path.to_owned(),
            source,
        })?;

        Ok(Self {
            sample_interval_us,
            samples_per_trace,
        })
    }
}

/// Interval, interval of the original recording, samples per trace.
fn read_fields<B: byteorder::ByteOrder>(fields: &mut &[u8]) -> io::Result<(u16, u16, u16)> {
    Ok((
        fields.read_u16::<B>()?,
        fields.read_u16::<B>()?,
        fields.read_u16::<B>()?,
    ))
}

/// Open, seek and read exactly `len` bytes. The file is dropped, and thus
/// closed, before returning.
fn read_exactly(path: &Path, offset: u64, len: u64) -> Result<Vec<u8>, ReadError> {
    let mut file = File::open(path).map_err(|source| ReadError::Open {
        path: path.to_owned(),
        source,
    })?;
    file.seek(SeekFrom::Start(offset))
        .map_err(|source| ReadError::Seek {
            path: path.to_owned(),
            offset,
            source,
        })?;

    let mut bytes = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    let got = file
        .take(len)
        .read_to_end(&mut bytes)
        .map_err(|source| ReadError::Read {
            path: path.to_owned(),
            source,
        })? as u64;
    if got != len {
        return Err(ReadError::ShortRead {
            path: path.to_owned(),
            offset,
            expected: len,
            got,
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(trace_number: u32, start_sample: u64, sample_count: u64) -> TraceSpec {
        TraceSpec {
            path: PathBuf::from("unused.sgy"),
            samples_per_trace: 1500,
            bytes_per_sample: 4,
            trace_number,
            byte_order: ByteOrder::Big,
            start_sample,
            sample_count,
        }
    }

    #[test]
    fn offset_of_first_sample() {
        let layout = TraceLayout::default();
        assert_eq!(spec(1, 0, 10).byte_offset(&layout), 3200 + 400 + 240);
    }

    #[test]
    fn offset_skips_earlier_traces_and_samples() {
        let layout = TraceLayout::default();
        let block = 240 + 1500 * 4;
        assert_eq!(
            spec(3, 750, 10).byte_offset(&layout),
            3200 + 400 + 2 * block + 240 + 750 * 4
        );
    }

    #[test]
    fn validation() {
        assert!(matches!(
            spec(0, 0, 1).validate(),
            Err(ReadError::TraceNumberZero)
        ));
        assert!(matches!(
            spec(1, 1000, 501).validate(),
            Err(ReadError::BeyondTrace { .. })
        ));
        assert!(spec(1, 1000, 500).validate().is_ok());
        let mut wide = spec(1, 0, 1);
        wide.bytes_per_sample = 8;
        assert!(matches!(
            wide.validate(),
            Err(ReadError::UnsupportedSampleSize(8))
        ));
    }

    #[test]
    fn missing_file_fails_to_open() {
        let layout = TraceLayout::default();
        let mut spec = spec(1, 0, 1);
        spec.path = PathBuf::from("/this/path/does/not/exist.sgy");
        assert!(matches!(
            read_trace(&layout, &spec),
            Err(ReadError::Open { .. })
        ));
    }
}
