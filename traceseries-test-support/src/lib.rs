use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use chrono::{Duration, TimeZone, Utc};
use traceseries::{
    ByteOrder, FileCount, FileSpacing, FilenameTemplate, RegularFileSet, Timestamp, TraceLayout,
};

pub fn setup_tracing() {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();

    let fmt = fmt::layer()
        .pretty()
        .with_line_number(true)
        .with_test_writer();

    let _ignore_err = tracing_subscriber::registry()
        .with(tracing_error::ErrorLayer::default())
        .with(filter_layer)
        .with(fmt)
        .try_init();
}

pub fn t(h: u32, m: u32, s: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2020, 1, 1, h, m, s).unwrap()
}

/// Sample value that encodes where it came from so stitched windows can be
/// checked exactly. `index` counts samples since the archive origin and must
/// stay below a million, values are exact in f32 up to channel 16.
pub fn sample_value(channel: u32, index: u64) -> f32 {
    assert!(index < 1_000_000);
    (channel as u64 * 1_000_000 + index) as f32
}

/// Write a trace file with the given layout. Unused header bytes are zero,
/// the binary header holds the sample interval and samples per trace.
pub fn write_trace_file(
    path: &Path,
    layout: &TraceLayout,
    byte_order: ByteOrder,
    sample_interval_us: u16,
    traces: &[Vec<f32>],
) {
    let samples_per_trace = traces.first().map(Vec::len).unwrap_or(0);
    assert!(traces.iter().all(|t| t.len() == samples_per_trace));

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).unwrap();
    }
    let mut file = BufWriter::new(File::create(path).unwrap());

    file.write_all(&vec![b' '; layout.text_header_bytes as usize])
        .unwrap();
    let mut binary = vec![0u8; layout.binary_header_bytes as usize];
    {
        let mut fields = &mut binary[16..22];
        // the field only holds 16 bits, longer traces wrap
        #[allow(clippy::cast_possible_truncation)]
        let samples = samples_per_trace as u16;
        match byte_order {
            ByteOrder::Big => {
                fields.write_u16::<BigEndian>(sample_interval_us).unwrap();
                fields.write_u16::<BigEndian>(sample_interval_us).unwrap();
                fields.write_u16::<BigEndian>(samples).unwrap();
            }
            ByteOrder::Little => {
                fields.write_u16::<LittleEndian>(sample_interval_us).unwrap();
                fields.write_u16::<LittleEndian>(sample_interval_us).unwrap();
                fields.write_u16::<LittleEndian>(samples).unwrap();
            }
        }
    }
    file.write_all(&binary).unwrap();

    for trace in traces {
        file.write_all(&vec![0u8; layout.trace_header_bytes as usize])
            .unwrap();
        for sample in trace {
            match byte_order {
                ByteOrder::Big => file.write_f32::<BigEndian>(*sample).unwrap(),
                ByteOrder::Little => file.write_f32::<LittleEndian>(*sample).unwrap(),
            }
        }
    }
    file.flush().unwrap();
}

/// A run of trace files written to disk for a test.
pub struct Archive {
    pub template: Arc<FilenameTemplate>,
    pub layout: TraceLayout,
    pub byte_order: ByteOrder,
    pub sampling_rate: f64,
    pub channels: u32,
    /// Sample indices passed to [`sample_value`] count from here
    pub origin: Timestamp,
}

impl Archive {
    /// Canonical layout below `dir` with 16 channels at 50 Hz.
    pub fn new(dir: &Path) -> Self {
        let pattern = format!(
            "{}/{{YYYY}}/{{MM}}/{{DD}}/cbt_processed_{{YYYY}}{{MM}}{{DD}}_{{HH}}{{mm}}{{SS}}.{{mmm}}+0000.sgy",
            dir.display()
        );
        Self {
            template: Arc::new(FilenameTemplate::from_pattern(&pattern).unwrap()),
            layout: TraceLayout::default(),
            byte_order: ByteOrder::Big,
            sampling_rate: 50.0,
            channels: 16,
            origin: t(0, 0, 0),
        }
    }

    pub fn samples_per_file(&self, seconds_per_file: i64) -> usize {
        (seconds_per_file as f64 * self.sampling_rate).round() as usize
    }

    fn sample_interval_us(&self) -> u16 {
        (1e6 / self.sampling_rate).round() as u16
    }

    fn index_of(&self, time: Timestamp) -> u64 {
        let millis = (time - self.origin).num_milliseconds();
        (millis as f64 * self.sampling_rate / 1000.0).round() as u64
    }

    /// Write `count` files of `seconds_per_file` starting at `start` and
    /// return the file set describing them.
    pub fn write_set(
        &self,
        start: Timestamp,
        seconds_per_file: i64,
        count: u64,
    ) -> RegularFileSet {
        self.write_set_with_interval(start, seconds_per_file, count, self.sample_interval_us())
    }

    pub fn write_set_with_interval(
        &self,
        start: Timestamp,
        seconds_per_file: i64,
        count: u64,
        sample_interval_us: u16,
    ) -> RegularFileSet {
        let set = RegularFileSet::new(
            Arc::clone(&self.template),
            start,
            FileSpacing::from_millis(seconds_per_file * 1000).unwrap(),
            FileCount::Bounded(count),
        )
        .unwrap();

        let samples_per_file = self.samples_per_file(seconds_per_file);
        for file_start in set.file_starts_in_range(start, set.end_time()).unwrap() {
            let first = self.index_of(file_start);
            let traces: Vec<Vec<f32>> = (1..=self.channels)
                .map(|channel| {
                    (0..samples_per_file as u64)
                        .map(|i| sample_value(channel, first + i))
                        .collect()
                })
                .collect();
            write_trace_file(
                &self.template.render(file_start),
                &self.layout,
                self.byte_order,
                sample_interval_us,
                &traces,
            );
        }
        set
    }

    /// What a read of `channel` for `n` samples from `start` should return.
    pub fn expected(&self, channel: u32, start: Timestamp, n: usize) -> Vec<f32> {
        let first = self.index_of(start);
        (0..n as u64).map(|i| sample_value(channel, first + i)).collect()
    }

    pub fn path_at(&self, file_start: Timestamp) -> PathBuf {
        self.template.render(file_start)
    }
}

pub fn seconds(n: i64) -> Duration {
    Duration::seconds(n)
}
