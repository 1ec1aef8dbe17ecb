//! Read windows of multi-channel data from large sets of regularly spaced
//! trace files.
//!
//! A catalog ([`FileSetIndex`]) lists runs of files ([`RegularFileSet`]) that
//! each start at a known time and are spaced evenly. File names follow a
//! [`FilenameTemplate`]. Given a window the [`Reader`] resolves which files
//! overlap it and stitches the requested channels together from only those
//! files.
pub mod buffer;
pub mod config;
pub mod file_set;
pub mod index;
pub mod reader;
pub mod template;
pub mod trace;
pub mod window;

pub use buffer::AssembledBuffer;
pub use config::Config;
pub use file_set::{FileCount, FileSpacing, RegularFileSet};
pub use index::{FileSetIndex, FileSetRecord, MemoryIndex};
pub use reader::{Coverage, NoData, Outcome, Reader};
pub use template::{FilenameTemplate, Part};
pub use trace::{ByteOrder, TraceLayout, TraceSpec};
pub use window::{LeapSecond, TimeWindow};

/// UTC time with millisecond precision.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
