//! Reader settings stored as RON.
//!
//! ```ron
//! (
//!     template: "/data/{YYYY}/{MM}/{DD}/cbt_processed_{YYYY}{MM}{DD}_{HH}{mm}{SS}.{mmm}+0000.sgy",
//!     channels: [14, 15, 16],
//!     sampling_rate: 50.0,
//!     catalog: Some("file_sets.ron"),
//! )
//! ```
//!
//! `layout`, `byte_order` and `leap_second` are optional and default to the
//! standard 3200/400/240 byte headers, big endian samples and no leap second
//! correction.
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::index::{self, FileSetIndex, MemoryIndex};
use crate::reader::{self, Reader, ReaderBuilder};
use crate::template::FilenameTemplate;
use crate::trace::{ByteOrder, TraceLayout};
use crate::window::LeapSecond;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Could not read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config is not valid: {0}")]
    Deserialize(#[from] ron::error::SpannedError),
    #[error("Could not serialize config: {0}")]
    Serialize(#[from] ron::Error),
    #[error("Config does not name a catalog file")]
    NoCatalog,
    #[error("Could not load catalog: {0}")]
    Catalog(#[source] index::Error),
    #[error("Invalid reader settings: {0}")]
    Reader(#[source] reader::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub template: FilenameTemplate,
    pub channels: Vec<u32>,
    pub sampling_rate: f64,
    #[serde(default)]
    pub layout: TraceLayout,
    #[serde(default)]
    pub byte_order: ByteOrder,
    #[serde(default)]
    pub leap_second: Option<LeapSecond>,
    /// RON catalog of file sets, relative paths are taken relative to the
    /// config file.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

impl Config {
    /// # Errors
    /// If the text is not a valid config.
    pub fn from_ron_str(text: &str) -> Result<Self, Error> {
        Ok(ron::from_str(text)?)
    }

    /// A relative catalog path is resolved against the directory holding
    /// the config.
    ///
    /// # Errors
    /// If the file can not be read or is not a valid config.
    #[instrument(err)]
    pub fn load(path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        let mut config = Self::from_ron_str(&text)?;
        if let (Some(catalog), Some(dir)) = (&config.catalog, path.parent()) {
            if catalog.is_relative() {
                config.catalog = Some(dir.join(catalog));
            }
        }
        Ok(config)
    }

    /// # Errors
    /// If the config could not be serialized.
    pub fn to_ron_string(&self) -> Result<String, Error> {
        Ok(ron::ser::to_string_pretty(self, PrettyConfig::new())?)
    }

    /// Builder with every setting from this config applied.
    pub fn builder<I: FileSetIndex>(&self, index: I) -> ReaderBuilder<I, true, true> {
        Reader::builder(index)
            .template(self.template.clone())
            .sampling_rate(self.sampling_rate)
            .channels(self.channels.iter().copied())
            .layout(self.layout)
            .byte_order(self.byte_order)
            .leap_second(self.leap_second)
    }

    /// # Errors
    /// If no catalog is configured or it could not be loaded.
    pub fn open_catalog(&self) -> Result<MemoryIndex, Error> {
        let path = self.catalog.as_ref().ok_or(Error::NoCatalog)?;
        MemoryIndex::load_ron(Arc::new(self.template.clone()), path).map_err(Error::Catalog)
    }

    /// Reader backed by the configured RON catalog.
    ///
    /// # Errors
    /// If the catalog could not be loaded or the settings are invalid.
    pub fn open_reader(&self) -> Result<Reader<MemoryIndex>, Error> {
        let index = self.open_catalog()?;
        self.builder(index).build().map_err(Error::Reader)
    }
}
