use std::convert::Infallible;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use ron::ser::PrettyConfig;
use tracing::{debug, instrument};

use super::{Error, FileSetIndex, FileSetRecord};
use crate::file_set::RegularFileSet;
use crate::template::FilenameTemplate;
use crate::Timestamp;

/// Catalog kept in memory, sorted on start time.
///
/// Inserting a set merges it with every stored set it overlaps or touches
/// (given they share a spacing) so the catalog stays as small as possible.
#[derive(Debug, Clone)]
pub struct MemoryIndex {
    template: Arc<FilenameTemplate>,
    sets: Vec<RegularFileSet>,
}

impl MemoryIndex {
    #[must_use]
    pub fn new(template: Arc<FilenameTemplate>) -> Self {
        Self {
            template,
            sets: Vec::new(),
        }
    }

    #[must_use]
    pub fn template(&self) -> &Arc<FilenameTemplate> {
        &self.template
    }

    #[must_use]
    pub fn sets(&self) -> &[RegularFileSet] {
        &self.sets
    }

    pub fn insert(&mut self, set: RegularFileSet) {
        let mut merged = set;
        while let Some(pos) = self
            .sets
            .iter()
            .position(|existing| existing.union(&merged).is_some())
        {
            let existing = self.sets.remove(pos);
            if let Some(union) = existing.union(&merged) {
                debug!("merged {existing} into {union}");
                merged = union;
            }
        }

        let pos = self
            .sets
            .partition_point(|s| s.start_time() <= merged.start_time());
        self.sets.insert(pos, merged);
    }

    /// # Errors
    /// If the record does not describe a valid file set.
    pub fn insert_record(&mut self, record: &FileSetRecord) -> Result<(), Error> {
        let set = record
            .materialize(Arc::clone(&self.template))
            .map_err(Error::InvalidRecord)?;
        self.insert(set);
        Ok(())
    }

    /// Parse a RON list of [`FileSetRecord`]s.
    ///
    /// # Errors
    /// If the text is not valid RON or a record is not a valid file set.
    pub fn from_ron_str(template: Arc<FilenameTemplate>, text: &str) -> Result<Self, Error> {
        let records: Vec<FileSetRecord> = ron::from_str(text)?;
        let mut index = Self::new(template);
        for record in &records {
            index.insert_record(record)?;
        }
        Ok(index)
    }

    /// # Errors
    /// If the file can not be read or its content is not a valid catalog.
    #[instrument(skip(template), err)]
    pub fn load_ron(template: Arc<FilenameTemplate>, path: &Path) -> Result<Self, Error> {
        let text = fs::read_to_string(path)?;
        let index = Self::from_ron_str(template, &text)?;
        debug!("loaded {} file sets", index.sets.len());
        Ok(index)
    }

    /// # Errors
    /// If the records could not be serialized.
    pub fn to_ron_string(&self) -> Result<String, Error> {
        let records: Vec<FileSetRecord> = self.sets.iter().map(FileSetRecord::from).collect();
        Ok(ron::ser::to_string_pretty(&records, PrettyConfig::new())?)
    }

    /// # Errors
    /// If the records could not be serialized or written.
    #[instrument(skip(self), err)]
    pub fn save_ron(&self, path: &Path) -> Result<(), Error> {
        let text = self.to_ron_string()?;
        fs::write(path, text)?;
        Ok(())
    }
}

impl FileSetIndex for MemoryIndex {
    type Error = Infallible;

    fn lookup(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<FileSetRecord>, Self::Error> {
        Ok(self
            .sets
            .iter()
            .map(FileSetRecord::from)
            .filter(|record| record.overlaps(start, end))
            .collect())
    }
}

impl Extend<RegularFileSet> for MemoryIndex {
    fn extend<I: IntoIterator<Item = RegularFileSet>>(&mut self, iter: I) {
        for set in iter {
            self.insert(set);
        }
    }
}
