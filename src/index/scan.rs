use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use tracing::instrument;

use super::Error;
use crate::file_set::{FileCount, FileSpacing, RegularFileSet};
use crate::template::FilenameTemplate;

/// Group a listing of file names into regular file sets.
///
/// Every name is parsed back into its start time. Files are taken in time
/// order: a file starting exactly where the current set ends extends it,
/// any other file starts a new set. Duplicate names count once.
///
/// # Errors
/// If a name does not match the template.
#[instrument(skip(template, names), err)]
pub fn scan_file_names<P: AsRef<Path>>(
    template: &Arc<FilenameTemplate>,
    spacing: FileSpacing,
    names: impl IntoIterator<Item = P>,
) -> Result<Vec<RegularFileSet>, Error> {
    let starts: Vec<_> = names
        .into_iter()
        .map(|name| template.parse(name))
        .collect::<Result<_, _>>()
        .map_err(Error::FileName)?;

    let mut sets: Vec<RegularFileSet> = Vec::new();
    for start in starts.into_iter().sorted().dedup() {
        if let Some(current) = sets.last_mut() {
            if current.end_time() == start {
                current.add_files_to_end(1).map_err(Error::InvalidRecord)?;
                continue;
            }
        }
        let set = RegularFileSet::new(
            Arc::clone(template),
            start,
            spacing,
            FileCount::Bounded(1),
        )
        .map_err(Error::InvalidRecord)?;
        sets.push(set);
    }
    Ok(sets)
}
