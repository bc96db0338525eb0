//! Enumeration of archived XML documents under a directory.

use std::path::{Path, PathBuf};

use rand::prelude::SliceRandom;
use thiserror::Error;

/// Errors raised while listing archived documents.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The directory could not be read.
    #[error("Failed to read archive directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Enumerated paths for one directory plus the full (unskipped) count.
#[derive(Debug)]
pub struct Enumeration {
    /// Paths to probe, in probe order.
    pub paths: Vec<PathBuf>,
    /// Total number of documents in the directory, ignoring any resume offset.
    ///
    /// Kept separate so progress display can show true completion even when
    /// the head of the list was skipped.
    pub total: usize,
}

/// List `*.xml` files under `{archive_root}/{dirname}`.
///
/// The natural order is a byte-wise sort on file names, which keeps resume
/// offsets stable across filesystems. With `randomize` the list is shuffled
/// and `resume_offset` is ignored: an offset into a shuffled order is
/// meaningless. Otherwise the first `resume_offset` entries are dropped.
pub fn enumerate(
    archive_root: &Path,
    dirname: &str,
    randomize: bool,
    resume_offset: usize,
) -> Result<Enumeration, ArchiveError> {
    let dir = archive_root.join(dirname);
    let mut paths = std::fs::read_dir(&dir)
        .map_err(|source| ArchiveError::ReadDir {
            path: dir.clone(),
            source,
        })?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("xml"))
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    paths.sort();

    let total = paths.len();
    if randomize {
        let mut rng = rand::rng();
        paths.shuffle(&mut rng);
    } else if resume_offset > 0 {
        paths = paths.split_off(resume_offset.min(total));
    }

    Ok(Enumeration { paths, total })
}
