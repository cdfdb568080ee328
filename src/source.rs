//! Document source abstraction and the local-folder implementation.
//!
//! The sync engine only ever needs two things from storage: list a location
//! and read one document. Recursion into sub-directories happens here, on top
//! of `list`, so a source may either return one level at a time or hand back
//! an already-flattened listing.

use crate::error::SyncError;
use crate::graph::SourceDocument;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Eq)]
/// One listing entry, relative to the location that was listed.
pub struct SourceEntry {
    pub relative_path: PathBuf,
    pub modified: SystemTime,
    pub is_directory: bool,
}

/// Storage contract consumed by the loader and the sync engine.
pub trait DocumentSource: Send + Sync {
    /// List the entries directly under `location`.
    fn list(&self, location: &Path) -> io::Result<Vec<SourceEntry>>;

    /// Read the full contents of one document.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Stable identity of a listed directory, used to avoid walking the same
    /// directory twice through links. `None` disables the check.
    fn canonical_location(&self, _location: &Path) -> Option<PathBuf> {
        None
    }
}

#[derive(Clone, Copy, Debug, Default)]
/// Documents on a locally mounted filesystem (local disk or network share).
pub struct FsDocumentSource;

impl DocumentSource for FsDocumentSource {
    fn list(&self, location: &Path) -> io::Result<Vec<SourceEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(location)? {
            let entry = entry?;
            // Follow links so linked directories are walked and linked files
            // report the target's modification time.
            let metadata = match fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %entry.path().display(), "skipping dangling link");
                    continue;
                }
                Err(err) => return Err(err),
            };
            entries.push(SourceEntry {
                relative_path: PathBuf::from(entry.file_name()),
                modified: metadata.modified()?,
                is_directory: metadata.is_dir(),
            });
        }
        Ok(entries)
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn canonical_location(&self, location: &Path) -> Option<PathBuf> {
        fs::canonicalize(location).ok()
    }
}

/// Recursively list the documents under `root`, sorted by relative path.
///
/// Only files whose extension matches `extension` (case-insensitive) are
/// returned; pass `None` to track every file.
pub fn list_documents(
    source: &dyn DocumentSource,
    root: &Path,
    extension: Option<&str>,
) -> Result<Vec<SourceEntry>, SyncError> {
    let mut documents = Vec::new();
    let mut visited = BTreeSet::new();
    let mut pending = vec![PathBuf::new()];
    while let Some(dir) = pending.pop() {
        let location = root.join(&dir);
        if let Some(canonical) = source.canonical_location(&location) {
            if !visited.insert(canonical) {
                debug!(location = %location.display(), "directory already listed");
                continue;
            }
        }
        let entries = source
            .list(&location)
            .map_err(|source| SyncError::SourceUnavailable {
                location: location.clone(),
                source,
            })?;
        for entry in entries {
            let relative_path = dir.join(&entry.relative_path);
            if entry.is_directory {
                pending.push(relative_path);
            } else if matches_extension(&relative_path, extension) {
                documents.push(SourceEntry {
                    relative_path,
                    ..entry
                });
            }
        }
    }
    documents.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(documents)
}

/// Read every listed document. Any read failure fails the whole batch.
pub fn read_documents(
    source: &dyn DocumentSource,
    root: &Path,
    entries: &[SourceEntry],
) -> Result<Vec<SourceDocument>, SyncError> {
    entries
        .iter()
        .map(|entry| {
            let path = root.join(&entry.relative_path);
            source
                .read(&path)
                .map(|bytes| SourceDocument {
                    path: entry.relative_path.clone(),
                    bytes,
                })
                .map_err(|source| SyncError::ReadFailed { path, source })
        })
        .collect()
}

fn matches_extension(path: &Path, extension: Option<&str>) -> bool {
    let Some(wanted) = extension else {
        return true;
    };
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted))
}
