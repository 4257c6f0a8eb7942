use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::{Diagnostic, TimestampOracle};

/// One physical file contributing to a `ShaderFile`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// Path as returned by the `IncludeProvider`
    pub path: PathBuf,

    /// Index of the file which included this one; `None` for the top-level file.
    /// Always points at an earlier entry of the same table.
    pub parent: Option<usize>,

    /// Modification time captured when the record was created; `None` if it couldn't be read
    pub last_write: Option<SystemTime>,
}

/// Flattened view of a top-level shader and everything it transitively includes.
///
/// Built by one resolution pass and replaced wholesale on reload.
#[derive(Clone, Debug, Default)]
pub struct ShaderFile {
    /// Top-level path as requested by the caller
    pub filename: PathBuf,

    /// Include-expanded source annotated with `#line <line> <file index>` directives
    pub source_string: String,

    /// Inclusion table; index 0 is the top-level file. Indices match the
    /// file numbers in the injected `#line` directives.
    pub files: Vec<FileRecord>,

    /// Recoverable problems met during resolution
    pub diagnostics: Vec<Diagnostic>,
}

/// Result of comparing a `ShaderFile`'s recorded timestamps against the filesystem
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Staleness {
    Fresh,

    /// `path` was written to after the unit was resolved
    Stale { path: PathBuf },

    /// The timestamp of `path` can't be read; hot reload should be given up on
    Unavailable { path: PathBuf },
}

impl ShaderFile {
    pub(crate) fn new(filename: PathBuf) -> Self {
        Self {
            filename,
            ..Default::default()
        }
    }

    /// True if resolution produced no source at all
    pub fn is_empty(&self) -> bool {
        self.source_string.trim().is_empty()
    }

    pub fn file_path(&self, index: usize) -> Option<&Path> {
        self.files.get(index).map(|f| f.path.as_path())
    }

    /// Chain of table indices from `index` up to the top-level file, `index` first.
    pub fn inclusion_chain(&self, index: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = Some(index);

        while let Some(i) = current {
            if i >= self.files.len() || chain.contains(&i) {
                break;
            }
            chain.push(i);
            current = self.files[i].parent;
        }

        chain
    }

    /// Checks every file of the unit against `oracle`. Never modifies the unit.
    pub fn staleness<O: TimestampOracle + ?Sized>(&self, oracle: &O) -> Staleness {
        for record in &self.files {
            let recorded = match record.last_write {
                Some(t) => t,
                None => {
                    return Staleness::Unavailable {
                        path: record.path.clone(),
                    }
                }
            };

            match oracle.last_write(&record.path) {
                Ok(current) if current > recorded => {
                    return Staleness::Stale {
                        path: record.path.clone(),
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    log::warn!(
                        "cannot read modification time of {}: {}",
                        record.path.display(),
                        err
                    );
                    return Staleness::Unavailable {
                        path: record.path.clone(),
                    };
                }
            }
        }

        Staleness::Fresh
    }

    /// Whether any file of the unit changed since it was resolved.
    /// Unreadable timestamps count as "no".
    pub fn should_reload<O: TimestampOracle + ?Sized>(&self, oracle: &O) -> bool {
        matches!(self.staleness(oracle), Staleness::Stale { .. })
    }
}
