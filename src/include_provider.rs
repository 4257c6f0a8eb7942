use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::BoxedIncludeProviderError;

/// Reports when a file was last written to.
///
/// Failure is expected on broken filesystems; callers degrade instead of erroring.
pub trait TimestampOracle {
    fn last_write(&self, path: &Path) -> Result<SystemTime, BoxedIncludeProviderError>;
}

/// User-supplied include reader
pub trait IncludeProvider: TimestampOracle {
    /// Normalizes the top-level path so that later includes of the same
    /// file compare equal to it.
    fn resolve_root(&self, path: &Path) -> PathBuf {
        path.to_path_buf()
    }

    /// Turns the quoted path of an `#include` directive found in `including_file`
    /// into a path `get_include` can read, or `None` if nothing matches.
    fn resolve_path(&self, path: &str, including_file: &Path) -> Option<PathBuf>;

    fn get_include(&mut self, path: &Path) -> Result<String, BoxedIncludeProviderError>;
}

/// Search-path lookup shared by providers.
///
/// With no `search_dirs`, the include is looked up next to `including_file`.
/// Otherwise each directory is tried in order and the first existing candidate wins.
pub fn resolve_in_search_dirs(
    path: &str,
    including_file: &Path,
    search_dirs: &[PathBuf],
    exists: impl Fn(&Path) -> bool,
) -> Option<PathBuf> {
    if search_dirs.is_empty() {
        let candidate = match including_file.parent() {
            Some(dir) => dir.join(path),
            None => PathBuf::from(path),
        };
        return if exists(&candidate) {
            Some(candidate)
        } else {
            None
        };
    }

    search_dirs
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| exists(candidate))
}

/// Reads shaders straight from disk, looking includes up in an ordered list of directories.
#[derive(Clone, Debug, Default)]
pub struct FileIncludeProvider {
    search_dirs: Vec<PathBuf>,
}

impl FileIncludeProvider {
    pub fn new<I, P>(search_dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_dirs: search_dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }
}

fn canonical_or_verbatim(path: PathBuf) -> PathBuf {
    std::fs::canonicalize(&path).unwrap_or(path)
}

impl TimestampOracle for FileIncludeProvider {
    fn last_write(&self, path: &Path) -> Result<SystemTime, BoxedIncludeProviderError> {
        Ok(std::fs::metadata(path)?.modified()?)
    }
}

impl IncludeProvider for FileIncludeProvider {
    fn resolve_root(&self, path: &Path) -> PathBuf {
        canonical_or_verbatim(path.to_path_buf())
    }

    fn resolve_path(&self, path: &str, including_file: &Path) -> Option<PathBuf> {
        resolve_in_search_dirs(path, including_file, &self.search_dirs, Path::is_file)
            .map(canonical_or_verbatim)
    }

    fn get_include(&mut self, path: &Path) -> Result<String, BoxedIncludeProviderError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
