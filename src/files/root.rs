//! File source rooted at a directory on disk.

use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

use super::FileSource;
use crate::error::ConformanceError;

/// Looks for files relative to a root directory.
///
/// Absolute paths bypass the root and are used as given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootFileSource {
    root: Utf8PathBuf,
}

impl RootFileSource {
    /// Creates a source rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the configured root directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn resolve(&self, path: &Utf8Path) -> Utf8PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.root.join(path)
        }
    }
}

/// Opens the directory holding `full_path` and returns it with the file name.
///
/// Returns `Ok(None)` when the directory is missing.
fn open_parent(full_path: &Utf8Path) -> io::Result<Option<(Dir, String)>> {
    let Some(name) = full_path.file_name() else {
        return Ok(None);
    };
    let parent = match full_path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };

    match Dir::open_ambient_dir(parent, ambient_authority()) {
        Ok(dir) => Ok(Some((dir, name.to_owned()))),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(error),
    }
}

fn io_failure(path: &Utf8Path, error: &io::Error) -> ConformanceError {
    ConformanceError::Io {
        message: format!("failed to read {path}: {error}"),
    }
}

fn absolute(path: &Utf8Path) -> Option<Utf8PathBuf> {
    std::path::absolute(path)
        .ok()
        .and_then(|absolute_path| Utf8PathBuf::try_from(absolute_path).ok())
}

impl FileSource for RootFileSource {
    fn read_test_file(&self, path: &Utf8Path) -> Result<Option<Vec<u8>>, ConformanceError> {
        let full_path = self.resolve(path);
        let Some((dir, name)) =
            open_parent(&full_path).map_err(|error| io_failure(&full_path, &error))?
        else {
            return Ok(None);
        };

        match dir.read(&name) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(io_failure(&full_path, &error)),
        }
    }

    fn describe_files(&self) -> String {
        let mut description = format!("Test files are expected in {:?}", self.root.as_str());
        if !self.root.is_absolute() {
            if let Some(resolved) = absolute(&self.root) {
                description.push_str(&format!(" = {:?}", resolved.as_str()));
            }
        }
        description.push('.');
        description
    }
}
