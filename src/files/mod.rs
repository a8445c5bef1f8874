//! Pluggable access to fixture files.
//!
//! Steps read manifests through a [`FileSource`] so the same logic works
//! whether fixtures live on disk next to the suite ([`RootFileSource`]) or are
//! compiled into the test binary ([`EmbeddedFileSource`]). The source is chosen
//! once at startup and shared read-only afterwards.

mod embedded;
mod root;

pub use embedded::EmbeddedFileSource;
pub use root::RootFileSource;

use std::fmt;

use camino::Utf8Path;

use crate::error::ConformanceError;

/// One way of retrieving test file content.
pub trait FileSource: Send + Sync + fmt::Debug {
    /// Returns the file content, or `None` when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error for every failure other than a missing file.
    fn read_test_file(&self, path: &Utf8Path) -> Result<Option<Vec<u8>>, ConformanceError>;

    /// Multi-line description of which files this source provides, used when
    /// a file cannot be found.
    fn describe_files(&self) -> String;
}

/// Reads `path` from `source`, turning a missing file into an error that tells
/// the reader where files were expected.
///
/// # Errors
///
/// Returns [`ConformanceError::FixtureNotFound`] for missing files and
/// propagates any other failure from the source.
pub fn read(source: &dyn FileSource, path: &Utf8Path) -> Result<Vec<u8>, ConformanceError> {
    source
        .read_test_file(path)?
        .ok_or_else(|| ConformanceError::FixtureNotFound {
            path: path.to_string(),
            description: source.describe_files(),
        })
}

/// Checks whether `path` can be read from `source`.
///
/// Read failures count as absent.
#[must_use]
pub fn exists(source: &dyn FileSource, path: &Utf8Path) -> bool {
    matches!(source.read_test_file(path), Ok(Some(_)))
}

#[cfg(test)]
mod tests;
