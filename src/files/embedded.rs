//! File source backed by assets compiled into the binary.

use std::collections::BTreeMap;

use camino::{Utf8Path, Utf8PathBuf};

use super::FileSource;
use crate::error::ConformanceError;

macro_rules! manifest {
    ($path:literal) => {
        (
            $path,
            include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/manifests/", $path)).as_slice(),
        )
    };
}

/// Fixtures shipped in the repository's `manifests/` directory.
const BUNDLED_MANIFESTS: &[(&str, &[u8])] = &[
    manifest!("default-backend/ing.yaml"),
    manifest!("default-backend/ing-without-backend.yaml"),
    manifest!("default-backend/rc.yaml"),
    manifest!("default-backend/svc.yaml"),
    manifest!("without-host/ing.yaml"),
    manifest!("without-host/rc.yaml"),
    manifest!("without-host/svc.yaml"),
];

/// Serves files from a static table of embedded assets.
#[derive(Debug, Clone)]
pub struct EmbeddedFileSource {
    label: String,
    files: BTreeMap<Utf8PathBuf, &'static [u8]>,
}

impl EmbeddedFileSource {
    /// Creates a source from `(path, content)` pairs.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        entries: impl IntoIterator<Item = (&'static str, &'static [u8])>,
    ) -> Self {
        let files = entries
            .into_iter()
            .map(|(path, content)| (normalise(Utf8Path::new(path)), content))
            .collect();
        Self {
            label: label.into(),
            files,
        }
    }

    /// Returns the manifests bundled with the suite.
    #[must_use]
    pub fn bundled_manifests() -> Self {
        Self::new("bundled manifests", BUNDLED_MANIFESTS.iter().copied())
    }

    /// Lists the embedded paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &Utf8Path> {
        self.files.keys().map(Utf8PathBuf::as_path)
    }
}

fn normalise(path: &Utf8Path) -> Utf8PathBuf {
    path.components()
        .filter(|component| !matches!(component, camino::Utf8Component::CurDir))
        .collect()
}

impl FileSource for EmbeddedFileSource {
    fn read_test_file(&self, path: &Utf8Path) -> Result<Option<Vec<u8>>, ConformanceError> {
        Ok(self
            .files
            .get(&normalise(path))
            .map(|content| content.to_vec()))
    }

    fn describe_files(&self) -> String {
        let mut description = format!("Test files are embedded in the binary ({}):", self.label);
        for path in self.paths() {
            description.push_str("\n    ");
            description.push_str(path.as_str());
        }
        description
    }
}
