//! Unit tests for fixture file sources.

use camino::{Utf8Path, Utf8PathBuf};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::{EmbeddedFileSource, FileSource, RootFileSource, exists, read};
use crate::error::ConformanceError;

struct Fixtures {
    _dir: TempDir,
    root: Utf8PathBuf,
}

#[fixture]
fn fixtures() -> Fixtures {
    let dir = TempDir::new().expect("temporary directory should be created");
    let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).expect("temp path should be UTF-8");
    std::fs::create_dir_all(root.join("without-host")).expect("fixture dir should be created");
    std::fs::write(root.join("without-host/ing.yaml"), "kind: Ingress\n")
        .expect("fixture should be written");
    Fixtures { _dir: dir, root }
}

#[rstest]
fn root_source_reads_relative_paths(fixtures: Fixtures) {
    let source = RootFileSource::new(fixtures.root.clone());

    let content = source
        .read_test_file(Utf8Path::new("without-host/ing.yaml"))
        .expect("read should succeed");

    assert_eq!(content.as_deref(), Some(b"kind: Ingress\n".as_slice()));
}

#[rstest]
fn root_source_reads_absolute_paths_directly(fixtures: Fixtures) {
    let source = RootFileSource::new("/nonexistent-root");
    let absolute = fixtures.root.join("without-host/ing.yaml");

    let content = source
        .read_test_file(&absolute)
        .expect("read should succeed");

    assert!(content.is_some(), "absolute path should bypass the root");
}

#[rstest]
#[case::missing_file("without-host/secret.yaml")]
#[case::missing_directory("no-such-dir/ing.yaml")]
fn root_source_reports_missing_files_as_none(fixtures: Fixtures, #[case] path: &str) {
    let source = RootFileSource::new(fixtures.root.clone());

    let content = source
        .read_test_file(Utf8Path::new(path))
        .expect("missing files are not fatal");

    assert!(content.is_none(), "expected no content for {path}");
    assert!(!exists(&source, Utf8Path::new(path)));
}

#[rstest]
fn read_explains_where_files_were_expected(fixtures: Fixtures) {
    let source = RootFileSource::new(fixtures.root.clone());

    let error = read(&source, Utf8Path::new("without-host/secret.yaml"))
        .expect_err("missing file should fail");

    let ConformanceError::FixtureNotFound { path, description } = error else {
        panic!("expected FixtureNotFound, got {error:?}");
    };
    assert_eq!(path, "without-host/secret.yaml");
    assert!(
        description.contains(fixtures.root.as_str()),
        "description should name the root: {description}"
    );
}

#[rstest]
fn relative_root_description_includes_resolved_path() {
    let source = RootFileSource::new("manifests");

    let description = source.describe_files();

    assert!(description.starts_with("Test files are expected in \"manifests\" = "));
    assert!(description.ends_with('.'));
}

#[rstest]
fn embedded_source_serves_registered_files() {
    let source = EmbeddedFileSource::new("test assets", [("dir/a.yaml", b"a: 1\n".as_slice())]);

    assert_eq!(
        source
            .read_test_file(Utf8Path::new("./dir/a.yaml"))
            .expect("read should succeed")
            .as_deref(),
        Some(b"a: 1\n".as_slice())
    );
    assert!(exists(&source, Utf8Path::new("dir/a.yaml")));
    assert!(!exists(&source, Utf8Path::new("dir/b.yaml")));
}

#[rstest]
fn embedded_source_lists_files_when_missing() {
    let source = EmbeddedFileSource::new("test assets", [("dir/a.yaml", b"a: 1\n".as_slice())]);

    let error = read(&source, Utf8Path::new("dir/b.yaml")).expect_err("missing file should fail");

    assert!(
        error.to_string().contains("dir/a.yaml"),
        "error should list available files: {error}"
    );
}

#[rstest]
fn bundled_manifests_include_fixture_directories() {
    let source = EmbeddedFileSource::bundled_manifests();

    for path in ["without-host/ing.yaml", "without-host/rc.yaml", "without-host/svc.yaml"] {
        assert!(exists(&source, Utf8Path::new(path)), "{path} should be bundled");
    }
}
