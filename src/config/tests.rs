//! Unit tests for configuration loading and validation.

use camino::Utf8PathBuf;
use ortho_config::{MergeComposer, OrthoConfig};
use rstest::rstest;
use serde_json::{Value, json};
use tempfile::TempDir;

use super::{ConformanceConfig, DEFAULT_FEATURES, OutputFormat};
use crate::error::ConformanceError;

/// Applies a configuration layer to the composer based on the layer type.
fn apply_layer(composer: &mut MergeComposer, layer_type: &str, value: Value) {
    match layer_type {
        "defaults" => composer.push_defaults(value),
        "file" => composer.push_file(value, None),
        "environment" => composer.push_environment(value),
        "cli" => composer.push_cli(value),
        _ => panic!("unknown layer type: {layer_type}"),
    }
}

#[rstest]
#[case::file_overrides_defaults(
    vec![("defaults", json!({"format": "pretty"})), ("file", json!({"format": "junit"}))],
    "format",
    "junit"
)]
#[case::environment_overrides_file(
    vec![("file", json!({"tags": "@file"})), ("environment", json!({"tags": "@env"}))],
    "tags",
    "@env"
)]
#[case::cli_overrides_environment(
    vec![("environment", json!({"ingress_class": "env"})), ("cli", json!({"ingress_class": "cli"}))],
    "ingress_class",
    "cli"
)]
fn layers_apply_in_precedence_order(
    #[case] layers: Vec<(&str, Value)>,
    #[case] field: &str,
    #[case] expected: &str,
) {
    let mut composer = MergeComposer::new();
    for (layer_type, value) in layers {
        apply_layer(&mut composer, layer_type, value);
    }

    let config =
        ConformanceConfig::merge_from_layers(composer.layers()).expect("merge should succeed");

    let actual = match field {
        "format" => config.format.as_deref(),
        "tags" => config.tags.as_deref(),
        "ingress_class" => config.ingress_class.as_deref(),
        _ => panic!("unknown field: {field}"),
    };
    assert_eq!(actual, Some(expected));
}

#[rstest]
fn partial_overrides_preserve_lower_values() {
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({"manifests": "/srv/manifests", "stop_on_failure": true}),
        None,
    );
    composer.push_cli(json!({"format": "cucumber"}));

    let config =
        ConformanceConfig::merge_from_layers(composer.layers()).expect("merge should succeed");

    assert_eq!(config.manifests.as_deref(), Some("/srv/manifests"));
    assert!(config.stop_on_failure, "file value should survive");
    assert_eq!(config.output_format(), Ok(OutputFormat::Cucumber));
}

#[rstest]
#[case::pretty("pretty", OutputFormat::Pretty)]
#[case::cucumber("cucumber", OutputFormat::Cucumber)]
#[case::json_alias("json", OutputFormat::Cucumber)]
#[case::junit_upper("JUnit", OutputFormat::JUnit)]
fn known_formats_parse(#[case] name: &str, #[case] expected: OutputFormat) {
    let config = ConformanceConfig {
        format: Some(name.to_owned()),
        ..ConformanceConfig::default()
    };

    assert_eq!(config.output_format(), Ok(expected));
}

#[rstest]
fn unknown_format_is_rejected() {
    let config = ConformanceConfig {
        format: Some("html".to_owned()),
        ..ConformanceConfig::default()
    };

    let error = config.output_format().expect_err("html is not supported");

    assert!(error.to_string().contains("html"), "{error}");
}

#[rstest]
fn defaults_resolve_to_bundled_values() {
    let config = ConformanceConfig::default();

    assert_eq!(config.output_format(), Ok(OutputFormat::Pretty));
    assert_eq!(config.manifests_dir().as_str(), "./manifests");
    assert_eq!(config.ingress_class(), Some("conformance"));
    assert_eq!(
        config.feature_paths(),
        DEFAULT_FEATURES
            .iter()
            .map(Utf8PathBuf::from)
            .collect::<Vec<_>>()
    );
    assert!(config.tag_expression().expect("no tags is valid").is_none());
}

#[rstest]
fn empty_ingress_class_disables_annotation() {
    let config = ConformanceConfig {
        ingress_class: Some(String::new()),
        ..ConformanceConfig::default()
    };

    assert_eq!(config.ingress_class(), None);
}

#[rstest]
fn feature_list_is_split_on_commas() {
    let config = ConformanceConfig {
        features: Some("a.feature, dir/ ,,b.feature".to_owned()),
        ..ConformanceConfig::default()
    };

    assert_eq!(
        config.feature_paths(),
        vec![
            Utf8PathBuf::from("a.feature"),
            Utf8PathBuf::from("dir/"),
            Utf8PathBuf::from("b.feature"),
        ]
    );
}

#[rstest]
#[case::single("@smoke")]
#[case::compound("@default-backend and not @slow")]
fn tag_expressions_parse(#[case] tags: &str) {
    let config = ConformanceConfig {
        tags: Some(tags.to_owned()),
        ..ConformanceConfig::default()
    };

    assert!(config.tag_expression().expect("should parse").is_some());
}

#[rstest]
fn malformed_tag_expression_is_rejected() {
    let config = ConformanceConfig {
        tags: Some("@a and (".to_owned()),
        ..ConformanceConfig::default()
    };

    assert!(matches!(
        config.tag_expression(),
        Err(ConformanceError::Configuration { .. })
    ));
}

#[rstest]
fn validation_requires_a_manifests_directory() {
    let config = ConformanceConfig {
        manifests: Some("/nonexistent/manifests".to_owned()),
        ..ConformanceConfig::default()
    };

    let error = config.validate().expect_err("missing directory should fail");

    assert!(error.to_string().contains("/nonexistent/manifests"), "{error}");
}

#[rstest]
fn embedded_manifests_skip_the_directory_check() {
    let config = ConformanceConfig {
        manifests: Some("/nonexistent/manifests".to_owned()),
        embedded_manifests: true,
        ..ConformanceConfig::default()
    };

    assert_eq!(config.validate(), Ok(()));
}

#[rstest]
fn existing_directory_passes_validation() {
    let dir = TempDir::new().expect("temporary directory should be created");
    let config = ConformanceConfig {
        manifests: Some(dir.path().to_string_lossy().into_owned()),
        ..ConformanceConfig::default()
    };

    assert_eq!(config.validate(), Ok(()));
}

/// Loads configuration from `cli_args` with `environment` set and an empty
/// home directory, so no real configuration file is discovered.
fn load_with_environment(
    environment: &[(&str, Option<&str>)],
    cli_args: &[&str],
) -> ConformanceConfig {
    let temp_dir = TempDir::new().expect("temp dir should be created");
    let home = temp_dir.path().to_string_lossy().to_string();
    let mut variables: Vec<(&str, Option<&str>)> = vec![
        ("HOME", Some(home.as_str())),
        ("XDG_CONFIG_HOME", Some(home.as_str())),
    ];
    variables.extend_from_slice(environment);
    let _guard = env_lock::lock_env(variables);

    let mut args: Vec<std::ffi::OsString> = vec![std::ffi::OsString::from("ingress-conformance")];
    args.extend(cli_args.iter().map(std::ffi::OsString::from));

    ConformanceConfig::load_from_iter(args).expect("config should load")
}

#[rstest]
fn ingress_class_loads_from_environment_variable() {
    let config = load_with_environment(
        &[("INGRESS_CONFORMANCE_INGRESS_CLASS", Some("nginx"))],
        &[],
    );

    assert_eq!(config.ingress_class(), Some("nginx"));
}

#[rstest]
fn cli_flags_override_environment_variables() {
    let config = load_with_environment(
        &[("INGRESS_CONFORMANCE_FORMAT", Some("junit"))],
        &["--format", "cucumber"],
    );

    assert_eq!(
        config.output_format().expect("format should parse"),
        OutputFormat::Cucumber
    );
}
