//! Runner configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in suite defaults
//! 2. **Configuration file** – `.ingress-conformance.toml` in the current
//!    directory, home directory, or XDG config directory
//! 3. **Environment variables** – `INGRESS_CONFORMANCE_FORMAT`,
//!    `INGRESS_CONFORMANCE_TAGS`, and so on
//! 4. **Command-line arguments** – `--format`, `--tags`, `--manifests`, ...
//!
//! # Configuration File
//!
//! ```toml
//! format = "junit"
//! output_file = "conformance.xml"
//! tags = "@default-backend and not @slow"
//! manifests = "./manifests"
//! ingress_class = "nginx"
//! features = "features/default_backend.feature,features/without_host.feature"
//! ```

use std::fmt;
use std::str::FromStr;

use camino::{Utf8Path, Utf8PathBuf};
use cucumber::gherkin::tagexpr::TagOperation;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::error::ConformanceError;

/// Fixture directory used when none is configured.
pub const DEFAULT_MANIFESTS: &str = "./manifests";

/// Ingress class annotation value used when none is configured.
pub const DEFAULT_INGRESS_CLASS: &str = "conformance";

/// Feature files run when none are configured.
pub const DEFAULT_FEATURES: &[&str] = &[
    "features/default_backend.feature",
    "features/without_host.feature",
];

/// Report format written by the runner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable progress on stdout.
    #[default]
    Pretty,
    /// Cucumber JSON report.
    Cucumber,
    /// `JUnit` XML report.
    JUnit,
}

impl FromStr for OutputFormat {
    type Err = ConformanceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "cucumber" | "json" => Ok(Self::Cucumber),
            "junit" => Ok(Self::JUnit),
            _ => Err(ConformanceError::Configuration {
                message: format!(
                    "unknown output format {value:?} (expected pretty, cucumber, or junit)"
                ),
            }),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pretty => "pretty",
            Self::Cucumber => "cucumber",
            Self::JUnit => "junit",
        };
        f.write_str(name)
    }
}

/// Runner configuration supporting CLI, environment, and file sources.
///
/// # Example
///
/// ```no_run
/// use ingress_conformance::ConformanceConfig;
/// use ortho_config::OrthoConfig;
///
/// let config = ConformanceConfig::load().expect("failed to load configuration");
/// config.validate().expect("invalid configuration");
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "INGRESS_CONFORMANCE",
    discovery(
        dotfile_name = ".ingress-conformance.toml",
        config_file_name = "ingress-conformance.toml",
        app_name = "ingress-conformance"
    )
)]
pub struct ConformanceConfig {
    /// Report format: `pretty` (default), `cucumber` (alias `json`), or
    /// `junit`.
    #[ortho_config(cli_short = 'f')]
    pub format: Option<String>,

    /// Tag expression selecting scenarios, e.g. `@smoke and not @slow`.
    #[ortho_config(cli_short = 't')]
    pub tags: Option<String>,

    /// Stops the run at the first failing step.
    ///
    /// Environment variables cannot set booleans; use the CLI or a
    /// configuration file.
    #[ortho_config()]
    pub stop_on_failure: bool,

    /// Disables coloured output in the pretty format.
    #[ortho_config()]
    pub no_colors: bool,

    /// File the report is written to instead of stdout.
    #[ortho_config(cli_short = 'o')]
    pub output_file: Option<String>,

    /// Directory containing the fixture manifests.
    #[ortho_config(cli_short = 'm')]
    pub manifests: Option<String>,

    /// Uses the manifests compiled into the binary instead of a directory.
    #[ortho_config()]
    pub embedded_manifests: bool,

    /// Value of the `kubernetes.io/ingress.class` annotation. An empty value
    /// leaves the annotation unset.
    #[ortho_config()]
    pub ingress_class: Option<String>,

    /// Comma-separated feature files or directories to run.
    #[ortho_config()]
    pub features: Option<String>,

    /// Kubeconfig file. Defaults to in-cluster configuration or `KUBECONFIG`.
    #[ortho_config()]
    pub kubeconfig: Option<String>,
}

impl ConformanceConfig {
    /// Parses the configured report format.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Configuration`] for unknown formats.
    pub fn output_format(&self) -> Result<OutputFormat, ConformanceError> {
        self.format
            .as_deref()
            .map_or(Ok(OutputFormat::Pretty), OutputFormat::from_str)
    }

    /// Parses the configured tag expression.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Configuration`] when the expression does
    /// not parse.
    pub fn tag_expression(&self) -> Result<Option<TagOperation>, ConformanceError> {
        let Some(tags) = self.tags.as_deref().map(str::trim).filter(|tags| !tags.is_empty())
        else {
            return Ok(None);
        };
        tags.parse::<TagOperation>()
            .map(Some)
            .map_err(|error| ConformanceError::Configuration {
                message: format!("invalid tag expression {tags:?}: {error}"),
            })
    }

    /// Returns the fixture directory.
    #[must_use]
    pub fn manifests_dir(&self) -> &Utf8Path {
        Utf8Path::new(self.manifests.as_deref().unwrap_or(DEFAULT_MANIFESTS))
    }

    /// Returns the Ingress class annotation value, if any.
    #[must_use]
    pub fn ingress_class(&self) -> Option<&str> {
        match self.ingress_class.as_deref() {
            None => Some(DEFAULT_INGRESS_CLASS),
            Some("") => None,
            Some(class) => Some(class),
        }
    }

    /// Returns the feature paths to run.
    #[must_use]
    pub fn feature_paths(&self) -> Vec<Utf8PathBuf> {
        self.features.as_deref().map_or_else(
            || DEFAULT_FEATURES.iter().map(Utf8PathBuf::from).collect(),
            |features| {
                features
                    .split(',')
                    .map(str::trim)
                    .filter(|path| !path.is_empty())
                    .map(Utf8PathBuf::from)
                    .collect()
            },
        )
    }

    /// Returns the report file, if configured.
    #[must_use]
    pub fn output_path(&self) -> Option<&Utf8Path> {
        self.output_file.as_deref().map(Utf8Path::new)
    }

    /// Returns the kubeconfig file, if configured.
    #[must_use]
    pub fn kubeconfig_path(&self) -> Option<&Utf8Path> {
        self.kubeconfig.as_deref().map(Utf8Path::new)
    }

    /// Checks the configuration before any cluster work starts.
    ///
    /// # Errors
    ///
    /// Returns [`ConformanceError::Configuration`] when the format or tag
    /// expression is invalid, no features are selected, or the manifests
    /// directory is missing while embedded manifests are disabled.
    pub fn validate(&self) -> Result<(), ConformanceError> {
        self.output_format()?;
        self.tag_expression()?;

        if self.feature_paths().is_empty() {
            return Err(ConformanceError::Configuration {
                message: "no feature files selected".to_owned(),
            });
        }

        if !self.embedded_manifests && !self.manifests_dir().is_dir() {
            return Err(ConformanceError::Configuration {
                message: format!(
                    "manifests directory {} does not exist (use --manifests or \
                     --embedded-manifests)",
                    self.manifests_dir()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
