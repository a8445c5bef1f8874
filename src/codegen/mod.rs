//! Keeps step definitions in sync with feature files.
//!
//! The codegen tool reads a feature file, turns every distinct step into the
//! step function that would match it, reads the step functions already
//! written in a Rust source directory, and reports what is missing or has the
//! wrong arguments. With `update` set it scaffolds the missing functions from
//! a template.

mod feature;
mod report;
mod scaffold;
mod snippet;
mod source;

pub use feature::{module_name, parse_feature, steps_from_feature};
pub use report::{ArgumentMismatch, SyncReport};
pub use scaffold::{DEFAULT_TEMPLATE, render_steps, scaffold_missing};
pub use snippet::{step_arguments, translate_step};
pub use source::{extract_functions, extract_functions_from_dir};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::files::FileSource;

/// Errors raised by the codegen tool.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodegenError {
    /// A feature file could not be read or parsed.
    #[error("cannot parse feature {path}: {message}")]
    Feature {
        /// Feature file path.
        path: String,
        /// Reader or parser detail.
        message: String,
    },

    /// A Rust source file could not be read or parsed.
    #[error("cannot parse Rust source {path}: {message}")]
    Source {
        /// Source file path.
        path: String,
        /// Reader or parser detail.
        message: String,
    },

    /// The scaffolding template is invalid or failed to render.
    #[error("template error: {message}")]
    Template {
        /// Template engine detail.
        message: String,
    },

    /// Reading or writing local files failed.
    #[error("I/O error on {path}: {message}")]
    Io {
        /// Path being accessed.
        path: String,
        /// Error detail.
        message: String,
    },
}

/// Type of a step argument.
pub const STRING_ARGUMENT: &str = "String";
/// Type of a numeric step argument.
pub const NUMBER_ARGUMENT: &str = "u16";
/// Type of the trailing argument of steps carrying a table or doc string.
pub const STEP_ARGUMENT: &str = "&Step";

/// A step function, either inferred from a feature file or found in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepFunction {
    /// Function name.
    pub name: String,
    /// Anchored regular expression matching the step text. Empty for source
    /// functions without a step attribute.
    pub expression: String,
    /// Argument types in order, excluding the world.
    pub arguments: Vec<String>,
    /// Step attribute, `given`, `when`, or `then`, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
}

/// Options for one codegen run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodegenOptions {
    /// Directory holding the step definition sources.
    pub conformance_path: Utf8PathBuf,
    /// Write scaffolding for missing steps.
    pub update: bool,
    /// Template used for scaffolding. `None` selects the built-in template.
    pub template: Option<String>,
}

/// Analyses one feature against the step sources and, when requested,
/// scaffolds the missing functions.
///
/// # Errors
///
/// Returns [`CodegenError`] when the feature or sources cannot be parsed, or
/// when scaffolding fails.
pub fn process_feature(
    source: &dyn FileSource,
    feature_path: &Utf8Path,
    options: &CodegenOptions,
) -> Result<SyncReport, CodegenError> {
    let feature = parse_feature(source, feature_path)?;
    let steps = steps_from_feature(&feature);
    let module = module_name(feature_path);
    let functions = extract_functions_from_dir(&options.conformance_path)?;
    let report = SyncReport::new(feature_path, &module, steps, functions);

    if options.update && !report.missing.is_empty() {
        let target = options.conformance_path.join(format!("{module}.rs"));
        let template = options.template.as_deref().unwrap_or(DEFAULT_TEMPLATE);
        scaffold_missing(&target, template, &report)?;
        info!(%target, missing = report.missing.len(), "scaffolded missing steps");
    }
    Ok(report)
}

/// Expands directories into the `.feature` files they contain, sorted by
/// path. Files are returned as given.
///
/// # Errors
///
/// Returns [`CodegenError::Io`] when a directory cannot be listed.
pub fn collect_feature_paths(paths: &[Utf8PathBuf]) -> Result<Vec<Utf8PathBuf>, CodegenError> {
    let mut features = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found = source::files_with_extension(path, "feature")?;
            found.sort();
            features.extend(found);
        } else {
            features.push(path.clone());
        }
    }
    Ok(features)
}
