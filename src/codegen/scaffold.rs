//! Scaffolding of missing step functions with a Jinja2 template.
//!
//! The template receives:
//! - `module`: module the functions are written to
//! - `feature`: feature file path
//! - `new_file`: `true` when the target file does not exist yet
//! - `functions`: the missing step functions, each with `name`,
//!   `expression`, `arguments`, and `keyword`

use std::fs::{self, OpenOptions};
use std::io::Write;

use camino::Utf8Path;
use minijinja::{Environment, context};

use super::{CodegenError, SyncReport};

/// Template used when none is supplied.
pub const DEFAULT_TEMPLATE: &str = include_str!("../../templates/steps.rs.jinja");

const TEMPLATE_NAME: &str = "steps";

/// Renders the missing functions of `report` with `template`.
///
/// # Errors
///
/// Returns [`CodegenError::Template`] when the template has syntax errors or
/// fails to render.
pub fn render_steps(
    template: &str,
    report: &SyncReport,
    new_file: bool,
) -> Result<String, CodegenError> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| minijinja::AutoEscape::None);
    env.add_template(TEMPLATE_NAME, template)
        .map_err(|error| CodegenError::Template {
            message: format!("invalid template syntax: {error}"),
        })?;

    let ctx = context! {
        module => &report.module,
        feature => &report.feature,
        new_file => new_file,
        functions => &report.missing,
    };
    env.get_template(TEMPLATE_NAME)
        .and_then(|tmpl| tmpl.render(ctx))
        .map_err(|error| CodegenError::Template {
            message: format!("template rendering failed: {error}"),
        })
}

/// Writes the missing functions of `report` to `target`, creating the file
/// and its directory when absent and appending otherwise.
///
/// # Errors
///
/// Returns [`CodegenError::Template`] when rendering fails and
/// [`CodegenError::Io`] when the file cannot be written.
pub fn scaffold_missing(
    target: &Utf8Path,
    template: &str,
    report: &SyncReport,
) -> Result<(), CodegenError> {
    let io_error = |error: std::io::Error| CodegenError::Io {
        path: target.to_string(),
        message: error.to_string(),
    };
    let new_file = !target.exists();
    let rendered = render_steps(template, report, new_file)?;

    if let Some(parent) = target.parent().filter(|dir| !dir.as_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(target)
        .map_err(io_error)?;
    file.write_all(rendered.as_bytes()).map_err(io_error)
}
