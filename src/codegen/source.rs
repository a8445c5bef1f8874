//! Reads step functions from Rust sources with `syn`.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use quote::ToTokens;
use syn::{FnArg, Item, LitStr, Type};

use super::{CodegenError, StepFunction};
use crate::files::{self, RootFileSource};

const STEP_ATTRIBUTES: [&str; 3] = ["given", "when", "then"];

fn io_error(path: &Utf8Path, error: &std::io::Error) -> CodegenError {
    CodegenError::Io {
        path: path.to_string(),
        message: error.to_string(),
    }
}

/// Lists the files directly inside `dir` whose extension is `extension`.
///
/// # Errors
///
/// Returns [`CodegenError::Io`] when the directory cannot be read.
pub fn files_with_extension(
    dir: &Utf8Path,
    extension: &str,
) -> Result<Vec<Utf8PathBuf>, CodegenError> {
    let handle = Dir::open_ambient_dir(dir, ambient_authority())
        .map_err(|error| io_error(dir, &error))?;
    let mut paths = Vec::new();
    for entry in handle.entries().map_err(|error| io_error(dir, &error))? {
        let dir_entry = entry.map_err(|error| io_error(dir, &error))?;
        let is_file = dir_entry
            .file_type()
            .map_err(|error| io_error(dir, &error))?
            .is_file();
        let name = dir_entry.file_name().map_err(|error| io_error(dir, &error))?;
        let path = dir.join(name);
        if is_file && path.extension() == Some(extension) {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Reference(reference) => {
            let mutability = if reference.mutability.is_some() { "mut " } else { "" };
            format!("&{mutability}{}", type_name(&reference.elem))
        }
        Type::Path(path) if path.qself.is_none() => path
            .path
            .segments
            .last()
            .map(|segment| segment.to_token_stream().to_string())
            .unwrap_or_default()
            .split_whitespace()
            .collect(),
        other => other.to_token_stream().to_string().split_whitespace().collect(),
    }
}

/// Returns the step attribute name and its `regex = "..."` value, if the
/// function has a `given`, `when`, or `then` attribute.
fn step_attribute(function: &syn::ItemFn) -> syn::Result<Option<(String, String)>> {
    for attribute in &function.attrs {
        let Some(keyword) = STEP_ATTRIBUTES
            .iter()
            .find(|name| attribute.path().is_ident(name))
        else {
            continue;
        };
        let mut expression = String::new();
        attribute.parse_nested_meta(|meta| {
            let value: LitStr = meta.value()?.parse()?;
            if meta.path.is_ident("regex") {
                expression = value.value();
            }
            Ok(())
        })?;
        return Ok(Some(((*keyword).to_owned(), expression)));
    }
    Ok(None)
}

/// Extracts the top-level functions of one Rust source file.
///
/// Arguments exclude the leading world parameter.
///
/// # Errors
///
/// Returns [`CodegenError::Source`] when the text is not valid Rust or a step
/// attribute is malformed.
pub fn extract_functions(path: &Utf8Path, text: &str) -> Result<Vec<StepFunction>, CodegenError> {
    let invalid = |error: &syn::Error| CodegenError::Source {
        path: path.to_string(),
        message: error.to_string(),
    };
    let file = syn::parse_file(text).map_err(|error| invalid(&error))?;

    file.items
        .iter()
        .filter_map(|item| match item {
            Item::Fn(function) => Some(function),
            _ => None,
        })
        .map(|function| {
            let attribute = step_attribute(function).map_err(|error| invalid(&error))?;
            let (keyword, expression) = attribute
                .map_or((None, String::new()), |(keyword, expression)| {
                    (Some(keyword), expression)
                });
            let arguments = function
                .sig
                .inputs
                .iter()
                .skip(1)
                .filter_map(|input| match input {
                    FnArg::Typed(typed) => Some(type_name(&typed.ty)),
                    FnArg::Receiver(_) => None,
                })
                .collect();
            Ok::<_, CodegenError>(StepFunction {
                name: function.sig.ident.to_string(),
                expression,
                arguments,
                keyword,
            })
        })
        .collect()
}

/// Extracts the functions of every `.rs` file directly inside `dir`, in path
/// order. A missing directory holds no functions.
///
/// # Errors
///
/// Returns [`CodegenError`] when a file cannot be read or parsed.
pub fn extract_functions_from_dir(dir: &Utf8Path) -> Result<Vec<StepFunction>, CodegenError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = files_with_extension(dir, "rs")?;
    paths.sort();

    let source = RootFileSource::new(dir);
    let mut functions = Vec::new();
    for path in paths {
        let name = Utf8Path::new(path.file_name().unwrap_or_default());
        let bytes = files::read(&source, name).map_err(|error| CodegenError::Io {
            path: path.to_string(),
            message: error.to_string(),
        })?;
        let text = String::from_utf8(bytes).map_err(|error| CodegenError::Source {
            path: path.to_string(),
            message: error.to_string(),
        })?;
        functions.extend(extract_functions(&path, &text)?);
    }
    Ok(functions)
}
