//! YAML to JSON conversion for fixture manifests.
//!
//! Manifests are parsed with yaml-rust2 and turned into `serde_json::Value`
//! so that the typed Kubernetes objects can be deserialized with serde.

use serde_json::{Map, Number, Value};
use yaml_rust2::{Yaml, YamlLoader};

/// Parses the first YAML document in `input`.
///
/// Returns `Value::Null` for empty input.
///
/// # Errors
///
/// Returns a message describing the scanner error or unsupported node.
pub fn parse_yaml(input: &str) -> Result<Value, String> {
    let documents = YamlLoader::load_from_str(input).map_err(|error| error.to_string())?;
    documents
        .into_iter()
        .next()
        .map_or(Ok(Value::Null), yaml_to_json)
}

/// Converts manifest text to a JSON value. JSON input is parsed
/// directly, anything else is treated as YAML.
///
/// # Errors
///
/// Returns a message describing the parse failure.
pub fn to_json(input: &str) -> Result<Value, String> {
    if input.trim_start().starts_with('{') {
        serde_json::from_str(input).map_err(|error| error.to_string())
    } else {
        parse_yaml(input)
    }
}

fn key_to_string(key: Yaml) -> Result<String, String> {
    match key {
        Yaml::String(text) | Yaml::Real(text) => Ok(text),
        Yaml::Integer(number) => Ok(number.to_string()),
        Yaml::Boolean(flag) => Ok(flag.to_string()),
        Yaml::Null => Ok("null".to_owned()),
        _ => Err("unsupported YAML key type".to_owned()),
    }
}

fn yaml_to_json(yaml: Yaml) -> Result<Value, String> {
    match yaml {
        Yaml::Null => Ok(Value::Null),
        Yaml::Boolean(flag) => Ok(Value::Bool(flag)),
        Yaml::Integer(number) => Ok(Value::Number(number.into())),
        Yaml::Real(text) => {
            let parsed: f64 = text
                .parse()
                .map_err(|error: std::num::ParseFloatError| error.to_string())?;
            Ok(Number::from_f64(parsed).map_or(Value::Null, Value::Number))
        }
        Yaml::String(text) => Ok(Value::String(text)),
        Yaml::Array(items) => items
            .into_iter()
            .map(yaml_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Yaml::Hash(entries) => entries
            .into_iter()
            .map(|(key, value)| Ok((key_to_string(key)?, yaml_to_json(value)?)))
            .collect::<Result<Map<String, Value>, String>>()
            .map(Value::Object),
        Yaml::Alias(_) => Err("YAML aliases are not supported".to_owned()),
        Yaml::BadValue => Err("bad YAML value".to_owned()),
    }
}
