//! YAML specification to JSON conversion.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::Value as Yaml;
use serde_json::Value as Json;

use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::manifest;

/// Errors that can occur when converting the specification.
#[derive(Debug, thiserror::Error)]
pub enum YamlError {
    #[error("Invalid YAML in {path}: {message}")]
    ParseError { path: String, message: String },

    #[error(transparent)]
    Build(#[from] BuildError),
}

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedSpec {
    /// Name before revisioning, e.g. `swagger.json`
    pub logical_name: String,

    /// File actually written to the output directory
    pub output_path: PathBuf,
}

/// Convert a YAML document to compact JSON.
pub fn convert_yaml_to_json(yaml: &str) -> Result<String, serde_yaml::Error> {
    let mut value: Yaml = serde_yaml::from_str(yaml)?;
    value.apply_merge()?;
    Ok(to_json(value).to_string())
}

/// Map a YAML value onto JSON the way a JavaScript serializer would.
pub fn to_json(value: Yaml) -> Json {
    match value {
        Yaml::Null => Json::Null,
        Yaml::Bool(b) => Json::Bool(b),
        Yaml::Number(n) => {
            if let Some(i) = n.as_i64() {
                Json::from(i)
            } else if let Some(u) = n.as_u64() {
                Json::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(Json::Number)
                    .unwrap_or(Json::Null)
            }
        }
        Yaml::String(s) => Json::String(s),
        Yaml::Sequence(items) => Json::Array(items.into_iter().map(to_json).collect()),
        Yaml::Mapping(map) => Json::Object(
            map.into_iter()
                .map(|(k, v)| (key_string(k), to_json(v)))
                .collect(),
        ),
        Yaml::Tagged(tagged) => to_json(tagged.value),
    }
}

/// Object keys are always strings in JSON.
fn key_string(key: Yaml) -> String {
    match key {
        Yaml::String(s) => s,
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        Yaml::Tagged(tagged) => key_string(tagged.value),
        other => to_json(other).to_string(),
    }
}

/// JSON name for a YAML file name (`swagger.yaml` -> `swagger.json`).
pub fn json_name(input: &Path) -> String {
    input
        .with_extension("json")
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("spec.json")
        .to_string()
}

/// Convert the configured specification into the output directory.
///
/// Returns `Ok(None)` after a warning when the input file does not exist.
pub fn run(config: &BuildConfig) -> Result<Option<ConvertedSpec>, YamlError> {
    let input = &config.input_file;
    if !input.exists() {
        tracing::warn!("No input file ['{}'] was found", input.display());
        return Ok(None);
    }

    let yaml = fs::read_to_string(input)
        .map_err(|e| BuildError::ReadError(format!("{}: {}", input.display(), e)))?;

    let json = convert_yaml_to_json(&yaml).map_err(|e| YamlError::ParseError {
        path: input.display().to_string(),
        message: e.to_string(),
    })?;

    let logical_name = json_name(input);
    let written_name = if config.revision {
        manifest::revision_name(&logical_name, json.as_bytes())
    } else {
        logical_name.clone()
    };

    fs::create_dir_all(&config.output_dir).map_err(|e| BuildError::WriteError(e.to_string()))?;
    let output_path = config.output_dir.join(&written_name);
    fs::write(&output_path, &json).map_err(|e| BuildError::WriteError(e.to_string()))?;

    manifest::record(
        &config.output_dir.join(&config.manifest_name),
        &logical_name,
        &written_name,
    )?;

    tracing::info!("Converted {} -> {}", input.display(), output_path.display());

    Ok(Some(ConvertedSpec {
        logical_name,
        output_path,
    }))
}
