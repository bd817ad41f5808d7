//! Format-agnostic decoding of feature files

use crate::{Error, NormalizedPath, Result, io};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Supported feature file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    /// JSON with comments, trailing commas and unquoted keys
    Json5,
    Yaml,
}

impl FileFormat {
    /// Detect the format from a file extension (without the dot).
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "json5" => Some(Self::Json5),
            "yaml" | "yml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Human-readable name used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::Json5 => "JSON5",
            Self::Yaml => "YAML",
        }
    }

    /// Decode `content` into a JSON value tree.
    ///
    /// An empty YAML document decodes to an empty object.
    pub fn decode(&self, content: &str) -> std::result::Result<Value, String> {
        let value: Value = match self {
            Self::Json => serde_json::from_str(content).map_err(|e| e.to_string())?,
            Self::Json5 => json5::from_str(content).map_err(|e| e.to_string())?,
            Self::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string())?,
        };
        Ok(match value {
            Value::Null => Value::Object(Default::default()),
            other => other,
        })
    }
}

/// Reads feature files and builder settings from disk.
///
/// The format is detected from the file extension:
/// - `.json` -> JSON
/// - `.json5` -> JSON5
/// - `.yaml`, `.yml` -> YAML
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureFileStore;

impl FeatureFileStore {
    pub fn new() -> Self {
        Self
    }

    /// Load a file as a raw JSON value tree.
    pub fn load_value(&self, path: &NormalizedPath) -> Result<Value> {
        let extension = path.extension().unwrap_or("");
        let format = FileFormat::from_extension(extension).ok_or_else(|| {
            Error::UnsupportedFormat {
                extension: extension.to_string(),
            }
        })?;
        let content = io::read_text(path)?;
        tracing::trace!(path = %path, format = format.name(), "Decoding file");
        format.decode(&content).map_err(|message| Error::ConfigParse {
            path: path.to_native(),
            format: format.name().into(),
            message,
        })
    }

    /// Load a file and deserialize it into `T`.
    pub fn load<T: DeserializeOwned>(&self, path: &NormalizedPath) -> Result<T> {
        let value = self.load_value(path)?;
        serde_json::from_value(value).map_err(|e| Error::ConfigParse {
            path: path.to_native(),
            format: "JSON".into(),
            message: e.to_string(),
        })
    }
}
