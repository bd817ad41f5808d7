//! Structural validation of decoded feature files

use crate::{Error, Result};
use opts_fs::NormalizedPath;
use serde_json::Value;

/// Checks a decoded feature document before it is turned into a feature.
///
/// The built-in [`StructuralValidator`] checks top-level keys and their
/// types; a JSON Schema validator can be plugged in through this trait.
pub trait FeatureValidator: Send + Sync {
    fn validate(&self, path: &NormalizedPath, document: &Value) -> Result<()>;
}

/// Validates the shape of a feature document without an external schema.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuralValidator;

impl StructuralValidator {
    pub fn new() -> Self {
        Self
    }
}

impl FeatureValidator for StructuralValidator {
    fn validate(&self, path: &NormalizedPath, document: &Value) -> Result<()> {
        let invalid = |message: String| Error::SchemaValidation {
            path: path.to_native(),
            message,
        };

        let object = document.as_object().ok_or_else(|| {
            invalid(format!(
                "expected an object at the top level, found {}",
                type_name(document)
            ))
        })?;

        for (key, value) in object {
            match key.as_str() {
                "options" => expect_object(value, "options").map_err(invalid)?,
                "imports" => expect_string_array(value, "imports").map_err(invalid)?,
                "conditions" => expect_object(value, "conditions").map_err(invalid)?,
                "$schema" => {
                    if !value.is_string() {
                        return Err(invalid(format!(
                            "`$schema` must be a string, found {}",
                            type_name(value)
                        )));
                    }
                }
                "metadata" => {
                    let metadata = value.as_object().ok_or_else(|| {
                        invalid(format!("`metadata` must be an object, found {}", type_name(value)))
                    })?;
                    for (field, value) in metadata {
                        match field.as_str() {
                            "aliases" => {
                                expect_string_array(value, "metadata.aliases").map_err(invalid)?
                            }
                            "owners" => {
                                if !value.is_string() {
                                    return Err(invalid(format!(
                                        "`metadata.owners` must be a string, found {}",
                                        type_name(value)
                                    )));
                                }
                            }
                            "details" => {}
                            // computed during import resolution; a declared value is ignored
                            "dependents" => {}
                            other => {
                                return Err(invalid(format!("unknown metadata field `{other}`")));
                            }
                        }
                    }
                }
                other => return Err(invalid(format!("unknown top-level key `{other}`"))),
            }
        }

        Ok(())
    }
}

fn expect_object(value: &Value, field: &str) -> std::result::Result<(), String> {
    if value.is_object() {
        Ok(())
    } else {
        Err(format!("`{field}` must be an object, found {}", type_name(value)))
    }
}

fn expect_string_array(value: &Value, field: &str) -> std::result::Result<(), String> {
    match value.as_array() {
        Some(items) if items.iter().all(Value::is_string) => Ok(()),
        Some(_) => Err(format!("`{field}` must contain only strings")),
        None => Err(format!("`{field}` must be an array, found {}", type_name(value))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
