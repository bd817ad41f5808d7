//! Error types for opts-core

use std::path::PathBuf;

/// Result type for opts-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or querying options
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A requested feature name is neither a canonical name nor an alias
    #[error("Unknown feature: {name}")]
    UnknownFeature { name: String },

    /// The import graph contains a cycle
    #[error("Import cycle detected: {}", path.join(" -> "))]
    CycleDetected { path: Vec<String> },

    /// A feature with conditions was used as an import target
    #[error("Feature '{feature}' imports '{import}', which has conditions. Conditions are only allowed on features that are requested directly")]
    ConditionsInImport { feature: String, import: String },

    /// Two features claim the same alias
    #[error("Alias '{alias}' of '{canonical}' is already used by '{existing}'")]
    DuplicateAlias {
        alias: String,
        existing: String,
        canonical: String,
    },

    /// The requested root key is declared by no active feature or override
    #[error("Key '{key}' was not found in any of the features: {}", features.join(", "))]
    MissingKey { key: String, features: Vec<String> },

    /// A feature file could not be decoded
    #[error("Failed to load {path}: {message}")]
    Load { path: PathBuf, message: String },

    /// A feature file has an invalid structure
    #[error("Invalid feature file {path}: {message}")]
    SchemaValidation { path: PathBuf, message: String },

    /// A cache was used in a way that would return wrong results
    #[error("Cache misuse: {message}")]
    CacheMisuse { message: String },

    /// An import is not a canonical feature name
    #[error("{}", invalid_import_message(feature, import, canonical.as_deref()))]
    InvalidImport {
        feature: String,
        import: String,
        canonical: Option<String>,
    },

    /// Two files in the same root map to the same canonical name
    #[error("Feature '{name}' is defined by both {first} and {second}")]
    DuplicateFeature {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A condition expression could not be parsed
    #[error("Invalid conditions in feature '{feature}': {message}")]
    InvalidCondition { feature: String, message: String },

    /// A configurable string could not be rendered
    #[error("Template error: {message}")]
    Template { message: String },

    /// Resolved options could not be converted into the requested type
    #[error("Failed to decode options for key '{key}': {message}")]
    Decode { key: String, message: String },

    /// The change source could not be set up
    #[error("Watch error: {message}")]
    Watch { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem error from opts-fs
    #[error(transparent)]
    Fs(#[from] opts_fs::Error),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn invalid_import_message(feature: &str, import: &str, canonical: Option<&str>) -> String {
    match canonical {
        Some(canonical) => format!(
            "Feature '{feature}' imports '{import}', which is an alias. Import the canonical name '{canonical}' instead"
        ),
        None => format!("Feature '{feature}' imports unknown feature '{import}'"),
    }
}

impl Error {
    /// Whether this error was caused by the request rather than the loaded files.
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownFeature { .. }
                | Self::MissingKey { .. }
                | Self::CacheMisuse { .. }
                | Self::Decode { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_lists_path() {
        let err = Error::CycleDetected {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "Import cycle detected: a -> b -> a");
    }

    #[test]
    fn invalid_import_suggests_canonical_name() {
        let err = Error::InvalidImport {
            feature: "child".into(),
            import: "B".into(),
            canonical: Some("base".into()),
        };
        assert!(err.to_string().contains("'base'"));
        assert!(!err.is_request_error());
    }
}
