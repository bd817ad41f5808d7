use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;

/// Descriptive information about a feature, including computed dependents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsMetadata {
    /// Canonical feature name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub owners: Option<String>,

    /// Features that import this one directly; `None` when there are none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependents: Option<Vec<String>>,

    /// Resolved path of the feature file
    pub path: PathBuf,
}
