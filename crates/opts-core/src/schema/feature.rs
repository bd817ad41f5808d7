//! Feature file documents and loaded feature records

use super::{ConditionExpression, OptionsMetadata};
use opts_fs::NormalizedPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// The decoded content of a single feature file.
///
/// ```yaml
/// imports:
///   - team/base
/// conditions:
///   jsonPointer: /env
///   equals: prod
/// metadata:
///   aliases: [prod]
///   owners: platform-team
/// options:
///   server:
///     port: 8080
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureFile {
    #[serde(default)]
    pub options: Map<String, Value>,

    #[serde(default)]
    pub imports: Vec<String>,

    /// Raw condition expression, parsed by the loader
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,

    #[serde(default)]
    pub metadata: FeatureMetadata,

    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
}

/// Descriptive fields declared in a feature file's `metadata` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owners: Option<String>,
}

/// A loaded feature.
///
/// After import resolution `options` holds the feature's imports merged with
/// its own declarations, and `dependents` lists the features importing it.
#[derive(Debug, Clone)]
pub struct Feature {
    /// Canonical name: path relative to its root, extension stripped
    pub name: String,
    pub path: NormalizedPath,
    /// Config root the file was found under
    pub root: NormalizedPath,
    pub conditions: Option<ConditionExpression>,
    pub imports: Vec<String>,
    pub options: Map<String, Value>,
    pub metadata: FeatureMetadata,
    pub dependents: BTreeSet<String>,
}

impl Feature {
    /// Build an unresolved feature from its decoded file.
    pub fn new(
        name: impl Into<String>,
        path: NormalizedPath,
        root: NormalizedPath,
        file: FeatureFile,
        conditions: Option<ConditionExpression>,
    ) -> Self {
        Self {
            name: name.into(),
            path,
            root,
            conditions,
            imports: file.imports,
            options: file.options,
            metadata: file.metadata,
            dependents: BTreeSet::new(),
        }
    }

    pub fn has_conditions(&self) -> bool {
        self.conditions.is_some()
    }

    /// Aliases declared in the file, empty when none.
    pub fn aliases(&self) -> &[String] {
        self.metadata.aliases.as_deref().unwrap_or_default()
    }

    /// The metadata view exposed to callers.
    pub fn options_metadata(&self) -> OptionsMetadata {
        OptionsMetadata {
            name: self.name.clone(),
            aliases: self.metadata.aliases.clone(),
            details: self.metadata.details.clone(),
            owners: self.metadata.owners.clone(),
            dependents: if self.dependents.is_empty() {
                None
            } else {
                Some(self.dependents.iter().cloned().collect())
            },
            path: self.path.to_native(),
        }
    }
}
