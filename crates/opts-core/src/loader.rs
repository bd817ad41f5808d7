//! Loader for feature files under one or more config roots
//!
//! Every file with a recognized extension becomes a feature named after its
//! path relative to the root, extension stripped:
//!
//! ```text
//! configs/
//!   .opts/
//!     config.json        <- builder settings, never a feature
//!   base.json            <- "base"
//!   team/
//!     payments.yaml      <- "team/payments"
//! ```

use crate::schema::{ConditionExpression, Feature, FeatureFile};
use crate::validation::{FeatureValidator, StructuralValidator};
use crate::{Error, Result};
use opts_fs::{FeatureFileStore, NormalizedPath, OptsPath, is_recognized_extension};
use std::collections::BTreeMap;
use std::sync::Arc;
use walkdir::{DirEntry, WalkDir};

/// Loads features from config roots.
#[derive(Clone)]
pub struct FeatureLoader {
    store: FeatureFileStore,
    validator: Arc<dyn FeatureValidator>,
}

impl FeatureLoader {
    /// Create a loader using the built-in structural validator.
    pub fn new() -> Self {
        Self::with_validator(Arc::new(StructuralValidator::new()))
    }

    /// Create a loader that validates documents with `validator`.
    pub fn with_validator(validator: Arc<dyn FeatureValidator>) -> Self {
        Self {
            store: FeatureFileStore::new(),
            validator,
        }
    }

    /// Load every feature under each root, in order.
    ///
    /// A feature in a later root replaces a feature with the same canonical
    /// name from an earlier root.
    pub fn load_all(&self, roots: &[NormalizedPath]) -> Result<BTreeMap<String, Feature>> {
        let mut features = BTreeMap::new();
        for root in roots {
            for (name, feature) in self.load_root(root)? {
                if let Some(previous) = features.insert(name, feature) {
                    tracing::debug!(
                        feature = %previous.name,
                        overridden = %previous.path,
                        "Feature replaced by a later root"
                    );
                }
            }
        }
        Ok(features)
    }

    /// Load every feature under a single root.
    pub fn load_root(&self, root: &NormalizedPath) -> Result<BTreeMap<String, Feature>> {
        if !root.is_dir() {
            return Err(Error::Load {
                path: root.to_native(),
                message: "config root is not a directory".into(),
            });
        }

        let mut features: BTreeMap<String, Feature> = BTreeMap::new();
        let walker = WalkDir::new(root.to_native())
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_metadata_dir(entry));

        for entry in walker {
            let entry = entry.map_err(|e| Error::Load {
                path: e
                    .path()
                    .map(|p| p.to_path_buf())
                    .unwrap_or_else(|| root.to_native()),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = NormalizedPath::new(entry.path());
            if !path.extension().is_some_and(is_recognized_extension) {
                tracing::trace!(path = %path, "Skipping unrecognized file");
                continue;
            }

            let feature = self.load_file(root, &path)?;
            if let Some(existing) = features.get(&feature.name) {
                return Err(Error::DuplicateFeature {
                    name: feature.name,
                    first: existing.path.to_native(),
                    second: path.to_native(),
                });
            }
            features.insert(feature.name.clone(), feature);
        }

        tracing::debug!(root = %root, count = features.len(), "Loaded config root");
        Ok(features)
    }

    /// Load a single feature file found under `root`.
    pub fn load_file(&self, root: &NormalizedPath, path: &NormalizedPath) -> Result<Feature> {
        let name = feature_name(root, path)?;

        let document = self.store.load_value(path).map_err(|e| Error::Load {
            path: path.to_native(),
            message: e.to_string(),
        })?;
        self.validator.validate(path, &document)?;

        let file: FeatureFile = serde_json::from_value(document).map_err(|e| Error::Load {
            path: path.to_native(),
            message: e.to_string(),
        })?;
        let conditions = file
            .conditions
            .as_ref()
            .map(ConditionExpression::from_value)
            .transpose()
            .map_err(|message| Error::InvalidCondition {
                feature: name.clone(),
                message,
            })?;

        tracing::debug!(feature = %name, path = %path, "Loaded feature");
        Ok(Feature::new(name, path.clone(), root.clone(), file, conditions))
    }
}

impl Default for FeatureLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Canonical name of the feature stored at `path` under `root`.
pub fn feature_name(root: &NormalizedPath, path: &NormalizedPath) -> Result<String> {
    let relative = path.relative_to(root).ok_or_else(|| Error::Load {
        path: path.to_native(),
        message: format!("file is not inside config root {root}"),
    })?;
    Ok(relative.without_extension().as_str().to_string())
}

fn is_metadata_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry.file_name() == OptsPath::MetadataDir.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_name_strips_root_and_extension() {
        let root = NormalizedPath::new("/cfg");
        let path = NormalizedPath::new("/cfg/team/payments.yaml");
        assert_eq!(feature_name(&root, &path).unwrap(), "team/payments");
    }

    #[test]
    fn feature_name_outside_root_is_an_error() {
        let root = NormalizedPath::new("/cfg");
        let path = NormalizedPath::new("/other/a.json");
        assert!(matches!(
            feature_name(&root, &path),
            Err(Error::Load { .. })
        ));
    }

    #[test]
    fn missing_root_is_a_load_error() {
        let loader = FeatureLoader::new();
        let err = loader
            .load_root(&NormalizedPath::new("/nonexistent/configs"))
            .unwrap_err();
        assert!(matches!(err, Error::Load { .. }));
    }
}
