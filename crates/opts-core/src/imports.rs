//! Import graph resolution
//!
//! Each feature's options become its imports merged in list order, followed
//! by its own declarations. Resolution also records the reverse edges
//! (dependents) of the import graph.

use crate::merge::merge_maps;
use crate::names::AliasMap;
use crate::schema::Feature;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

type Options = Map<String, Value>;

/// Resolve the imports of every feature in place.
///
/// On success each feature's `options` holds its fully merged options and its
/// `dependents` lists the features importing it directly. On failure the
/// features are left untouched.
pub fn resolve_imports(features: &mut BTreeMap<String, Feature>, aliases: &AliasMap) -> Result<()> {
    let mut resolver = ImportResolver::new(features, aliases);
    let names: Vec<String> = features.keys().cloned().collect();
    for name in &names {
        resolver.resolve(name, &mut Vec::new())?;
    }
    let mut resolved = resolver.resolved;
    let mut dependents = resolver.dependents;
    for (name, feature) in features.iter_mut() {
        if let Some(options) = resolved.remove(name) {
            feature.options = options;
        }
        feature.dependents = dependents.remove(name).unwrap_or_default();
    }
    Ok(())
}

struct ImportResolver<'a> {
    features: &'a BTreeMap<String, Feature>,
    aliases: &'a AliasMap,
    /// Fully resolved options, by canonical name
    resolved: HashMap<String, Options>,
    dependents: HashMap<String, BTreeSet<String>>,
}

impl<'a> ImportResolver<'a> {
    fn new(features: &'a BTreeMap<String, Feature>, aliases: &'a AliasMap) -> Self {
        Self {
            features,
            aliases,
            resolved: HashMap::new(),
            dependents: HashMap::new(),
        }
    }

    /// Depth-first resolution; `path` holds the features currently being
    /// resolved, outermost first.
    fn resolve(&mut self, name: &str, path: &mut Vec<String>) -> Result<Options> {
        if let Some(options) = self.resolved.get(name) {
            return Ok(options.clone());
        }
        if let Some(start) = path.iter().position(|entry| entry == name) {
            let mut cycle = path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(Error::CycleDetected { path: cycle });
        }

        let features = self.features;
        let feature = features.get(name).ok_or_else(|| Error::UnknownFeature {
            name: name.to_string(),
        })?;

        path.push(name.to_string());
        let mut merged = Options::new();
        for import in &feature.imports {
            let target = features
                .get(import)
                .ok_or_else(|| Error::InvalidImport {
                    feature: name.to_string(),
                    import: import.clone(),
                    canonical: self.aliases.get(import).map(str::to_string),
                })?;
            if target.has_conditions() {
                return Err(Error::ConditionsInImport {
                    feature: name.to_string(),
                    import: import.clone(),
                });
            }

            let imported = self.resolve(import, path)?;
            merge_maps(&mut merged, &imported);
            self.dependents
                .entry(import.clone())
                .or_default()
                .insert(name.to_string());
        }
        merge_maps(&mut merged, &feature.options);
        path.pop();

        tracing::trace!(feature = %name, imports = feature.imports.len(), "Resolved imports");
        self.resolved.insert(name.to_string(), merged.clone());
        Ok(merged)
    }
}
