//! Options building: merge the active features' values for a key

use crate::merge::merge_into;
use crate::schema::Feature;
use crate::templating::TemplateContext;
use crate::{Error, Result};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Builds option values from resolved features.
pub struct OptionsBuilder<'a> {
    features: &'a BTreeMap<String, Feature>,
    templates: TemplateContext<'a>,
}

impl<'a> OptionsBuilder<'a> {
    pub fn new(features: &'a BTreeMap<String, Feature>, templates: TemplateContext<'a>) -> Self {
        Self {
            features,
            templates,
        }
    }

    /// Build the value for a possibly dotted `key` (`"server.tls.port"`).
    ///
    /// `active` must hold canonical names, already filtered by constraints,
    /// in merge order: later features win. The override registered under the
    /// root key is merged last. A missing nested segment yields `null`.
    pub fn build(
        &self,
        key: &str,
        active: &[String],
        overrides: Option<&Map<String, Value>>,
        configurable_strings: bool,
    ) -> Result<Value> {
        let mut segments = key.split('.');
        let root_key = segments.next().unwrap_or_default();

        let features = self.active_features(active)?;
        let declared = features
            .iter()
            .any(|feature| feature.options.contains_key(root_key))
            || overrides.is_some_and(|o| o.contains_key(root_key));
        if !declared {
            return Err(Error::MissingKey {
                key: root_key.to_string(),
                features: active.to_vec(),
            });
        }

        let mut value = self.merge_root(root_key, &features, overrides, configurable_strings)?;
        for segment in segments {
            value = match value {
                Value::Object(mut object) => object.remove(segment).unwrap_or(Value::Null),
                Value::Array(mut items) => match segment.parse::<usize>() {
                    Ok(index) if index < items.len() => items.swap_remove(index),
                    _ => Value::Null,
                },
                _ => Value::Null,
            };
            if value.is_null() {
                break;
            }
        }

        tracing::trace!(key, features = active.len(), "Built options");
        Ok(value)
    }

    /// Build every top-level key declared by the active features or the
    /// overrides.
    pub fn build_all(
        &self,
        active: &[String],
        overrides: Option<&Map<String, Value>>,
        configurable_strings: bool,
    ) -> Result<Map<String, Value>> {
        let features = self.active_features(active)?;
        let mut keys: BTreeSet<&str> = features
            .iter()
            .flat_map(|feature| feature.options.keys().map(String::as_str))
            .collect();
        if let Some(overrides) = overrides {
            keys.extend(overrides.keys().map(String::as_str));
        }

        keys.into_iter()
            .map(|key| {
                let value = self.merge_root(key, &features, overrides, configurable_strings)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    fn active_features(&self, active: &[String]) -> Result<Vec<&'a Feature>> {
        active
            .iter()
            .map(|name| {
                self.features.get(name).ok_or_else(|| Error::UnknownFeature {
                    name: name.clone(),
                })
            })
            .collect()
    }

    fn merge_root(
        &self,
        root_key: &str,
        features: &[&Feature],
        overrides: Option<&Map<String, Value>>,
        configurable_strings: bool,
    ) -> Result<Value> {
        let mut merged = None;
        for feature in features {
            if let Some(value) = feature.options.get(root_key) {
                merge_into(&mut merged, value);
            }
        }
        if let Some(value) = overrides.and_then(|o| o.get(root_key)) {
            merge_into(&mut merged, value);
        }

        let mut value = merged.unwrap_or(Value::Null);
        if configurable_strings {
            self.templates.render_value(&mut value)?;
        }
        Ok(value)
    }
}
