//! Canonical feature names and their case-insensitive aliases

use crate::schema::Feature;
use crate::{Error, Result};
use std::collections::{BTreeSet, HashMap};

/// Maps lower-cased aliases and canonical names to canonical names.
#[derive(Debug, Clone, Default)]
pub struct AliasMap {
    /// Lower-cased alias or canonical name -> canonical name
    entries: HashMap<String, String>,
    canonical: BTreeSet<String>,
    /// Declared aliases, original casing
    aliases: BTreeSet<String>,
}

impl AliasMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the map for a set of features.
    ///
    /// Every canonical name maps to itself. Fails with
    /// [`Error::DuplicateAlias`] when a key is claimed by two features.
    pub fn build<'a>(features: impl IntoIterator<Item = &'a Feature>) -> Result<Self> {
        let features: Vec<&Feature> = features.into_iter().collect();
        let mut map = Self::new();
        for feature in &features {
            map.insert_canonical(&feature.name)?;
        }
        for feature in &features {
            for alias in feature.aliases() {
                map.insert_alias(alias, &feature.name)?;
            }
        }
        Ok(map)
    }

    /// Register a canonical name.
    pub fn insert_canonical(&mut self, name: &str) -> Result<()> {
        self.claim(name, name)?;
        self.canonical.insert(name.to_string());
        Ok(())
    }

    /// Register `alias` for an already registered canonical name.
    pub fn insert_alias(&mut self, alias: &str, canonical: &str) -> Result<()> {
        self.claim(alias, canonical)?;
        self.aliases.insert(alias.to_string());
        Ok(())
    }

    fn claim(&mut self, key: &str, canonical: &str) -> Result<()> {
        let lowered = key.to_lowercase();
        match self.entries.get(&lowered) {
            Some(existing) if existing != canonical => Err(Error::DuplicateAlias {
                alias: key.to_string(),
                existing: existing.clone(),
                canonical: canonical.to_string(),
            }),
            Some(_) => Ok(()),
            None => {
                self.entries.insert(lowered, canonical.to_string());
                Ok(())
            }
        }
    }

    /// Look up the canonical name for a name or alias, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_lowercase())
            .or_else(|| self.canonical.get(name))
            .map(String::as_str)
    }

    /// Resolve a name or alias to its canonical name.
    pub fn resolve(&self, name: &str) -> Result<String> {
        self.get(name)
            .map(str::to_string)
            .ok_or_else(|| Error::UnknownFeature {
                name: name.to_string(),
            })
    }

    /// Resolve each name in order. Equivalent to calling [`AliasMap::resolve`]
    /// on every element.
    pub fn resolve_all<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        names.iter().map(|name| self.resolve(name.as_ref())).collect()
    }

    /// Check that every name is already canonical, without case folding.
    pub fn require_canonical<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                if self.canonical.contains(name) {
                    Ok(name.to_string())
                } else {
                    Err(Error::UnknownFeature {
                        name: name.to_string(),
                    })
                }
            })
            .collect()
    }

    pub fn is_canonical(&self, name: &str) -> bool {
        self.canonical.contains(name)
    }

    /// Canonical names, sorted.
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.canonical.iter().map(String::as_str)
    }

    /// Declared aliases, sorted.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
