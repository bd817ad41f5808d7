//! Immutable provider snapshots and the registry query surface

use crate::cache::{CacheKey, CachedValue, ResultCache};
use crate::conditions::filter_by_constraints;
use crate::merge::merge_maps;
use crate::names::AliasMap;
use crate::options::OptionsBuilder;
use crate::preferences::GetOptionsPreferences;
use crate::schema::{ConditionExpression, Feature, OptionsMetadata};
use crate::templating::{TemplateContext, TemplateEngine};
use crate::{Error, Result};
use opts_fs::NormalizedPath;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Metadata for every feature, by canonical name.
pub type FeatureMetadataMap = BTreeMap<String, OptionsMetadata>;

/// A fully resolved, immutable view of all loaded features.
///
/// Every snapshot has a process-unique `generation`; snapshots built later
/// have larger generations.
pub struct ProviderState {
    features: BTreeMap<String, Feature>,
    aliases: AliasMap,
    roots: Vec<NormalizedPath>,
    configurable_strings_enabled: bool,
    engine: Arc<dyn TemplateEngine>,
    generation: u64,
    last_modified: SystemTime,
}

impl ProviderState {
    /// Assemble a snapshot from features whose imports are already resolved.
    pub(crate) fn new(
        features: BTreeMap<String, Feature>,
        aliases: AliasMap,
        roots: Vec<NormalizedPath>,
        configurable_strings_enabled: bool,
        engine: Arc<dyn TemplateEngine>,
        previous: Option<SystemTime>,
    ) -> Self {
        let now = SystemTime::now();
        let last_modified = match previous {
            Some(previous) if now <= previous => previous + Duration::from_nanos(1),
            _ => now,
        };
        Self {
            features,
            aliases,
            roots,
            configurable_strings_enabled,
            engine,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            last_modified,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When this snapshot was built. Never earlier than the snapshot it
    /// replaced.
    pub fn last_modified(&self) -> SystemTime {
        self.last_modified
    }

    pub fn roots(&self) -> &[NormalizedPath] {
        &self.roots
    }

    /// Builder-level templating default.
    pub fn are_configurable_strings_enabled(&self) -> bool {
        self.configurable_strings_enabled
    }

    pub fn aliases(&self) -> &AliasMap {
        &self.aliases
    }

    pub fn feature_map(&self) -> &BTreeMap<String, Feature> {
        &self.features
    }

    /// Look up a feature by name or alias.
    pub fn feature(&self, name: &str) -> Result<&Feature> {
        let canonical = self.aliases.resolve(name)?;
        self.features
            .get(&canonical)
            .ok_or(Error::UnknownFeature { name: canonical })
    }

    /// Metadata for every feature.
    pub fn metadata(&self) -> FeatureMetadataMap {
        self.features
            .iter()
            .map(|(name, feature)| (name.clone(), feature.options_metadata()))
            .collect()
    }

    /// Canonicalize (unless skipped) and filter by constraints.
    pub fn filtered_feature_names<S: AsRef<str>>(
        &self,
        names: &[S],
        preferences: &GetOptionsPreferences,
    ) -> Result<Vec<String>> {
        let canonical = if preferences.skip_feature_name_conversion {
            self.aliases.require_canonical(names)?
        } else {
            self.aliases.resolve_all(names)?
        };
        Ok(filter_by_constraints(
            &self.features,
            canonical,
            preferences.constraints.as_ref(),
        ))
    }

    fn options_builder(&self) -> OptionsBuilder<'_> {
        OptionsBuilder::new(
            &self.features,
            TemplateContext::new(self.engine.as_ref(), &self.roots),
        )
    }

    /// Build the value of `key` for the requested features.
    pub fn options<S: AsRef<str>>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
    ) -> Result<Value> {
        let active = self.filtered_feature_names(names, preferences)?;
        self.options_for_active(key, &active, preferences)
    }

    fn options_for_active(
        &self,
        key: &str,
        active: &[String],
        preferences: &GetOptionsPreferences,
    ) -> Result<Value> {
        self.options_builder().build(
            key,
            active,
            preferences.overrides.as_ref(),
            preferences.configurable_strings_enabled(self.configurable_strings_enabled),
        )
    }

    /// Build every top-level key of the requested features.
    pub fn all_options<S: AsRef<str>>(
        &self,
        names: &[S],
        preferences: &GetOptionsPreferences,
    ) -> Result<Map<String, Value>> {
        let active = self.filtered_feature_names(names, preferences)?;
        self.options_builder().build_all(
            &active,
            preferences.overrides.as_ref(),
            preferences.configurable_strings_enabled(self.configurable_strings_enabled),
        )
    }

    /// Sorted child keys of the object at `pointer` in the merged options.
    ///
    /// With `names` of `None` every feature is merged, in canonical order.
    /// Arrays, scalars and missing paths have no keys.
    pub fn possible_keys(&self, pointer: &str, names: Option<&[String]>) -> Result<Vec<String>> {
        let names = match names {
            Some(names) => self.aliases.resolve_all(names)?,
            None => self.features.keys().cloned().collect(),
        };
        let mut merged = Map::new();
        for name in &names {
            if let Some(feature) = self.features.get(name) {
                merge_maps(&mut merged, &feature.options);
            }
        }

        let merged = Value::Object(merged);
        let keys = match merged.pointer(pointer) {
            Some(Value::Object(object)) => object.keys().cloned().collect(),
            _ => Vec::new(),
        };
        Ok(keys)
    }

    /// Build `key` and decode it into `T`.
    pub fn options_typed<T: DeserializeOwned, S: AsRef<str>>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
    ) -> Result<T> {
        let value = self.options(key, names, preferences)?;
        decode(key, value)
    }

    /// Build `key` through `cache`, decoding cache misses with `decode_value`.
    fn cached<S, C, F>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
        cache: &C,
        shape: TypeId,
        decode_value: F,
    ) -> Result<CachedValue>
    where
        S: AsRef<str>,
        C: ResultCache<CacheKey, CachedValue>,
        F: FnOnce(Value) -> Result<CachedValue>,
    {
        if preferences.has_overrides() {
            return Err(Error::CacheMisuse {
                message: "overrides cannot be combined with a cache; request without a cache instead".into(),
            });
        }

        let active = self.filtered_feature_names(names, preferences)?;
        let cache_key = CacheKey {
            key: key.to_string(),
            features: active.clone(),
            configurable_strings: preferences
                .configurable_strings_enabled(self.configurable_strings_enabled),
            shape,
        };
        cache.get_or_compute(self.generation, cache_key, || {
            tracing::trace!(key, generation = self.generation, "Options cache miss");
            decode_value(self.options_for_active(key, &active, preferences)?)
        })
    }

    /// Build `key` through `cache` as a raw value.
    pub fn options_cached<S, C>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
        cache: &C,
    ) -> Result<Arc<Value>>
    where
        S: AsRef<str>,
        C: ResultCache<CacheKey, CachedValue>,
    {
        let cached = self.cached(
            key,
            names,
            preferences,
            cache,
            TypeId::of::<Value>(),
            |value| Ok(Arc::new(value) as CachedValue),
        )?;
        downcast(key, cached)
    }

    /// Build `key` through `cache`, decoded into `T`.
    pub fn options_as<T, S, C>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
        cache: &C,
    ) -> Result<Arc<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        S: AsRef<str>,
        C: ResultCache<CacheKey, CachedValue>,
    {
        let cached = self.cached(
            key,
            names,
            preferences,
            cache,
            TypeId::of::<T>(),
            |value| Ok(Arc::new(decode::<T>(key, value)?) as CachedValue),
        )?;
        downcast(key, cached)
    }
}

impl std::fmt::Debug for ProviderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderState")
            .field("features", &self.features.len())
            .field("roots", &self.roots)
            .field("generation", &self.generation)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Decode {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn downcast<T: Send + Sync + 'static>(key: &str, cached: CachedValue) -> Result<Arc<T>> {
    cached.downcast::<T>().map_err(|_| Error::CacheMisuse {
        message: format!("cached value for '{key}' has an unexpected type"),
    })
}

/// Query surface shared by providers and watchers.
///
/// Every method works against one snapshot taken at the start of the call.
pub trait OptionsRegistry {
    /// The current snapshot.
    fn state(&self) -> Arc<ProviderState>;

    /// Metadata for every feature, computed at most once per snapshot.
    fn features_with_metadata(&self) -> Arc<FeatureMetadataMap>;

    /// Resolve a name or alias to its canonical name, ignoring case.
    fn get_canonical_feature_name(&self, name: &str) -> Result<String> {
        self.state().aliases().resolve(name)
    }

    fn get_canonical_feature_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<String>> {
        self.state().aliases().resolve_all(names)
    }

    /// Canonical feature names, sorted.
    fn features(&self) -> Vec<String> {
        self.state().feature_map().keys().cloned().collect()
    }

    /// Canonical names and declared aliases, sorted and de-duplicated.
    fn features_and_aliases(&self) -> Vec<String> {
        let state = self.state();
        let mut names: Vec<String> = state
            .aliases()
            .canonical_names()
            .chain(state.aliases().aliases())
            .map(str::to_string)
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Declared aliases, sorted.
    fn get_aliases(&self) -> Vec<String> {
        self.state().aliases().aliases().map(str::to_string).collect()
    }

    fn get_feature_metadata(&self, name: &str) -> Result<OptionsMetadata> {
        let canonical = self.get_canonical_feature_name(name)?;
        self.features_with_metadata()
            .get(&canonical)
            .cloned()
            .ok_or(Error::UnknownFeature { name: canonical })
    }

    fn has_conditions(&self, name: &str) -> Result<bool> {
        Ok(self.state().feature(name)?.has_conditions())
    }

    fn get_conditions(&self, name: &str) -> Result<Option<ConditionExpression>> {
        Ok(self.state().feature(name)?.conditions.clone())
    }

    fn get_filtered_feature_names<S: AsRef<str>>(
        &self,
        names: &[S],
        preferences: &GetOptionsPreferences,
    ) -> Result<Vec<String>> {
        self.state().filtered_feature_names(names, preferences)
    }

    fn get_options<S: AsRef<str>>(&self, key: &str, names: &[S]) -> Result<Value> {
        self.state()
            .options(key, names, &GetOptionsPreferences::default())
    }

    fn get_options_with_preferences<S: AsRef<str>>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
    ) -> Result<Value> {
        self.state().options(key, names, preferences)
    }

    fn get_all_options<S: AsRef<str>>(
        &self,
        names: &[S],
        preferences: &GetOptionsPreferences,
    ) -> Result<Map<String, Value>> {
        self.state().all_options(names, preferences)
    }

    fn get_possible_keys(&self, pointer: &str, names: Option<&[String]>) -> Result<Vec<String>> {
        self.state().possible_keys(pointer, names)
    }

    fn get_options_typed<T: DeserializeOwned, S: AsRef<str>>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
    ) -> Result<T> {
        self.state().options_typed(key, names, preferences)
    }

    fn get_options_cached<S, C>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
        cache: &C,
    ) -> Result<Arc<Value>>
    where
        S: AsRef<str>,
        C: ResultCache<CacheKey, CachedValue>,
    {
        self.state().options_cached(key, names, preferences, cache)
    }

    fn get_options_as<T, S, C>(
        &self,
        key: &str,
        names: &[S],
        preferences: &GetOptionsPreferences,
        cache: &C,
    ) -> Result<Arc<T>>
    where
        T: DeserializeOwned + Send + Sync + 'static,
        S: AsRef<str>,
        C: ResultCache<CacheKey, CachedValue>,
    {
        self.state().options_as(key, names, preferences, cache)
    }
}

/// Read-only options provider over a single snapshot.
pub struct OptionsProvider {
    state: Arc<ProviderState>,
    metadata: OnceLock<Arc<FeatureMetadataMap>>,
}

impl OptionsProvider {
    pub(crate) fn new(state: ProviderState) -> Self {
        Self {
            state: Arc::new(state),
            metadata: OnceLock::new(),
        }
    }

    /// Build a provider from a single config root.
    pub fn build(root: impl Into<NormalizedPath>) -> Result<Self> {
        crate::OptionsProviderBuilder::new()
            .add_directory(root)?
            .build()
    }
}

impl OptionsRegistry for OptionsProvider {
    fn state(&self) -> Arc<ProviderState> {
        Arc::clone(&self.state)
    }

    fn features_with_metadata(&self) -> Arc<FeatureMetadataMap> {
        Arc::clone(
            self.metadata
                .get_or_init(|| Arc::new(self.state.metadata())),
        )
    }
}

impl std::fmt::Debug for OptionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionsProvider")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
