//! Integration tests for cached options queries

use opts_core::{
    CacheInitOptions, CacheMode, Error, GetOptionsPreferences, OptionsCache, OptionsProvider,
    OptionsProviderBuilder, OptionsRegistry, ResultCache,
};
use opts_test_utils::FeatureDir;
use rstest::rstest;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::num::NonZeroUsize;
use std::sync::Arc;

#[derive(Debug, Deserialize, PartialEq)]
struct Server {
    port: u16,
}

fn fixture() -> (FeatureDir, OptionsProvider) {
    let dir = FeatureDir::new();
    dir.feature(
        "base",
        json!({"options": {
            "k1": {"v": 1},
            "k2": {"v": 2},
            "k3": {"v": 3},
            "server": {"port": 80}
        }}),
    );
    dir.feature(
        "prod",
        json!({
            "conditions": {"jsonPointer": "/env", "equals": "prod"},
            "options": {"server": {"port": 443}}
        }),
    );
    let provider = OptionsProviderBuilder::new()
        .add_directory(dir.root())
        .unwrap()
        .build()
        .unwrap();
    (dir, provider)
}

fn lru(max_size: usize, mode: CacheMode) -> OptionsCache {
    OptionsCache::new(CacheInitOptions::lru(
        NonZeroUsize::new(max_size).unwrap(),
        mode,
    ))
}

#[rstest]
#[case::exclusive(CacheMode::Exclusive)]
#[case::shared(CacheMode::Shared)]
fn test_hit_returns_same_instance(#[case] mode: CacheMode) {
    let (_dir, provider) = fixture();
    let cache = OptionsCache::new(CacheInitOptions::unbounded(mode));
    let preferences = GetOptionsPreferences::new();

    let first = provider
        .get_options_cached("k1", &["base"], &preferences, &cache)
        .unwrap();
    let second = provider
        .get_options_cached("k1", &["base"], &preferences, &cache)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(*first, json!({"v": 1}));
    assert_eq!(cache.len(), 1);
}

#[rstest]
#[case::exclusive(CacheMode::Exclusive)]
#[case::shared(CacheMode::Shared)]
fn test_lru_evicts_least_recently_used(#[case] mode: CacheMode) {
    let (_dir, provider) = fixture();
    let cache = lru(2, mode);
    let preferences = GetOptionsPreferences::new();
    let get = |key: &str| {
        provider
            .get_options_cached(key, &["base"], &preferences, &cache)
            .unwrap()
    };

    let k1 = get("k1");
    let k2 = get("k2");
    let _k3 = get("k3");
    assert_eq!(cache.len(), 2);

    assert!(Arc::ptr_eq(&k2, &get("k2")));
    assert!(!Arc::ptr_eq(&k1, &get("k1")));
}

#[test]
fn test_typed_and_raw_entries_are_distinct() {
    let (_dir, provider) = fixture();
    let cache = OptionsCache::new(CacheInitOptions::default());
    let preferences = GetOptionsPreferences::new();

    let typed: Arc<Server> = provider
        .get_options_as("server", &["base"], &preferences, &cache)
        .unwrap();
    let raw = provider
        .get_options_cached("server", &["base"], &preferences, &cache)
        .unwrap();
    assert_eq!(*typed, Server { port: 80 });
    assert_eq!(*raw, json!({"port": 80}));
    assert_eq!(cache.len(), 2);

    let again: Arc<Server> = provider
        .get_options_as("server", &["base"], &preferences, &cache)
        .unwrap();
    assert!(Arc::ptr_eq(&typed, &again));
}

#[test]
fn test_aliases_and_constraints_share_entries_by_active_features() {
    let dir = FeatureDir::new();
    dir.feature(
        "base",
        json!({"metadata": {"aliases": ["b"]}, "options": {"server": {"port": 80}}}),
    );
    dir.feature(
        "prod",
        json!({
            "conditions": {"jsonPointer": "/env", "equals": "prod"},
            "options": {"server": {"port": 443}}
        }),
    );
    let provider = OptionsProvider::build(dir.root()).unwrap();
    let cache = OptionsCache::new(CacheInitOptions::default());

    let dev = GetOptionsPreferences::new().with_constraints(json!({"env": "dev"}));
    let staging = GetOptionsPreferences::new().with_constraints(json!({"env": "staging"}));
    let prod = GetOptionsPreferences::new().with_constraints(json!({"env": "prod"}));

    let first = provider
        .get_options_cached("server", &["base", "prod"], &dev, &cache)
        .unwrap();
    let second = provider
        .get_options_cached("server", &["B", "prod"], &staging, &cache)
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let production = provider
        .get_options_cached("server", &["base", "prod"], &prod, &cache)
        .unwrap();
    assert_eq!(*production, json!({"port": 443}));
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_overrides_with_cache_are_rejected() {
    let (_dir, provider) = fixture();
    let cache = OptionsCache::new(CacheInitOptions::default());
    let mut overrides = Map::new();
    overrides.insert("k1".into(), json!({"v": 9}));
    let preferences = GetOptionsPreferences::new().with_overrides(overrides);

    let err = provider
        .get_options_cached("k1", &["base"], &preferences, &cache)
        .unwrap_err();
    assert!(matches!(err, Error::CacheMisuse { .. }));
    assert!(err.is_request_error());
    assert!(cache.is_empty());
}

#[test]
fn test_errors_are_not_cached() {
    let (_dir, provider) = fixture();
    let cache = OptionsCache::new(CacheInitOptions::default());
    let preferences = GetOptionsPreferences::new();

    let err = provider
        .get_options_cached("missing", &["base"], &preferences, &cache)
        .unwrap_err();
    assert!(matches!(err, Error::MissingKey { .. }));
    let err = provider
        .get_options_as::<Server, _, _>("k1", &["base"], &preferences, &cache)
        .unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert!(cache.is_empty());
}

#[test]
fn test_new_snapshot_never_returns_old_instances() {
    let (dir, provider) = fixture();
    let cache = OptionsCache::new(CacheInitOptions::unbounded(CacheMode::Shared));
    let preferences = GetOptionsPreferences::new();

    let old = provider
        .get_options_cached("k1", &["base"], &preferences, &cache)
        .unwrap();

    dir.feature("base", json!({"options": {"k1": {"v": 100}}}));
    let rebuilt = OptionsProvider::build(dir.root()).unwrap();
    assert!(rebuilt.state().generation() > provider.state().generation());

    let fresh = rebuilt
        .get_options_cached("k1", &["base"], &preferences, &cache)
        .unwrap();
    assert!(!Arc::ptr_eq(&old, &fresh));
    assert_eq!(*fresh, json!({"v": 100}));
    assert_eq!(cache.len(), 1);

    // The older snapshot still answers, but cannot repopulate the cache.
    let stale = provider
        .get_options_cached("k1", &["base"], &preferences, &cache)
        .unwrap();
    assert_eq!(*stale, json!({"v": 1}));
    let hit = rebuilt
        .get_options_cached("k1", &["base"], &preferences, &cache)
        .unwrap();
    assert!(Arc::ptr_eq(&fresh, &hit));
}

#[test]
fn test_configurable_string_preference_is_part_of_the_key() {
    let dir = FeatureDir::new();
    dir.enable_configurable_strings();
    dir.feature(
        "mail",
        json!({"options": {"subject": {
            "$type": "ConfigurableString",
            "base": {"liquid": "Hi {{ name }}"},
            "arguments": {"name": "Ada"}
        }}}),
    );
    let provider = OptionsProvider::build(dir.root()).unwrap();
    let cache = OptionsCache::new(CacheInitOptions::default());

    let rendered = provider
        .get_options_cached("subject", &["mail"], &GetOptionsPreferences::new(), &cache)
        .unwrap();
    let raw = provider
        .get_options_cached(
            "subject",
            &["mail"],
            &GetOptionsPreferences::new().with_configurable_strings(false),
            &cache,
        )
        .unwrap();
    assert_eq!(*rendered, Value::String("Hi Ada".into()));
    assert!(raw.is_object());
    assert_eq!(cache.len(), 2);
}
