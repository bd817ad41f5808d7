//! End-to-end tests across crates
//!
//! Exercises the complete flow: mixed-format roots -> builder -> provider ->
//! filtered, templated, cached and typed options.

use opts_core::{
    CacheInitOptions, CacheKey, CacheMode, CachedValue, Error, GetOptionsPreferences,
    OptionsCache, OptionsProviderBuilder, OptionsRegistry, ResultCache, SharedCache,
};
use opts_test_utils::FeatureDir;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use serde_json::json;
use std::num::NonZeroUsize;
use std::sync::Arc;

#[derive(Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    base_url: String,
    timeout_ms: u64,
    retries: Vec<u64>,
    banner: String,
}

/// Shared root in three formats, plus an overlay root with templates.
fn layered_roots() -> (FeatureDir, FeatureDir) {
    let shared = FeatureDir::new();
    shared.write(
        "defaults.yaml",
        r#"
metadata:
  aliases: [Defaults, base]
  owners: platform
options:
  api:
    baseUrl: https://api.example.com
    timeoutMs: 1000
    retries: [100, 200, 400]
    banner: default
"#,
    );
    shared.write(
        "team/api.json5",
        r#"{
  // team-level tuning
  imports: ["defaults"],
  metadata: { aliases: ["api"] },
  options: { api: { timeoutMs: 2500, retries: [50], }, },
}"#,
    );
    shared.feature(
        "regions/eu",
        json!({
            "conditions": {"and": [
                {"jsonPointer": "/region", "matches": "^eu-"},
                {"not": {"jsonPointer": "/flags/legacy", "equals": true}}
            ]},
            "options": {"api": {"baseUrl": "https://eu.api.example.com"}}
        }),
    );

    let overlay = FeatureDir::new();
    overlay.enable_configurable_strings();
    overlay.write("banners/welcome.liquid", "Welcome to {{ region | upcase }}");
    overlay.feature(
        "banner",
        json!({
            "options": {"api": {"banner": {
                "$type": "ConfigurableString",
                "base": {"liquid": "{{ welcome }} ({{ team }})"},
                "arguments": {
                    "welcome": {"file": "banners/welcome.liquid"},
                    "region": "eu-west",
                    "team": "api"
                }
            }}}
        }),
    );
    (shared, overlay)
}

fn build(shared: &FeatureDir, overlay: &FeatureDir) -> opts_core::OptionsProvider {
    OptionsProviderBuilder::new()
        .add_directory(shared.root())
        .unwrap()
        .add_directory(overlay.root())
        .unwrap()
        .build()
        .unwrap()
}

#[test]
fn test_full_resolution_flow() {
    let (shared, overlay) = layered_roots();
    let provider = build(&shared, &overlay);

    assert_eq!(
        provider.features(),
        vec!["banner", "defaults", "regions/eu", "team/api"]
    );
    assert_eq!(provider.get_canonical_feature_name("BASE").unwrap(), "defaults");

    let eu = GetOptionsPreferences::new().with_constraints(json!({"region": "eu-north"}));
    let settings: ApiSettings = provider
        .get_options_typed("api", &["api", "regions/eu", "banner"], &eu)
        .unwrap();
    assert_eq!(
        settings,
        ApiSettings {
            base_url: "https://eu.api.example.com".into(),
            timeout_ms: 2500,
            retries: vec![50],
            banner: "Welcome to EU-WEST (api)".into(),
        }
    );

    let legacy = GetOptionsPreferences::new()
        .with_constraints(json!({"region": "eu-north", "flags": {"legacy": true}}));
    assert_eq!(
        provider
            .get_options_with_preferences("api.baseUrl", &["api", "regions/eu"], &legacy)
            .unwrap(),
        json!("https://api.example.com")
    );
}

#[test]
fn test_metadata_reflects_imports_across_formats() {
    let (shared, overlay) = layered_roots();
    let provider = build(&shared, &overlay);

    let defaults = provider.get_feature_metadata("defaults").unwrap();
    assert_eq!(defaults.dependents, Some(vec!["team/api".to_string()]));
    assert_eq!(defaults.path, shared.path("defaults.yaml"));

    let api = provider.get_feature_metadata("API").unwrap();
    assert_eq!(api.name, "team/api");
    assert_eq!(api.aliases, Some(vec!["api".to_string()]));
}

#[test]
fn test_shared_cache_across_threads() {
    let (shared, overlay) = layered_roots();
    let provider = Arc::new(build(&shared, &overlay));
    let cache: Arc<SharedCache<CacheKey, CachedValue>> =
        Arc::new(SharedCache::new(NonZeroUsize::new(4)));

    let first = provider
        .get_options_cached("api", &["api"], &GetOptionsPreferences::new(), cache.as_ref())
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let provider = Arc::clone(&provider);
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || {
                provider
                    .get_options_cached("api", &["api"], &GetOptionsPreferences::new(), cache.as_ref())
                    .unwrap()
            })
        })
        .collect();
    for handle in handles {
        assert!(Arc::ptr_eq(&first, &handle.join().unwrap()));
    }
}

#[test]
fn test_exclusive_lru_cache_by_init_options() {
    let (shared, overlay) = layered_roots();
    let provider = build(&shared, &overlay);
    let cache = OptionsCache::new(CacheInitOptions::lru(
        NonZeroUsize::new(1).unwrap(),
        CacheMode::Exclusive,
    ));
    assert!(matches!(cache, OptionsCache::Exclusive(_)));
    let preferences = GetOptionsPreferences::new();

    let api = provider
        .get_options_cached("api", &["api"], &preferences, &cache)
        .unwrap();
    provider
        .get_options_cached("api", &["defaults"], &preferences, &cache)
        .unwrap();
    assert_eq!(cache.len(), 1);
    let again = provider
        .get_options_cached("api", &["api"], &preferences, &cache)
        .unwrap();
    assert!(!Arc::ptr_eq(&api, &again));
    assert_eq!(api, again);
}

#[test]
fn test_conditions_on_imported_feature_fail_the_build() {
    let dir = FeatureDir::new();
    dir.feature(
        "gated",
        json!({"conditions": {"jsonPointer": "/env", "equals": "prod"}, "options": {}}),
    );
    dir.feature("user", json!({"imports": ["gated"]}));

    let err = OptionsProviderBuilder::new()
        .add_directory(dir.root())
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        Error::ConditionsInImport { feature, import } if feature == "user" && import == "gated"
    ));
}

#[test]
fn test_importing_an_alias_suggests_canonical_name() {
    let dir = FeatureDir::new();
    dir.feature("base", json!({"metadata": {"aliases": ["b"]}}));
    dir.feature("child", json!({"imports": ["b"]}));

    let err = OptionsProviderBuilder::new()
        .add_directory(dir.root())
        .unwrap()
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("base"), "{err}");
}
