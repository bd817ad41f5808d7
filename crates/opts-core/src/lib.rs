//! Feature-keyed configuration resolution
//!
//! A config root is a directory of feature files. Each feature contributes
//! option fragments, may import other features and may be gated by
//! conditions. For a requested list of features this crate merges the
//! fragments for a key into a single value.
//!
//! # Layers
//!
//! - [`loader`] reads feature files into [`Feature`] records
//! - [`names`] maps case-insensitive aliases to canonical names
//! - [`imports`] resolves import graphs and records dependents
//! - [`conditions`] filters features by request constraints
//! - [`options`] merges values for a key and renders configurable strings
//! - [`cache`] memoizes built options per snapshot generation
//! - [`provider`] holds immutable snapshots behind [`OptionsRegistry`]
//! - [`watcher`] rebuilds snapshots when files change
//!
//! # Example
//!
//! ```no_run
//! use opts_core::{GetOptionsPreferences, OptionsProvider, OptionsRegistry};
//! use serde_json::json;
//!
//! let provider = OptionsProvider::build("configs")?;
//! let preferences = GetOptionsPreferences::new().with_constraints(json!({"env": "prod"}));
//! let message = provider.get_options_with_preferences("msg", &["child"], &preferences)?;
//! # Ok::<(), opts_core::Error>(())
//! ```

pub mod builder;
pub mod cache;
pub mod conditions;
pub mod error;
pub mod imports;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod names;
pub mod options;
pub mod preferences;
pub mod provider;
pub mod schema;
pub mod templating;
pub mod validation;
pub mod watcher;

pub use builder::{BuilderSettings, OptionsProviderBuilder};
pub use cache::{
    CacheInitOptions, CacheKey, CacheMode, CachedValue, ExclusiveCache, Invalidate, OptionsCache,
    ResultCache, SharedCache,
};
pub use error::{Error, Result};
pub use loader::FeatureLoader;
pub use names::AliasMap;
pub use preferences::{GetOptionsPreferences, configurable_strings_enabled};
pub use provider::{FeatureMetadataMap, OptionsProvider, OptionsRegistry, ProviderState};
pub use schema::{ConditionExpression, Feature, OptionsMetadata, Predicate};
pub use templating::{LiquidEngine, TemplateEngine};
pub use validation::{FeatureValidator, StructuralValidator};
pub use watcher::{
    ChangeSource, ListenerId, ManualChangeSource, NotifyChangeSource, OptionsWatcher,
    OptionsWatcherBuilder, WatcherSettings,
};
