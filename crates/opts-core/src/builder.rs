//! Builder for providers and the build plan shared with the watcher

use crate::imports::resolve_imports;
use crate::loader::FeatureLoader;
use crate::names::AliasMap;
use crate::provider::{OptionsProvider, ProviderState};
use crate::templating::{LiquidEngine, TemplateEngine};
use crate::validation::FeatureValidator;
use crate::{Error, Result};
use opts_fs::{FeatureFileStore, NormalizedPath, OptsPath};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Settings read from `<root>/.opts/config.json`.
///
/// ```json
/// { "areConfigurableStringsEnabled": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderSettings {
    #[serde(default)]
    pub are_configurable_strings_enabled: bool,
}

impl BuilderSettings {
    /// Path of the settings file for a config root.
    pub fn path(root: &NormalizedPath) -> NormalizedPath {
        root.join(OptsPath::MetadataDir.as_str())
            .join(OptsPath::BuilderConfig.as_str())
    }

    /// Read the settings for a config root; defaults when the file is absent.
    pub fn load(root: &NormalizedPath) -> Result<Self> {
        let path = Self::path(root);
        if !path.is_file() {
            return Ok(Self::default());
        }
        Ok(FeatureFileStore::new().load(&path)?)
    }
}

/// Everything needed to build a snapshot from disk.
#[derive(Clone)]
pub(crate) struct BuildPlan {
    roots: Vec<NormalizedPath>,
    configurable_strings_enabled: bool,
    loader: FeatureLoader,
    engine: Arc<dyn TemplateEngine>,
}

impl BuildPlan {
    pub(crate) fn roots(&self) -> &[NormalizedPath] {
        &self.roots
    }

    /// Load, index and resolve every feature into a new snapshot.
    pub(crate) fn build(&self, previous: Option<SystemTime>) -> Result<ProviderState> {
        let mut features = self.loader.load_all(&self.roots)?;
        let aliases = AliasMap::build(features.values())?;
        resolve_imports(&mut features, &aliases)?;

        tracing::debug!(
            features = features.len(),
            aliases = aliases.len(),
            "Built provider snapshot"
        );
        Ok(ProviderState::new(
            features,
            aliases,
            self.roots.clone(),
            self.configurable_strings_enabled,
            Arc::clone(&self.engine),
            previous,
        ))
    }
}

/// Collects config roots and builds an [`OptionsProvider`].
///
/// ```no_run
/// use opts_core::{OptionsProviderBuilder, OptionsRegistry};
///
/// let provider = OptionsProviderBuilder::new()
///     .add_directory("configs/shared")?
///     .add_directory("configs/service")?
///     .build()?;
/// let port = provider.get_options("server.port", &["service/prod"])?;
/// # Ok::<(), opts_core::Error>(())
/// ```
#[derive(Default)]
pub struct OptionsProviderBuilder {
    roots: Vec<NormalizedPath>,
    configurable_strings_enabled: bool,
    validator: Option<Arc<dyn FeatureValidator>>,
    engine: Option<Arc<dyn TemplateEngine>>,
}

impl OptionsProviderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a config root. Later roots win over earlier ones for features
    /// with the same canonical name.
    ///
    /// The root's builder settings are read once, here. Configurable strings
    /// are enabled when any registered root enables them.
    pub fn add_directory(mut self, root: impl Into<NormalizedPath>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(Error::Load {
                path: root.to_native(),
                message: "config root is not a directory".into(),
            });
        }
        if self.roots.contains(&root) {
            tracing::debug!(root = %root, "Config root already registered");
            return Ok(self);
        }

        let settings = BuilderSettings::load(&root)?;
        self.configurable_strings_enabled |= settings.are_configurable_strings_enabled;
        tracing::debug!(
            root = %root,
            configurable_strings = settings.are_configurable_strings_enabled,
            "Registered config root"
        );
        self.roots.push(root);
        Ok(self)
    }

    /// Validate feature documents with `validator` instead of the built-in
    /// structural checks.
    pub fn with_validator(mut self, validator: Arc<dyn FeatureValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Render configurable strings with `engine` instead of Liquid.
    pub fn with_template_engine(mut self, engine: Arc<dyn TemplateEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn roots(&self) -> &[NormalizedPath] {
        &self.roots
    }

    pub(crate) fn into_plan(self) -> Result<BuildPlan> {
        let loader = match self.validator {
            Some(validator) => FeatureLoader::with_validator(validator),
            None => FeatureLoader::new(),
        };
        let engine: Arc<dyn TemplateEngine> = match self.engine {
            Some(engine) => engine,
            None => Arc::new(LiquidEngine::new()?),
        };
        Ok(BuildPlan {
            roots: self.roots,
            configurable_strings_enabled: self.configurable_strings_enabled,
            loader,
            engine,
        })
    }

    /// Load and resolve every registered root.
    pub fn build(self) -> Result<OptionsProvider> {
        let state = self.into_plan()?.build(None)?;
        Ok(OptionsProvider::new(state))
    }
}
