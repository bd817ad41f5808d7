//! Request-scoped options preferences

use serde_json::{Map, Value};

/// Preferences for a single options request.
///
/// ```
/// use opts_core::GetOptionsPreferences;
/// use serde_json::json;
///
/// let preferences = GetOptionsPreferences::new()
///     .with_constraints(json!({"env": "prod"}))
///     .with_configurable_strings(false);
/// assert_eq!(preferences.configurable_strings, Some(false));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetOptionsPreferences {
    /// Treat requested names as canonical; a name that is not canonical
    /// verbatim is an unknown feature
    pub skip_feature_name_conversion: bool,

    /// Document consulted when evaluating feature conditions. `None` disables
    /// condition filtering.
    pub constraints: Option<Value>,

    /// Values merged over the resolved options, keyed by top-level option key
    pub overrides: Option<Map<String, Value>>,

    /// Request-level templating toggle; `None` defers to the builder
    pub configurable_strings: Option<bool>,
}

impl GetOptionsPreferences {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_skip_feature_name_conversion(mut self, skip: bool) -> Self {
        self.skip_feature_name_conversion = skip;
        self
    }

    pub fn with_constraints(mut self, constraints: Value) -> Self {
        self.constraints = Some(constraints);
        self
    }

    pub fn with_overrides(mut self, overrides: Map<String, Value>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn with_configurable_strings(mut self, enabled: bool) -> Self {
        self.configurable_strings = Some(enabled);
        self
    }

    /// Whether the request carries at least one override.
    pub fn has_overrides(&self) -> bool {
        self.overrides.as_ref().is_some_and(|o| !o.is_empty())
    }

    /// Effective templating flag under the given builder default.
    pub fn configurable_strings_enabled(&self, builder_default: bool) -> bool {
        configurable_strings_enabled(builder_default, self.configurable_strings)
    }
}

/// Whether configurable strings are rendered for a request.
///
/// The builder setting is a hard gate: a request can turn rendering off but
/// never on when the builder has it disabled.
pub fn configurable_strings_enabled(builder_default: bool, requested: Option<bool>) -> bool {
    builder_default && requested.unwrap_or(true)
}
