//! Configurable strings: option values rendered from templates
//!
//! ```json
//! {
//!   "$type": "ConfigurableString",
//!   "base": { "liquid": "Hello {{ name }} from {{ team }}" },
//!   "arguments": {
//!     "name": "Ada",
//!     "team": { "file": "templates/team.liquid" },
//!     "signature": { "liquid": "{{ name }} ({{ team }})" }
//!   }
//! }
//! ```
//!
//! `base` and each argument are a plain string, an inline `liquid` template or
//! a `file` looked up under the config roots. File arguments ending in
//! `.liquid` are rendered; other files are used verbatim.

use crate::{Error, Result};
use opts_fs::NormalizedPath;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Value of the `$type` discriminator marking a configurable string.
pub const CONFIGURABLE_STRING_TYPE: &str = "ConfigurableString";

/// Namespaced form of [`CONFIGURABLE_STRING_TYPE`], accepted as well.
pub const QUALIFIED_CONFIGURABLE_STRING_TYPE: &str = "Optify.ConfigurableString";

/// Renders a template source with string arguments.
pub trait TemplateEngine: Send + Sync {
    /// Render `template`. Referencing a variable missing from `arguments`
    /// is an error.
    fn render(&self, template: &str, arguments: &BTreeMap<String, String>) -> Result<String>;
}

/// [`TemplateEngine`] backed by the Liquid template language.
pub struct LiquidEngine {
    parser: liquid::Parser,
}

impl LiquidEngine {
    /// Create an engine with the Liquid standard library of filters.
    pub fn new() -> Result<Self> {
        let parser = liquid::ParserBuilder::with_stdlib()
            .build()
            .map_err(|e| Error::Template {
                message: format!("failed to build template parser: {e}"),
            })?;
        Ok(Self { parser })
    }
}

impl std::fmt::Debug for LiquidEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiquidEngine").finish_non_exhaustive()
    }
}

impl TemplateEngine for LiquidEngine {
    fn render(&self, template: &str, arguments: &BTreeMap<String, String>) -> Result<String> {
        let template = self.parser.parse(template).map_err(|e| Error::Template {
            message: format!("failed to parse template: {e}"),
        })?;

        let mut globals = liquid::Object::new();
        for (key, value) in arguments {
            globals.insert(key.clone().into(), liquid::model::Value::scalar(value.clone()));
        }

        template.render(&globals).map_err(|e| Error::Template {
            message: e.to_string(),
        })
    }
}

/// Where a template or argument's text comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TemplateSource {
    Literal(String),
    Liquid { liquid: String },
    File { file: String },
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self::Literal(String::new())
    }
}

/// A decoded configurable string node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConfigurableString {
    #[serde(default)]
    pub base: TemplateSource,

    #[serde(default)]
    pub arguments: BTreeMap<String, TemplateSource>,
}

impl ConfigurableString {
    /// Whether `object` is tagged as a configurable string.
    pub fn is_tagged(object: &Map<String, Value>) -> bool {
        matches!(
            object.get("$type").and_then(Value::as_str),
            Some(CONFIGURABLE_STRING_TYPE | QUALIFIED_CONFIGURABLE_STRING_TYPE)
        )
    }

    /// Decode a tagged object.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self> {
        let mut object = object.clone();
        object.remove("$type");
        serde_json::from_value(Value::Object(object)).map_err(|e| Error::Template {
            message: format!("invalid configurable string: {e}"),
        })
    }

    /// Render to the final string.
    ///
    /// A `liquid` base or a `.liquid` file base is always rendered. A plain
    /// string or other file base is returned verbatim when there are no
    /// arguments.
    ///
    /// Template arguments may reference other arguments. They are rendered
    /// in passes until every argument is available; a pass that makes no
    /// progress (an unknown variable or a reference cycle) is an error.
    pub fn render(&self, context: &TemplateContext<'_>) -> Result<String> {
        let (base, is_template) = match &self.base {
            TemplateSource::Literal(text) => (text.clone(), false),
            TemplateSource::Liquid { liquid } => (liquid.clone(), true),
            TemplateSource::File { file } => (context.read_file(file)?, file.ends_with(".liquid")),
        };
        if self.arguments.is_empty() && !is_template {
            return Ok(base);
        }

        let mut resolved = BTreeMap::new();
        let mut pending = Vec::new();
        for (name, source) in &self.arguments {
            match source {
                TemplateSource::Literal(text) => {
                    resolved.insert(name.clone(), text.clone());
                }
                TemplateSource::Liquid { liquid } => pending.push((name, liquid.clone())),
                TemplateSource::File { file } if file.ends_with(".liquid") => {
                    pending.push((name, context.read_file(file)?));
                }
                TemplateSource::File { file } => {
                    resolved.insert(name.clone(), context.read_file(file)?);
                }
            }
        }

        while !pending.is_empty() {
            let before = pending.len();
            let mut still_pending = Vec::new();
            let mut last_error = None;
            for (name, template) in pending {
                match context.engine.render(&template, &resolved) {
                    Ok(text) => {
                        resolved.insert(name.clone(), text);
                    }
                    Err(e) => {
                        last_error = Some(e);
                        still_pending.push((name, template));
                    }
                }
            }
            if still_pending.len() == before {
                let names: Vec<&str> = still_pending
                    .iter()
                    .map(|(name, _)| name.as_str())
                    .collect();
                let cause = last_error.map(|e| e.to_string()).unwrap_or_default();
                return Err(Error::Template {
                    message: format!(
                        "could not resolve template arguments {}: {cause}",
                        names.join(", ")
                    ),
                });
            }
            pending = still_pending;
        }

        context.engine.render(&base, &resolved)
    }
}

/// Renders configurable strings found in option values.
pub struct TemplateContext<'a> {
    pub engine: &'a dyn TemplateEngine,
    /// Config roots searched for file references, last root first
    pub roots: &'a [NormalizedPath],
}

impl<'a> TemplateContext<'a> {
    pub fn new(engine: &'a dyn TemplateEngine, roots: &'a [NormalizedPath]) -> Self {
        Self { engine, roots }
    }

    /// Replace every configurable string node in `value` with its rendered text.
    pub fn render_value(&self, value: &mut Value) -> Result<()> {
        match value {
            Value::Object(object) if ConfigurableString::is_tagged(object) => {
                let rendered = ConfigurableString::from_object(object)?.render(self)?;
                *value = Value::String(rendered);
            }
            Value::Object(object) => {
                for child in object.values_mut() {
                    self.render_value(child)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.render_value(item)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Read a referenced file from the last root that contains it.
    pub fn read_file(&self, relative: &str) -> Result<String> {
        let path = self
            .roots
            .iter()
            .rev()
            .map(|root| root.join(relative))
            .find(NormalizedPath::is_file)
            .ok_or_else(|| Error::Template {
                message: format!("file '{relative}' was not found in any config root"),
            })?;
        tracing::trace!(path = %path, "Reading template file");
        Ok(opts_fs::io::read_text(&path)?)
    }
}
