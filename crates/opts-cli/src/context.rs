//! Shared setup for commands: config roots and request preferences

use crate::cli::PreferenceArgs;
use crate::error::{CliError, Result};
use opts_core::{GetOptionsPreferences, OptionsProvider, OptionsProviderBuilder, OptionsWatcher};
use opts_fs::NormalizedPath;
use serde_json::Value;
use std::path::PathBuf;

/// Config roots from `-d` flags, or the current directory when none are given.
pub fn roots(dirs: &[PathBuf]) -> Result<Vec<NormalizedPath>> {
    if dirs.is_empty() {
        return Ok(vec![NormalizedPath::new(std::env::current_dir()?)]);
    }
    Ok(dirs.iter().map(NormalizedPath::new).collect())
}

/// Load every root into a provider.
pub fn load_provider(dirs: &[PathBuf]) -> Result<OptionsProvider> {
    let mut builder = OptionsProviderBuilder::new();
    for root in roots(dirs)? {
        builder = builder.add_directory(root)?;
    }
    tracing::debug!(roots = builder.roots().len(), "Loading config roots");
    Ok(builder.build()?)
}

/// Load every root into a watcher.
pub fn load_watcher(dirs: &[PathBuf]) -> Result<OptionsWatcher> {
    let mut builder = OptionsWatcher::builder();
    for root in roots(dirs)? {
        builder = builder.add_directory(root)?;
    }
    Ok(builder.build()?)
}

/// Parse a JSON argument.
pub fn parse_json(flag: &str, text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|e| CliError::user(format!("--{flag}: {e}")))
}

/// Translate preference flags into request preferences.
pub fn preferences(args: &PreferenceArgs) -> Result<GetOptionsPreferences> {
    let mut preferences =
        GetOptionsPreferences::new().with_skip_feature_name_conversion(args.skip_conversion);
    if let Some(constraints) = &args.constraints {
        preferences = preferences.with_constraints(parse_json("constraints", constraints)?);
    }
    if let Some(overrides) = &args.overrides {
        match parse_json("overrides", overrides)? {
            Value::Object(overrides) => preferences = preferences.with_overrides(overrides),
            _ => return Err(CliError::user("--overrides must be a JSON object")),
        }
    }
    if let Some(enabled) = args.configurable_strings {
        preferences = preferences.with_configurable_strings(enabled);
    }
    Ok(preferences)
}

/// Print a value as pretty JSON on stdout.
pub fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
