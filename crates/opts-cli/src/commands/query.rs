//! Options queries: get, all, filter, keys

use crate::cli::PreferenceArgs;
use crate::context::{self, parse_json, print_json};
use crate::error::Result;
use opts_core::{GetOptionsPreferences, OptionsRegistry};
use serde_json::Value;
use std::path::PathBuf;

/// Run the get command
pub fn run_get(
    dirs: &[PathBuf],
    key: &str,
    features: &[String],
    args: &PreferenceArgs,
) -> Result<()> {
    let provider = context::load_provider(dirs)?;
    let preferences = context::preferences(args)?;
    let value = provider.get_options_with_preferences(key, features, &preferences)?;
    print_json(&value)
}

/// Run the all command
pub fn run_all(dirs: &[PathBuf], features: &[String], args: &PreferenceArgs) -> Result<()> {
    let provider = context::load_provider(dirs)?;
    let preferences = context::preferences(args)?;
    let options = provider.get_all_options(features, &preferences)?;
    print_json(&Value::Object(options))
}

/// Run the filter command
pub fn run_filter(dirs: &[PathBuf], features: &[String], constraints: &str) -> Result<()> {
    let provider = context::load_provider(dirs)?;
    let preferences =
        GetOptionsPreferences::new().with_constraints(parse_json("constraints", constraints)?);
    for name in provider.get_filtered_feature_names(features, &preferences)? {
        println!("{name}");
    }
    Ok(())
}

/// Run the keys command
pub fn run_keys(dirs: &[PathBuf], pointer: &str, features: &[String]) -> Result<()> {
    let provider = context::load_provider(dirs)?;
    let names = if features.is_empty() {
        None
    } else {
        Some(features)
    };
    for key in provider.get_possible_keys(pointer, names)? {
        println!("{key}");
    }
    Ok(())
}
