//! Feature listing and metadata

use crate::context::{self, print_json};
use crate::error::Result;
use colored::Colorize;
use opts_core::OptionsRegistry;
use std::path::PathBuf;

/// Run the features command
pub fn run_features(dirs: &[PathBuf], with_aliases: bool) -> Result<()> {
    let provider = context::load_provider(dirs)?;
    let metadata = provider.features_with_metadata();

    for (name, meta) in metadata.iter() {
        match meta.aliases.as_deref() {
            Some(aliases) if with_aliases && !aliases.is_empty() => {
                println!("{} ({})", name.green(), aliases.join(", ").dimmed());
            }
            _ => println!("{}", name.green()),
        }
    }
    Ok(())
}

/// Run the metadata command
pub fn run_metadata(dirs: &[PathBuf], name: Option<&str>) -> Result<()> {
    let provider = context::load_provider(dirs)?;
    match name {
        Some(name) => print_json(&provider.get_feature_metadata(name)?),
        None => print_json(provider.features_with_metadata().as_ref()),
    }
}
