//! Watch a key and re-print it after every rebuild

use crate::context::{self, print_json};
use crate::error::{CliError, Result};
use colored::Colorize;
use opts_core::{GetOptionsPreferences, OptionsRegistry};
use std::path::PathBuf;
use std::sync::mpsc;

/// Run the watch command
pub fn run_watch(
    dirs: &[PathBuf],
    key: &str,
    features: &[String],
    max_updates: Option<usize>,
) -> Result<()> {
    let watcher = context::load_watcher(dirs)?;
    print_json(&watcher.get_options(key, features)?)?;

    let (sender, receiver) = mpsc::channel();
    let listener_key = key.to_string();
    let listener_features = features.to_vec();
    watcher.add_listener(move |state, changed| {
        let value = state.options(
            &listener_key,
            &listener_features,
            &GetOptionsPreferences::default(),
        );
        let _ = sender.send((changed.len(), value));
    });

    let mut updates = 0;
    while max_updates.is_none_or(|max| updates < max) {
        let Ok((changed, value)) = receiver.recv() else {
            return Err(CliError::user("watcher stopped unexpectedly"));
        };
        updates += 1;
        eprintln!("{} {} file(s) changed", "reloaded:".cyan().bold(), changed);
        match value {
            Ok(value) => print_json(&value)?,
            Err(e) => eprintln!("{}: {}", "error".red().bold(), e),
        }
    }
    Ok(())
}
