//! Command implementations for opts-cli

pub mod features;
pub mod query;
pub mod watch;

pub use features::{run_features, run_metadata};
pub use query::{run_all, run_filter, run_get, run_keys};
pub use watch::run_watch;
