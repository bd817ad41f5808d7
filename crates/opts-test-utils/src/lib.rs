//! Shared test utilities for the opts workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`feature_dir`]: [`FeatureDir`] builder for temporary config roots

pub mod feature_dir;

pub use feature_dir::FeatureDir;
