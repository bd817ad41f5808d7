//! Filesystem layer for feature option files
//!
//! Provides forward-slash path handling, the reserved path constants shared by
//! every config root, and format-agnostic decoding of feature files.

pub mod constants;
pub mod error;
pub mod format;
pub mod io;
pub mod path;

pub use constants::{OptsPath, RECOGNIZED_EXTENSIONS, is_recognized_extension};
pub use error::{Error, Result};
pub use format::{FeatureFileStore, FileFormat};
pub use path::NormalizedPath;
