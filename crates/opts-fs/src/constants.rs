//! Reserved names shared by every config root.

use std::path::Path;

/// File extensions decoded as feature files. Matching is case-insensitive.
pub const RECOGNIZED_EXTENSIONS: [&str; 4] = ["json", "json5", "yaml", "yml"];

/// Whether `extension` (without the leading dot) names a feature file format.
pub fn is_recognized_extension(extension: &str) -> bool {
    RECOGNIZED_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(extension))
}

/// Reserved paths inside a config root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptsPath {
    /// The `.opts` directory holding builder settings; never scanned for features
    MetadataDir,
    /// The `config.json` builder settings file inside [`OptsPath::MetadataDir`]
    BuilderConfig,
}

impl OptsPath {
    /// Get the string representation of the path.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MetadataDir => ".opts",
            Self::BuilderConfig => "config.json",
        }
    }
}

impl AsRef<Path> for OptsPath {
    fn as_ref(&self) -> &Path {
        Path::new(self.as_str())
    }
}

impl AsRef<str> for OptsPath {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl std::fmt::Display for OptsPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_extensions_ignore_case() {
        assert!(is_recognized_extension("json"));
        assert!(is_recognized_extension("YAML"));
        assert!(is_recognized_extension("Json5"));
        assert!(!is_recognized_extension("md"));
        assert!(!is_recognized_extension("toml"));
    }
}
