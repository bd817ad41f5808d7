//! CLI argument parsing using clap derive

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Query feature-keyed configuration options
#[derive(Parser, Debug)]
#[command(name = "opts")]
#[command(author, version, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config root to load; repeat for layered roots (later roots win)
    #[arg(short = 'd', long = "dir", global = true, value_name = "DIR")]
    pub dirs: Vec<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Features to merge, in order.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct FeatureArgs {
    /// Feature name or alias; repeat to merge several (later ones win)
    #[arg(short = 'f', long = "feature", value_name = "NAME", required = true)]
    pub features: Vec<String>,
}

/// Request preferences shared by the value commands.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct PreferenceArgs {
    /// JSON document that conditioned features are evaluated against
    #[arg(long, value_name = "JSON")]
    pub constraints: Option<String>,

    /// JSON object merged over the built options, keyed by top-level key
    #[arg(long, value_name = "JSON")]
    pub overrides: Option<String>,

    /// Request (true) or suppress (false) configurable string rendering
    #[arg(long, value_name = "BOOL")]
    pub configurable_strings: Option<bool>,

    /// Treat feature names as canonical; do not resolve aliases
    #[arg(long)]
    pub skip_conversion: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Build the value of an options key
    ///
    /// Examples:
    ///   opts get msg -f child
    ///   opts get server.port -f base -f prod --constraints '{"env":"prod"}'
    Get {
        /// Options key; dots navigate nested values ("server.tls.port")
        key: String,

        #[command(flatten)]
        features: FeatureArgs,

        #[command(flatten)]
        preferences: PreferenceArgs,
    },

    /// Build every top-level key declared by the features
    All {
        #[command(flatten)]
        features: FeatureArgs,

        #[command(flatten)]
        preferences: PreferenceArgs,
    },

    /// List canonical feature names
    Features {
        /// Include declared aliases
        #[arg(long)]
        aliases: bool,
    },

    /// Show feature metadata as JSON
    Metadata {
        /// Feature name or alias; all features when omitted
        name: Option<String>,
    },

    /// Show which features apply under the given constraints
    Filter {
        #[command(flatten)]
        features: FeatureArgs,

        /// JSON document that conditioned features are evaluated against
        #[arg(long, value_name = "JSON")]
        constraints: String,
    },

    /// List the keys below a JSON pointer in the merged options
    Keys {
        /// JSON pointer, for example "/server" ("" for the root)
        #[arg(default_value = "")]
        pointer: String,

        /// Restrict to these features
        #[arg(short = 'f', long = "feature", value_name = "NAME")]
        features: Vec<String>,
    },

    /// Print a key, then print it again after every change to the roots
    Watch {
        /// Options key; dots navigate nested values
        key: String,

        #[command(flatten)]
        features: FeatureArgs,

        /// Stop after this many updates
        #[arg(long, value_name = "N")]
        max_updates: Option<usize>,
    },
}
