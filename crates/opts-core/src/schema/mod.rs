//! Schema types for feature files and the records built from them

mod conditions;
mod feature;
mod metadata;

pub use conditions::{ConditionExpression, Predicate};
pub use feature::{Feature, FeatureFile, FeatureMetadata};
pub use metadata::OptionsMetadata;
