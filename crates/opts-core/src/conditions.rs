//! Evaluation of condition expressions against request constraints

use crate::schema::{ConditionExpression, Feature, Predicate};
use serde_json::Value;
use std::collections::BTreeMap;

impl ConditionExpression {
    /// Evaluate this expression against a constraints document.
    ///
    /// An empty `and` is true and an empty `or` is false. A condition whose
    /// pointer leads nowhere is false.
    pub fn evaluate(&self, constraints: &Value) -> bool {
        match self {
            Self::Condition {
                json_pointer,
                predicate,
            } => match resolve_pointer(constraints, json_pointer) {
                Some(value) => predicate.test(value),
                None => false,
            },
            Self::And(children) => children.iter().all(|child| child.evaluate(constraints)),
            Self::Or(children) => children.iter().any(|child| child.evaluate(constraints)),
            Self::Not(child) => !child.evaluate(constraints),
        }
    }
}

impl Predicate {
    /// Apply the predicate to a resolved constraint value.
    pub fn test(&self, value: &Value) -> bool {
        match self {
            Self::Equals(expected) => value == expected,
            Self::Matches(pattern) => match value {
                Value::String(text) => pattern.is_match(text),
                other => pattern.is_match(&other.to_string()),
            },
        }
    }
}

/// Look up a JSON pointer in `document`.
///
/// Both `""` and `"/"` address the whole document. Segments are unescaped
/// (`~1` to `/`, then `~0` to `~`); arrays are indexed by decimal position.
pub fn resolve_pointer<'v>(document: &'v Value, pointer: &str) -> Option<&'v Value> {
    if pointer.is_empty() || pointer == "/" {
        return Some(document);
    }
    let rest = pointer.strip_prefix('/')?;

    rest.split('/').try_fold(document, |current, segment| {
        let segment = segment.replace("~1", "/").replace("~0", "~");
        match current {
            Value::Object(map) => map.get(&segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

/// Keep the names whose feature has no conditions or satisfied conditions.
///
/// Without constraints nothing is filtered. Names not present in `features`
/// are kept; callers resolve names before filtering.
pub fn filter_by_constraints(
    features: &BTreeMap<String, Feature>,
    names: Vec<String>,
    constraints: Option<&Value>,
) -> Vec<String> {
    let Some(constraints) = constraints else {
        return names;
    };

    names
        .into_iter()
        .filter(|name| {
            let keep = features
                .get(name)
                .and_then(|feature| feature.conditions.as_ref())
                .is_none_or(|conditions| conditions.evaluate(constraints));
            if !keep {
                tracing::trace!(feature = %name, "Filtered out by constraints");
            }
            keep
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn parse(source: Value) -> ConditionExpression {
        ConditionExpression::from_value(&source).unwrap()
    }

    #[rstest]
    #[case(json!({"env": "prod"}), true)]
    #[case(json!({"env": "dev"}), false)]
    #[case(json!({}), false)]
    #[case(json!({"env": {"name": "prod"}}), false)]
    fn equals_on_pointer(#[case] constraints: Value, #[case] expected: bool) {
        let condition = parse(json!({"jsonPointer": "/env", "equals": "prod"}));
        assert_eq!(condition.evaluate(&constraints), expected);
    }

    #[test]
    fn equals_is_deep() {
        let condition = parse(json!({"jsonPointer": "/client", "equals": {"id": 1, "tags": ["a"]}}));
        assert!(condition.evaluate(&json!({"client": {"tags": ["a"], "id": 1}})));
        assert!(!condition.evaluate(&json!({"client": {"tags": ["a", "b"], "id": 1}})));
    }

    #[test]
    fn matches_stringifies_non_strings() {
        let condition = parse(json!({"jsonPointer": "/version", "matches": "^1\\.2"}));
        assert!(condition.evaluate(&json!({"version": "1.2.3"})));
        assert!(condition.evaluate(&json!({"version": 1.25})));
        assert!(!condition.evaluate(&json!({"version": 2})));

        let flag = parse(json!({"jsonPointer": "/flag", "matches": "^true$"}));
        assert!(flag.evaluate(&json!({"flag": true})));
    }

    #[test]
    fn whole_document_pointers() {
        let doc = json!({"a": 1});
        assert_eq!(resolve_pointer(&doc, ""), Some(&doc));
        assert_eq!(resolve_pointer(&doc, "/"), Some(&doc));
        let condition = parse(json!({"jsonPointer": "", "equals": {"a": 1}}));
        assert!(condition.evaluate(&doc));
    }

    #[test]
    fn pointer_unescapes_and_indexes_arrays() {
        let doc = json!({"a/b": {"m~n": [10, 20]}});
        assert_eq!(resolve_pointer(&doc, "/a~1b/m~0n/1"), Some(&json!(20)));
        assert_eq!(resolve_pointer(&doc, "/a~1b/m~0n/2"), None);
        assert_eq!(resolve_pointer(&doc, "/a~1b/m~0n/x"), None);
        assert_eq!(resolve_pointer(&doc, "a"), None);
        assert_eq!(resolve_pointer(&json!({"a": 1}), "/a/b"), None);
    }

    #[test]
    fn boolean_operators() {
        let both = parse(json!({"and": [
            {"jsonPointer": "/env", "equals": "prod"},
            {"not": {"jsonPointer": "/region", "matches": "^eu-"}}
        ]}));
        assert!(both.evaluate(&json!({"env": "prod", "region": "us-east"})));
        assert!(!both.evaluate(&json!({"env": "prod", "region": "eu-west"})));

        let either = parse(json!({"or": [
            {"jsonPointer": "/env", "equals": "dev"},
            {"jsonPointer": "/env", "equals": "test"}
        ]}));
        assert!(either.evaluate(&json!({"env": "test"})));
        assert!(!either.evaluate(&json!({"env": "prod"})));
    }

    #[test]
    fn empty_and_is_true_empty_or_is_false() {
        assert!(parse(json!({"and": []})).evaluate(&json!({})));
        assert!(!parse(json!({"or": []})).evaluate(&json!({})));
    }

    #[test]
    fn not_of_missing_path_is_true() {
        let condition = parse(json!({"not": {"jsonPointer": "/missing", "equals": 1}}));
        assert!(condition.evaluate(&json!({})));
    }
}
