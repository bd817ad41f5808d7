//! Condition expressions gating whether a feature applies to a request
//!
//! ```json
//! { "and": [
//!     { "jsonPointer": "/env", "equals": "prod" },
//!     { "not": { "jsonPointer": "/region", "matches": "^eu-" } }
//! ] }
//! ```

use regex::Regex;
use serde_json::{Map, Value, json};

/// Test applied to the value found at a condition's JSON pointer.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Deep equality with the given value
    Equals(Value),
    /// Regex search over the value's string form
    Matches(Regex),
}

/// A parsed condition expression tree.
#[derive(Debug, Clone)]
pub enum ConditionExpression {
    Condition {
        json_pointer: String,
        predicate: Predicate,
    },
    And(Vec<ConditionExpression>),
    Or(Vec<ConditionExpression>),
    Not(Box<ConditionExpression>),
}

impl ConditionExpression {
    /// Parse an expression from its JSON form.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        let object = value
            .as_object()
            .ok_or_else(|| format!("expected a condition object, found {value}"))?;

        if let Some(children) = object.get("and") {
            only_keys(object, &["and"])?;
            return Ok(Self::And(parse_list(children, "and")?));
        }
        if let Some(children) = object.get("or") {
            only_keys(object, &["or"])?;
            return Ok(Self::Or(parse_list(children, "or")?));
        }
        if let Some(child) = object.get("not") {
            only_keys(object, &["not"])?;
            return Ok(Self::Not(Box::new(Self::from_value(child)?)));
        }
        if let Some(pointer) = object.get("jsonPointer") {
            only_keys(object, &["jsonPointer", "equals", "matches"])?;
            let json_pointer = pointer
                .as_str()
                .ok_or_else(|| format!("`jsonPointer` must be a string, found {pointer}"))?
                .to_string();
            let predicate = match (object.get("equals"), object.get("matches")) {
                (Some(expected), None) => Predicate::Equals(expected.clone()),
                (None, Some(Value::String(pattern))) => Predicate::Matches(
                    Regex::new(pattern)
                        .map_err(|e| format!("invalid pattern '{pattern}': {e}"))?,
                ),
                (None, Some(other)) => {
                    return Err(format!("`matches` must be a string, found {other}"));
                }
                (Some(_), Some(_)) => {
                    return Err("a condition takes either `equals` or `matches`, not both".into());
                }
                (None, None) => {
                    return Err(format!(
                        "condition on '{json_pointer}' needs `equals` or `matches`"
                    ));
                }
            };
            return Ok(Self::Condition {
                json_pointer,
                predicate,
            });
        }

        Err(format!(
            "expected one of `and`, `or`, `not` or `jsonPointer`, found {value}"
        ))
    }

    /// The JSON form of this expression.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Condition {
                json_pointer,
                predicate: Predicate::Equals(expected),
            } => json!({"jsonPointer": json_pointer, "equals": expected}),
            Self::Condition {
                json_pointer,
                predicate: Predicate::Matches(pattern),
            } => json!({"jsonPointer": json_pointer, "matches": pattern.as_str()}),
            Self::And(children) => {
                json!({"and": children.iter().map(Self::to_value).collect::<Vec<_>>()})
            }
            Self::Or(children) => {
                json!({"or": children.iter().map(Self::to_value).collect::<Vec<_>>()})
            }
            Self::Not(child) => json!({"not": child.to_value()}),
        }
    }
}

fn parse_list(value: &Value, operator: &str) -> Result<Vec<ConditionExpression>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("`{operator}` must be an array, found {value}"))?
        .iter()
        .map(ConditionExpression::from_value)
        .collect()
}

fn only_keys(object: &Map<String, Value>, allowed: &[&str]) -> Result<(), String> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(format!("unexpected key `{key}` in condition")),
        None => Ok(()),
    }
}
