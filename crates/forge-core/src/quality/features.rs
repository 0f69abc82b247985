use crate::error::{ForgeError, Result};
use serde_json::Value;

/// Read-only view of a stage document with dotted-path lookup.
///
/// The document must be a JSON object. Paths like `problem.statement`
/// descend through nested objects; a missing segment yields `None`.
#[derive(Debug, Clone, Copy)]
pub struct StageFeatures<'a> {
    content: &'a Value,
}

impl<'a> StageFeatures<'a> {
    pub fn extract(content: &'a Value) -> Result<Self> {
        match content {
            Value::Object(_) => Ok(Self { content }),
            other => Err(ForgeError::validation(
                "content",
                format!("stage content must be an object, got {}", kind_of(other)),
            )),
        }
    }

    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        lookup(self.content, path)
    }

    pub fn is_populated(&self, path: &str) -> bool {
        self.lookup(path).is_some_and(is_populated)
    }
}

pub fn lookup<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.')
        .filter(|seg| !seg.is_empty())
        .try_fold(root, |value, seg| value.get(seg))
}

/// Non-null and, for strings and containers, non-empty.
pub fn is_populated(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Word count of a string or a list of strings. Other shapes return `None`.
pub fn word_count(value: &Value) -> Option<usize> {
    match value {
        Value::Null => Some(0),
        Value::String(s) => Some(s.split_whitespace().count()),
        Value::Array(items) => items.iter().try_fold(0usize, |acc, item| match item {
            Value::String(s) => Some(acc + s.split_whitespace().count()),
            _ => None,
        }),
        _ => None,
    }
}

pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_requires_object() {
        assert!(StageFeatures::extract(&json!({"a": 1})).is_ok());
        assert!(StageFeatures::extract(&json!([1, 2])).is_err());
        assert!(StageFeatures::extract(&json!("text")).is_err());
    }

    #[test]
    fn dotted_lookup_descends_objects() {
        let doc = json!({"problem": {"statement": "slow checkout", "users": []}});
        let f = StageFeatures::extract(&doc).unwrap();
        assert_eq!(f.lookup("problem.statement"), Some(&json!("slow checkout")));
        assert!(f.lookup("problem.missing").is_none());
        assert!(f.lookup("problem.statement.deeper").is_none());
        assert!(f.is_populated("problem.statement"));
        assert!(!f.is_populated("problem.users"));
    }

    #[test]
    fn populated_rules() {
        assert!(!is_populated(&json!(null)));
        assert!(!is_populated(&json!("   ")));
        assert!(!is_populated(&json!({})));
        assert!(is_populated(&json!(0)));
        assert!(is_populated(&json!(false)));
        assert!(is_populated(&json!(["x"])));
    }

    #[test]
    fn word_count_shapes() {
        assert_eq!(word_count(&json!("one two  three")), Some(3));
        assert_eq!(word_count(&json!(["a b", "c"])), Some(3));
        assert_eq!(word_count(&json!(null)), Some(0));
        assert_eq!(word_count(&json!({"a": "b"})), None);
        assert_eq!(word_count(&json!(["a", 1])), None);
    }
}
