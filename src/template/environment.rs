//! Render-time key/value environment

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single environment value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    /// Untrusted text; escaped by stringifiers that escape
    Text(String),
    /// Trusted markup (e.g. output of a previous render); never re-escaped
    Literal(String),
    List(Vec<Value>),
    Map(Environment),
}

impl Value {
    /// Wrap already-rendered markup so it is emitted verbatim
    pub fn literal(value: impl Into<String>) -> Self {
        Value::Literal(value.into())
    }

    /// Look up one path segment inside a nested map or list
    fn child(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Map(env) => env.get(segment),
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(Environment::from(map)),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Number(n) => serde_json::Value::Number(n),
            Value::Text(s) | Value::Literal(s) => serde_json::Value::String(s),
            Value::List(items) => {
                serde_json::Value::Array(items.into_iter().map(serde_json::Value::from).collect())
            }
            Value::Map(env) => serde_json::Value::Object(env.into()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Number(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(value.into())
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Number((value as u64).into())
    }
}

impl From<Environment> for Value {
    fn from(value: Environment) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

/// Mapping from variable name to value, supplied per render call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "serde_json::Map<String, serde_json::Value>",
    into = "serde_json::Map<String, serde_json::Value>"
)]
pub struct Environment {
    values: BTreeMap<String, Value>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an environment from a JSON value; `None` unless it is an object
    pub fn from_json(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Object(map) => Some(Self::from(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Resolve a dotted reference such as `user.name` or `rows.0.title`.
    ///
    /// A key containing dots that exists verbatim wins over the nested lookup.
    pub fn lookup(&self, reference: &str) -> Option<&Value> {
        if let Some(value) = self.values.get(reference) {
            return Some(value);
        }

        let mut segments = reference.split('.');
        let first = segments.next()?;
        segments.try_fold(self.values.get(first)?, |value, segment| value.child(segment))
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(key.into(), value.into())
    }

    /// A copy of `self` overlaid with `overlay`; keys from `overlay` win
    pub fn merged(&self, overlay: &Environment) -> Environment {
        let mut merged = self.clone();
        for (key, value) in &overlay.values {
            merged.values.insert(key.clone(), value.clone());
        }
        merged
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for Environment {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self {
            values: map.into_iter().map(|(k, v)| (k, Value::from(v))).collect(),
        }
    }
}

impl From<Environment> for serde_json::Map<String, serde_json::Value> {
    fn from(env: Environment) -> Self {
        env.values
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::from(v)))
            .collect()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env(value: serde_json::Value) -> Environment {
        Environment::from_json(value).unwrap()
    }

    #[test]
    fn test_from_json_requires_object() {
        assert!(Environment::from_json(json!({"a": 1})).is_some());
        assert!(Environment::from_json(json!([1, 2])).is_none());
        assert!(Environment::from_json(json!("text")).is_none());
    }

    #[test]
    fn test_dotted_lookup() {
        let env = env(json!({
            "user": {"name": "Alice", "tags": ["admin", "dev"]},
            "rows": [{"title": "first"}, {"title": "second"}]
        }));

        assert_eq!(env.lookup("user.name"), Some(&Value::Text("Alice".into())));
        assert_eq!(env.lookup("user.tags.1"), Some(&Value::Text("dev".into())));
        assert_eq!(env.lookup("rows.0.title"), Some(&Value::Text("first".into())));
        assert_eq!(env.lookup("rows.5.title"), None);
        assert_eq!(env.lookup("user.missing"), None);
        assert_eq!(env.lookup("missing"), None);
    }

    #[test]
    fn test_literal_dotted_key_wins() {
        let env = env(json!({"a.b": "flat", "a": {"b": "nested"}}));
        assert_eq!(env.lookup("a.b"), Some(&Value::Text("flat".into())));
    }

    #[test]
    fn test_merged_overlay_wins() {
        let defaults = env(json!({"color": "red", "size": 1}));
        let item = env(json!({"color": "blue"}));

        let merged = defaults.merged(&item);
        assert_eq!(merged.get("color"), Some(&Value::Text("blue".into())));
        assert_eq!(merged.get("size"), Some(&Value::from(1i64)));
        // Inputs are untouched
        assert_eq!(defaults.get("color"), Some(&Value::Text("red".into())));
    }

    #[test]
    fn test_deserialize_from_json() {
        let env: Environment = serde_json::from_value(json!({"n": 5, "xs": [true, null]})).unwrap();
        assert_eq!(env.get("n"), Some(&Value::from(5i64)));
        assert_eq!(
            env.get("xs"),
            Some(&Value::List(vec![Value::Bool(true), Value::Null]))
        );

        assert!(serde_json::from_value::<Environment>(json!([1])).is_err());
    }

    #[test]
    fn test_serialize_literal_as_string() {
        let mut env = Environment::new();
        env.insert("html", Value::literal("<b>x</b>"));
        assert_eq!(serde_json::to_value(&env).unwrap(), json!({"html": "<b>x</b>"}));
    }
}
