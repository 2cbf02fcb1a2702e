//! Value-to-string policies used by interpolation

use std::fmt::Debug;

use super::environment::Value;

/// Turns environment values into output text.
///
/// Implementations decide the escaping policy. [`Value::Literal`] is trusted
/// markup and must be returned unchanged by every implementation.
pub trait Stringifier: Debug + Send + Sync {
    fn stringify(&self, value: &Value) -> String;

    fn stringify_all(&self, values: &[Value]) -> String;
}

/// Separator placed between the items of a stringified list
pub const LIST_SEPARATOR: &str = ", ";

/// Emits values as-is, without escaping
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainStringifier;

impl Stringifier for PlainStringifier {
    fn stringify(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::Text(s) | Value::Literal(s) => s.clone(),
            Value::List(items) => self.stringify_all(items),
            Value::Map(env) => serde_json::Value::Object(env.clone().into()).to_string(),
        }
    }

    fn stringify_all(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.stringify(v))
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR)
    }
}

/// HTML-escapes every computed value; literals pass through untouched
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlStringifier;

impl Stringifier for HtmlStringifier {
    fn stringify(&self, value: &Value) -> String {
        match value {
            Value::Literal(s) => s.clone(),
            Value::List(items) => self.stringify_all(items),
            other => {
                html_escape::encode_quoted_attribute(&PlainStringifier.stringify(other)).into_owned()
            }
        }
    }

    fn stringify_all(&self, values: &[Value]) -> String {
        values
            .iter()
            .map(|v| self.stringify(v))
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR)
    }
}
