use std::fmt;

use compact_str::CompactString;
use serde::Deserialize;

/// The value of a single setting.
///
/// Values are opaque to the merge, the only thing we ever do with them is replace one with
/// another.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    String(CompactString),
    List(Vec<Value>),
}

impl Value {
    /// Human readable name of the type of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Integer(_) => "integer",
            Value::String(_) => "string",
            Value::List(_) => "list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(val) => write!(f, "{val}"),
            Value::Integer(val) => write!(f, "{val}"),
            Value::String(val) => write!(f, "{:?}", val.as_str()),
            Value::List(vals) => {
                write!(f, "[")?;
                for (idx, val) in vals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{val}")?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(CompactString::new(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(CompactString::from(value))
    }
}

impl From<CompactString> for Value {
    fn from(value: CompactString) -> Self {
        Value::String(value)
    }
}

impl<V: Into<Value>> From<Vec<V>> for Value {
    fn from(values: Vec<V>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn smoketest_display() {
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(-3_i64).to_string(), "-3");
        assert_eq!(Value::from("com.example").to_string(), "\"com.example\"");
        assert_eq!(
            Value::from(vec!["a", "b"]).to_string(),
            "[\"a\", \"b\"]"
        );
    }

    #[test]
    fn smoketest_deserialize() {
        #[derive(Deserialize)]
        struct Doc {
            a: Value,
            b: Value,
            c: Value,
            d: Value,
        }

        let doc: Doc = toml::from_str(
            r#"
            a = true
            b = 42
            c = "0.1.0-SNAPSHOT"
            d = ["x", 1]
            "#,
        )
        .unwrap();

        assert_eq!(doc.a, Value::Bool(true));
        assert_eq!(doc.b, Value::Integer(42));
        assert_eq!(doc.c.as_str(), Some("0.1.0-SNAPSHOT"));
        assert_eq!(doc.d, Value::List(vec![Value::from("x"), Value::from(1_i64)]));
        assert_eq!(doc.d.type_name(), "list");
    }
}
