// used for the domain values every databag entry decodes into
use serde_json::{Number, Value};
use serde::{Deserialize, Serialize};

// used when parsing a string to a field kind
use std::str::FromStr;
// used to print out readable forms of a field kind
use std::fmt;

/// The declared type of a schema field.
///
/// Every kind carries a stable short name (`DATA_TYPE` style) which is what
/// diagnostics and template descriptions print.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    #[serde(rename = "str", alias = "string")]
    String,
    #[serde(rename = "int", alias = "integer")]
    Integer,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "bool", alias = "boolean")]
    Boolean,
    #[serde(rename = "list")]
    List,
    #[serde(rename = "dict", alias = "object")]
    Object,
    #[serde(rename = "any")]
    Any,
}

// ------------- Field Kinds --------------
impl FieldKind {
    pub const ALL: [FieldKind; 7] = [
        FieldKind::String,
        FieldKind::Integer,
        FieldKind::Float,
        FieldKind::Boolean,
        FieldKind::List,
        FieldKind::Object,
        FieldKind::Any,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String => "str",
            FieldKind::Integer => "int",
            FieldKind::Float => "float",
            FieldKind::Boolean => "bool",
            FieldKind::List => "list",
            FieldKind::Object => "dict",
            FieldKind::Any => "any",
        }
    }

    /// Strict instance check: is `value` already of this kind?
    /// Floats accept any JSON number.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
            FieldKind::Float => value.is_number(),
            FieldKind::Boolean => value.is_boolean(),
            FieldKind::List => value.is_array(),
            FieldKind::Object => value.is_object(),
            FieldKind::Any => true,
        }
    }

    /// Instantiates this kind from databag text, without any leniency.
    ///
    /// Strings are the one exception: a JSON string literal is unquoted, any
    /// other text is taken verbatim, so that values written by peers which do
    /// not quote their strings still read back.
    pub fn parse(&self, text: &str) -> Option<Value> {
        match self {
            FieldKind::Integer => parse_integer(text),
            FieldKind::Float => parse_number(text),
            FieldKind::Boolean => match text.trim() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            FieldKind::String => match serde_json::from_str::<Value>(text) {
                Ok(Value::String(s)) => Some(Value::String(s)),
                _ => Some(Value::String(text.to_owned())),
            },
            FieldKind::List | FieldKind::Object | FieldKind::Any => serde_json::from_str::<Value>(text)
                .ok()
                .filter(|v| self.matches(v)),
        }
    }

    /// Lax coercion of an already decoded value into this kind, the way a
    /// validation library would: numeric strings become numbers, numbers
    /// become strings, integral floats become integers and so on.
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (FieldKind::Any, v) => Some(v.clone()),
            (FieldKind::Integer, Value::Number(n)) => integral(n),
            (FieldKind::Integer, Value::String(s)) => parse_integer(s),
            (FieldKind::Float, Value::Number(_)) => Some(value.clone()),
            (FieldKind::Float, Value::String(s)) => parse_number(s),
            (FieldKind::Boolean, Value::Bool(_)) => Some(value.clone()),
            (FieldKind::Boolean, Value::String(s)) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            (FieldKind::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            (FieldKind::String, Value::String(_)) => Some(value.clone()),
            (FieldKind::String, Value::Number(n)) => Some(Value::String(n.to_string())),
            (FieldKind::List, Value::Array(_)) => Some(value.clone()),
            (FieldKind::Object, Value::Object(_)) => Some(value.clone()),
            _ => None,
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FieldKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKind::ALL
            .iter()
            .find(|kind| kind.name() == s)
            .copied()
            .ok_or_else(|| format!("unknown field kind {s}"))
    }
}

// Unsigned values past i64::MAX are still integers.
fn parse_integer(text: &str) -> Option<Value> {
    let text = text.trim();
    text.parse::<i64>()
        .map(Value::from)
        .or_else(|_| text.parse::<u64>().map(Value::from))
        .ok()
}

// Integers stay integers so that `42` does not come back as `42.0`.
fn parse_number(text: &str) -> Option<Value> {
    let text = text.trim();
    if let Some(integer) = parse_integer(text) {
        return Some(integer);
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

fn integral(n: &Number) -> Option<Value> {
    if n.is_i64() || n.is_u64() {
        return Some(Value::Number(n.clone()));
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
        .map(|f| Value::from(f as i64))
}
