//! Dynamic values supplied by the render context.
//!
//! Values follow the truthiness and formatting rules template authors expect
//! from the directive language: only null and `false` are falsy (empty lists
//! are falsy for plain conditions), floats print with a trailing `.0`, and a
//! small allow-list of member names can be called on any value.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

use crate::content::Content;
use crate::context::Context;

/// Member names callable on values besides map keys.
pub const KNOWN_METHODS: &[&str] = &[
    "abs",
    "any?",
    "blank?",
    "capitalize",
    "count",
    "downcase",
    "empty?",
    "first",
    "keys",
    "last",
    "length",
    "name",
    "negative?",
    "nil?",
    "positive?",
    "present?",
    "size",
    "strip",
    "to_f",
    "to_i",
    "to_s",
    "upcase",
    "values",
    "zero?",
];

/// A context value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(Context),
    /// Pre-tagged content produced by context normalization.
    Content(Content),
}

impl Value {
    /// Name of the value's type, for error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Content(content) => content.kind(),
        }
    }

    /// Anything but null and `false`.
    #[must_use]
    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Null | Self::Bool(false))
    }

    /// Truthiness for plain conditions: present, and non-empty if a list.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::List(items) => !items.is_empty(),
            other => other.is_present(),
        }
    }

    /// Null, `false`, whitespace-only strings and empty collections.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Null | Self::Bool(false) => true,
            Self::String(s) => s.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Map(map) => map.is_empty(),
            _ => false,
        }
    }

    /// Resolve one member access: a map key, or an allow-listed method.
    ///
    /// Map keys take precedence, so `{"size": 3}.size` is 3.
    #[must_use]
    pub fn member(&self, name: &str) -> Option<Cow<'_, Value>> {
        if let Self::Map(map) = self
            && let Some(value) = map.get(name)
        {
            return Some(Cow::Borrowed(value));
        }
        self.method(name).map(Cow::Owned)
    }

    /// Call an allow-listed method. Returns `None` for names the value does
    /// not respond to.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<Value> {
        match name {
            "nil?" => return Some(Self::Bool(matches!(self, Self::Null))),
            "blank?" => return Some(Self::Bool(self.is_blank())),
            "present?" => return Some(Self::Bool(!self.is_blank())),
            "to_s" => return Some(Self::String(self.to_string())),
            _ => {}
        }
        match self {
            Self::List(items) => list_method(items, name),
            Self::Map(map) => map_method(map, name),
            Self::String(s) => string_method(s, name),
            Self::Integer(i) => integer_method(*i, name),
            Self::Float(f) => float_method(*f, name),
            Self::Content(Content::Image(image)) if name == "name" => {
                Some(Self::String(image.name().to_owned()))
            }
            _ => None,
        }
    }

    /// Turn a collection into the items a loop iterates.
    ///
    /// Maps yield `[key, value]` pairs in insertion order. Other values are
    /// handed back unchanged.
    pub fn into_items(self) -> Result<Vec<Value>, Value> {
        match self {
            Self::List(items) => Ok(items),
            Self::Map(map) => Ok(map
                .into_iter()
                .map(|(key, value)| Self::List(vec![Self::String(key), value]))
                .collect()),
            other => Err(other),
        }
    }

    /// Unwrap a one-element list into its element.
    #[must_use]
    pub fn collapse_single(self) -> Self {
        match self {
            Self::List(mut items) if items.len() == 1 => items.remove(0),
            other => other,
        }
    }

    /// Equality used by comparisons: numbers compare by value across
    /// integer and float.
    #[must_use]
    pub fn loose_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::List(a), Self::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => self == other,
            },
        }
    }

    /// Ordering between numbers, or between strings. `None` otherwise.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            _ => self.as_number()?.partial_cmp(&other.as_number()?),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Debug-style rendering used in error messages: strings are quoted.
    #[must_use]
    pub fn inspect(&self) -> String {
        match self {
            Self::Null => "nil".to_owned(),
            Self::String(s) => format!("{s:?}"),
            Self::List(items) => inspect_list(items),
            Self::Map(map) => {
                let pairs: Vec<String> = map
                    .iter()
                    .map(|(key, value)| format!("{key:?} => {}", value.inspect()))
                    .collect();
                format!("{{{}}}", pairs.join(", "))
            }
            Self::Content(content) => format!("#<{} content>", content.kind()),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => f.write_str(&format_float(*x)),
            Self::String(s) => f.write_str(s),
            Self::List(items) => f.write_str(&inspect_list(items)),
            Self::Map(_) => f.write_str(&self.inspect()),
            Self::Content(content) => f.write_str(content.as_text()),
        }
    }
}

fn inspect_list(items: &[Value]) -> String {
    let items: Vec<String> = items.iter().map(Value::inspect).collect();
    format!("[{}]", items.join(", "))
}

/// Format a float the way template authors expect: `2.0`, not `2`.
#[must_use]
pub fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

#[allow(clippy::cast_possible_wrap)]
fn list_method(items: &[Value], name: &str) -> Option<Value> {
    match name {
        "size" | "length" | "count" => Some(Value::Integer(items.len() as i64)),
        "first" => items.first().cloned(),
        "last" => items.last().cloned(),
        "empty?" => Some(Value::Bool(items.is_empty())),
        "any?" => Some(Value::Bool(items.iter().any(Value::is_present))),
        _ => None,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn map_method(map: &Context, name: &str) -> Option<Value> {
    match name {
        "size" | "length" | "count" => Some(Value::Integer(map.len() as i64)),
        "empty?" => Some(Value::Bool(map.is_empty())),
        "any?" => Some(Value::Bool(!map.is_empty())),
        "keys" => Some(Value::List(
            map.keys().map(|key| Value::String(key.to_owned())).collect(),
        )),
        "values" => Some(Value::List(map.iter().map(|(_, v)| v.clone()).collect())),
        _ => None,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn string_method(s: &str, name: &str) -> Option<Value> {
    let result = match name {
        "size" | "length" => return Some(Value::Integer(s.chars().count() as i64)),
        "empty?" => return Some(Value::Bool(s.is_empty())),
        "upcase" => s.to_uppercase(),
        "downcase" => s.to_lowercase(),
        "strip" => s.trim().to_owned(),
        "capitalize" => {
            let mut chars = s.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        }
        _ => return None,
    };
    Some(Value::String(result))
}

#[allow(clippy::cast_precision_loss)]
fn integer_method(i: i64, name: &str) -> Option<Value> {
    match name {
        "zero?" => Some(Value::Bool(i == 0)),
        "positive?" => Some(Value::Bool(i > 0)),
        "negative?" => Some(Value::Bool(i < 0)),
        "abs" => Some(Value::Integer(i.saturating_abs())),
        "to_i" => Some(Value::Integer(i)),
        "to_f" => Some(Value::Float(i as f64)),
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_method(f: f64, name: &str) -> Option<Value> {
    match name {
        "zero?" => Some(Value::Bool(f == 0.0)),
        "positive?" => Some(Value::Bool(f > 0.0)),
        "negative?" => Some(Value::Bool(f < 0.0)),
        "abs" => Some(Value::Float(f.abs())),
        "to_i" => Some(Value::Integer(f.trunc() as i64)),
        "to_f" => Some(Value::Float(f)),
        _ => None,
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Integer)
                .or_else(|| n.as_f64().map(Self::Float))
                .unwrap_or_default(),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Self::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<Context> for Value {
    fn from(map: Context) -> Self {
        Self::Map(map)
    }
}
