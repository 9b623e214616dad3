//! Render context: an ordered map of names to values.
//!
//! Keys of the form `kind:name` are rewritten by [`Context::normalize`] into
//! `name` bound to tagged [`Content`], e.g. `"html:body"` becomes `body`.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::content::{Content, Image};
use crate::error::ContextError;
use crate::value::Value;

static CONTENT_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\A([^:]+):(.+)\z").expect("invalid content key regex"));

/// Ordered mapping from names to values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context(IndexMap<String, Value>);

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::NotAnObject`] if `json` is not an object.
    pub fn from_json(json: serde_json::Value) -> Result<Self, ContextError> {
        match Value::from(json) {
            Value::Map(context) => Ok(context),
            other => Err(ContextError::NotAnObject(other.type_name())),
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// Insert a value, replacing any previous value for `name`.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Builder form of [`Context::insert`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Rewrite `kind:name` keys into tagged content, recursively.
    ///
    /// Nested maps, and maps directly inside lists, are normalized too. A
    /// null value under a tagged key stays null so that the name is bound but
    /// absent. Already-tagged content passes through, which makes this
    /// idempotent.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown content kinds or values a kind cannot
    /// hold.
    pub fn normalize(self) -> Result<Self, ContextError> {
        let mut normalized = IndexMap::with_capacity(self.0.len());
        for (key, value) in self.0 {
            let (key, value) = normalize_entry(key, value)?;
            normalized.insert(key, value);
        }
        Ok(Self(normalized))
    }

    /// All values in the context matching `predicate`.
    #[must_use]
    pub fn values_of(&self, predicate: impl Fn(&Value) -> bool) -> Vec<Value> {
        let mut found = Vec::new();
        for (key, value) in &self.0 {
            collect_entry(key, value, &predicate, &mut found);
        }
        found
    }

    /// Every image reachable from the context.
    #[must_use]
    pub fn images(&self) -> Vec<Image> {
        self.values_of(|value| matches!(value, Value::Content(Content::Image(_))))
            .into_iter()
            .filter_map(|value| match value {
                Value::Content(Content::Image(image)) => Some(image),
                _ => None,
            })
            .collect()
    }
}

fn normalize_entry(key: String, value: Value) -> Result<(String, Value), ContextError> {
    if let Some(caps) = CONTENT_KEY.captures(&key) {
        let name = caps[2].to_owned();
        let value = match value {
            Value::Null => Value::Null,
            Value::Content(content) => Value::Content(content),
            value => Value::Content(Content::make(&caps[1], &name, value)?),
        };
        return Ok((name, value));
    }
    Ok((key, normalize_value(value)?))
}

fn normalize_value(value: Value) -> Result<Value, ContextError> {
    Ok(match value {
        Value::Map(map) => Value::Map(map.normalize()?),
        Value::List(items) => Value::List(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Map(map) => map.normalize().map(Value::Map),
                    other => Ok(other),
                })
                .collect::<Result<_, _>>()?,
        ),
        other => other,
    })
}

/// A matching value is collected without descending into it. Maps recurse
/// into each value, or into the key when the value is null.
fn collect_value(value: &Value, predicate: &impl Fn(&Value) -> bool, found: &mut Vec<Value>) {
    if predicate(value) {
        found.push(value.clone());
        return;
    }
    match value {
        Value::Map(map) => {
            for (key, value) in map.iter() {
                collect_entry(key, value, predicate, found);
            }
        }
        Value::List(items) => {
            for item in items {
                collect_value(item, predicate, found);
            }
        }
        _ => {}
    }
}

fn collect_entry(
    key: &str,
    value: &Value,
    predicate: &impl Fn(&Value) -> bool,
    found: &mut Vec<Value>,
) {
    if matches!(value, Value::Null) {
        collect_value(&Value::String(key.to_owned()), predicate, found);
    } else {
        collect_value(value, predicate, found);
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Context {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
