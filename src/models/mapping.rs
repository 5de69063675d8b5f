//! Import-side mapping tables: attribute renames and context overrides.

use super::FieldSet;
use crate::{Error, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Input field name to target field name rename table.
///
/// Keys missing from the table pass through under their original name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap(HashMap<String, String>);

impl AttributeMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rename from `input` to `target`.
    #[must_use]
    pub fn map(mut self, input: impl Into<String>, target: impl Into<String>) -> Self {
        self.0.insert(input.into(), target.into());
        self
    }

    /// Returns the target name for an input key.
    #[must_use]
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        self.0.get(key).map_or(key, String::as_str)
    }

    /// Returns a copy without the given input keys.
    #[must_use]
    pub fn without(&self, excluded: &[String]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(k, _)| !excluded.contains(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Function deriving a context value from the row's value for the same key.
pub type DeriveFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// One context entry.
#[derive(Clone)]
pub enum ContextValue {
    /// Used verbatim for every row.
    Literal(Value),
    /// Invoked once per row with the row's value for the key (`null` if absent).
    Derived(DeriveFn),
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.debug_tuple("Literal").field(v).finish(),
            Self::Derived(_) => f.write_str("Derived(<fn>)"),
        }
    }
}

/// Per-row field overrides merged in after renaming.
///
/// Entries are evaluated in insertion order and always overwrite fields of
/// the same name.
#[derive(Debug, Clone, Default)]
pub struct Context(Vec<(String, ContextValue)>);

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a literal value.
    #[must_use]
    pub fn literal(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field.into(), ContextValue::Literal(value.into()));
        self
    }

    /// Adds a deriving function.
    #[must_use]
    pub fn derived<F>(mut self, field: impl Into<String>, derive: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.insert(field.into(), ContextValue::Derived(Arc::new(derive)));
        self
    }

    fn insert(&mut self, field: String, value: ContextValue) {
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == field) {
            slot.1 = value;
        } else {
            self.0.push((field, value));
        }
    }

    /// Evaluates every entry against `fields` and merges the results in.
    ///
    /// All derivations see the row as it was before the merge.
    pub fn apply(&self, fields: &mut FieldSet) -> Result<()> {
        let mut resolved = Vec::with_capacity(self.0.len());
        for (key, entry) in &self.0 {
            let value = match entry {
                ContextValue::Literal(v) => v.clone(),
                ContextValue::Derived(derive) => {
                    let input = fields.get(key).unwrap_or(&Value::Null);
                    derive(input).map_err(|e| Error::ContextDerivation {
                        field: key.clone(),
                        cause: e.to_string(),
                    })?
                },
            };
            resolved.push((key.clone(), value));
        }
        fields.extend(resolved);
        Ok(())
    }
}
