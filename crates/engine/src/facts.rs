//! Named fact bindings supplied by the caller for one evaluation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::expression::FieldPath;

/// Named inputs an expression can reference, e.g. `employee`.
///
/// Facts are held as JSON so any `Serialize` type can be bound; the engine
/// only ever reads them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactBindings(BTreeMap<String, Json>);

impl FactBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style bind of an already-JSON value.
    pub fn bind(mut self, name: impl Into<String>, value: Json) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    /// Serialise `fact` and bind it under `name`.
    pub fn from_fact<T: Serialize>(
        name: impl Into<String>,
        fact: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self::new().bind(name, serde_json::to_value(fact)?))
    }

    pub fn get(&self, name: &str) -> Option<&Json> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Walk `path` through the bindings: the first segment selects a binding,
    /// the rest index objects by key and arrays by position.
    pub fn resolve(&self, path: &FieldPath) -> Option<&Json> {
        let (root, rest) = path.segments().split_first()?;
        let mut current = self.0.get(root)?;
        for segment in rest {
            current = match current {
                Json::Object(map) => map.get(segment)?,
                Json::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl From<BTreeMap<String, Json>> for FactBindings {
    fn from(map: BTreeMap<String, Json>) -> Self {
        Self(map)
    }
}
