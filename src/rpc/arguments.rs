//! Named argument view handed to commands
//!
//! Positional params are keyed by their decimal index, so `[a, b]` becomes `{"0": a, "1": b}`.

use std::fmt::Display;

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IpcArguments {
    arguments: Map<String, Value>,
}

impl IpcArguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positional(params: Vec<Value>) -> Self {
        let arguments = params
            .into_iter()
            .enumerate()
            .map(|(index, param)| (index.to_string(), param))
            .collect();
        Self { arguments }
    }

    pub fn from_named(params: Map<String, Value>) -> Self {
        Self { arguments: params }
    }

    /// Looks up `key` by its string form, so `get(1)` and `get("1")` agree.
    pub fn get(&self, key: impl Display) -> Option<&Value> {
        self.arguments.get(&key.to_string())
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.arguments.insert(key.into(), value)
    }

    pub fn contains_key(&self, key: impl Display) -> bool {
        self.arguments.contains_key(&key.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.arguments.iter()
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }
}
