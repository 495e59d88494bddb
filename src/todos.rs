use serde_json::{Value, json};
use std::path::Path;
use tracing::info;

use crate::error::GatewayError;
use crate::models::TodoFile;

/// Fixed, read-only list of todos addressed by position.
#[derive(Clone, Debug, Default)]
pub struct TodoList {
    items: Vec<Value>,
}

impl TodoList {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }

    /// Loads `{"todos": [...]}` from `path`.
    pub fn load(path: &Path) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(path).map_err(|source| GatewayError::DataFile {
            path: path.to_path_buf(),
            source,
        })?;
        let list = Self::from_json(&raw)?;
        info!(path = %path.display(), count = list.len(), "loaded todo list");
        Ok(list)
    }

    pub fn from_json(raw: &str) -> Result<Self, GatewayError> {
        let file: TodoFile = serde_json::from_str(raw)?;
        Ok(Self::new(file.todos))
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.items.get(index)
    }

    /// Resolves a raw path id to an item, or `{}` when it names nothing.
    pub fn lookup(&self, raw_id: &str) -> Value {
        parse_index(raw_id)
            .and_then(|index| self.get(index))
            .filter(|item| !item.is_null())
            .cloned()
            .unwrap_or_else(|| json!({}))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// Non-negative base-10 integer, surrounding whitespace allowed
fn parse_index(raw: &str) -> Option<usize> {
    raw.trim().parse::<usize>().ok()
}
