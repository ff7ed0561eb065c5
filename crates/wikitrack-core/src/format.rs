//! Hierarchical format definitions
//!
//! A format definition is a flat bag of extraction parameters that may extend
//! one parent. Lookups check the definition's own entries first and then walk
//! up the parent chain; the first hit wins.
//!
//! The registry resolves the whole inheritance graph when it is built, so
//! missing parents and cycles are reported up front and the resulting
//! definitions are immutable.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{Result, TrackerError};

/// Key naming the parent definition
pub const KEY_EXTENDS: &str = "extends";
/// Parser type, only `wiki` is supported
pub const KEY_TYPE: &str = "type";
/// Id of the table-of-contents container
pub const KEY_TOC_ID: &str = "toc.id";
/// Href of the TOC entry that leads to the episode list, e.g. `#Episodes`
pub const KEY_EPISODES_LINK: &str = "episodes.link";
/// Class of the rows that hold episode data
pub const KEY_ROW_CLASS: &str = "table.row.class";
/// 1-based title column, or the hint category for it
pub const KEY_COL_TITLE: &str = "table.col.title";
/// 1-based air date column, or the hint category for it
pub const KEY_COL_AIR_DATE: &str = "table.col.air-date";
/// One strftime pattern or a list of them
pub const KEY_DATE_FORMAT: &str = "air.date.format";
/// How many siblings after a heading may hold the episode table
pub const KEY_LOOKAHEAD: &str = "table.lookahead";

/// The only parser type
pub const TYPE_WIKI: &str = "wiki";

/// A resolved, read-only format definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatDefinition {
    id: String,
    entries: Map<String, Value>,
    parent: Option<Arc<FormatDefinition>>,
}

impl FormatDefinition {
    /// Start building a definition with its own entries.
    pub fn builder(id: impl Into<String>, entries: Map<String, Value>) -> FormatDefinitionBuilder {
        FormatDefinitionBuilder {
            id: id.into(),
            entries,
            parent: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parent(&self) -> Option<&FormatDefinition> {
        self.parent.as_deref()
    }

    /// Value for `key` from this definition or the nearest ancestor.
    pub fn get_optional(&self, key: &str) -> Option<&Value> {
        let mut current = Some(self);
        while let Some(def) = current {
            match def.entries.get(key) {
                Some(Value::Null) | None => current = def.parent.as_deref(),
                Some(value) => return Some(value),
            }
        }
        None
    }

    /// Required value for `key`.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` naming the key and this definition.
    pub fn get(&self, key: &str) -> Result<&Value> {
        self.get_optional(key).ok_or_else(|| {
            TrackerError::Config(format!(
                "No value found for key [{}], in definition [{}]",
                key, self.id
            ))
        })
    }

    pub fn get_str(&self, key: &str) -> Result<&str> {
        let value = self.get(key)?;
        value.as_str().ok_or_else(|| self.wrong_type(key, "a string", value))
    }

    pub fn get_optional_str(&self, key: &str) -> Result<Option<&str>> {
        match self.get_optional(key) {
            None => Ok(None),
            Some(value) => value
                .as_str()
                .map(Some)
                .ok_or_else(|| self.wrong_type(key, "a string", value)),
        }
    }

    /// Optional positive integer, e.g. a 1-based column index.
    pub fn get_optional_usize(&self, key: &str) -> Result<Option<usize>> {
        match self.get_optional(key) {
            None => Ok(None),
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .and_then(|n| usize::try_from(n).ok())
                .map(Some)
                .ok_or_else(|| self.wrong_type(key, "a positive integer", value)),
        }
    }

    /// Optional string or list of strings.
    pub fn get_optional_strings(&self, key: &str) -> Result<Vec<String>> {
        match self.get_optional(key) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.clone()]),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .map(str::to_string)
                        .ok_or_else(|| self.wrong_type(key, "a list of strings", item))
                })
                .collect(),
            Some(other) => Err(self.wrong_type(key, "a string or a list of strings", other)),
        }
    }

    fn wrong_type(&self, key: &str, expected: &str, found: &Value) -> TrackerError {
        TrackerError::Config(format!(
            "Value for key [{}] in definition [{}] must be {}, found [{}]",
            key, self.id, expected, found
        ))
    }
}

/// Builder that accepts a parent at most once.
#[derive(Debug)]
pub struct FormatDefinitionBuilder {
    id: String,
    entries: Map<String, Value>,
    parent: Option<Arc<FormatDefinition>>,
}

impl FormatDefinitionBuilder {
    /// Set the parent definition.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` if a parent was already set.
    pub fn with_parent(mut self, parent: Arc<FormatDefinition>) -> Result<Self> {
        if let Some(existing) = &self.parent {
            return Err(TrackerError::Config(format!(
                "Attempt to override parent of id [{}] in [{}] with [{}]",
                existing.id, self.id, parent.id
            )));
        }
        self.parent = Some(parent);
        Ok(self)
    }

    pub fn build(self) -> FormatDefinition {
        FormatDefinition {
            id: self.id,
            entries: self.entries,
            parent: self.parent,
        }
    }
}

/// All named format definitions of a run.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    definitions: HashMap<String, Arc<FormatDefinition>>,
}

impl FormatRegistry {
    /// Resolve every raw definition and its inheritance chain.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` for unknown parents, non-string
    /// `extends` values and inheritance cycles.
    pub fn build(raw: &HashMap<String, Map<String, Value>>) -> Result<Self> {
        let mut registry = Self::default();
        let mut ids: Vec<&String> = raw.keys().collect();
        ids.sort();
        for id in ids {
            let mut visiting = HashSet::new();
            registry.resolve_raw(id, raw, &mut visiting)?;
        }
        Ok(registry)
    }

    fn resolve_raw(
        &mut self,
        id: &str,
        raw: &HashMap<String, Map<String, Value>>,
        visiting: &mut HashSet<String>,
    ) -> Result<Arc<FormatDefinition>> {
        if let Some(def) = self.definitions.get(id) {
            return Ok(Arc::clone(def));
        }
        if !visiting.insert(id.to_string()) {
            return Err(TrackerError::Config(format!(
                "Cyclic inheritance detected at format [{}]",
                id
            )));
        }

        let entries = raw
            .get(id)
            .ok_or_else(|| TrackerError::Config(format!("No format defined with id [{}]", id)))?;

        let mut builder = FormatDefinition::builder(id, entries.clone());
        if let Some(parent_id) = parent_id(id, entries)? {
            let parent = self.resolve_raw(parent_id, raw, visiting)?;
            builder = builder.with_parent(parent)?;
        }

        let def = Arc::new(builder.build());
        self.definitions.insert(id.to_string(), Arc::clone(&def));
        visiting.remove(id);
        Ok(def)
    }

    /// Named definition.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` if no definition has this id.
    pub fn resolve(&self, id: &str) -> Result<Arc<FormatDefinition>> {
        self.definitions
            .get(id)
            .cloned()
            .ok_or_else(|| TrackerError::Config(format!("No format defined with id [{}]", id)))
    }

    /// Build an anonymous definition that may extend a registered one.
    ///
    /// The definition gets a synthetic id derived from `slot` that never
    /// collides with a registered id.
    pub fn resolve_inline(
        &self,
        slot: usize,
        entries: &Map<String, Value>,
    ) -> Result<Arc<FormatDefinition>> {
        let id = self.synthetic_id(slot);
        let mut builder = FormatDefinition::builder(id.as_str(), entries.clone());
        if let Some(parent_id) = parent_id(&id, entries)? {
            builder = builder.with_parent(self.resolve(parent_id)?)?;
        }
        Ok(Arc::new(builder.build()))
    }

    fn synthetic_id(&self, slot: usize) -> String {
        let mut id = format!("inline:{}", slot);
        let mut suffix = 0;
        while self.definitions.contains_key(&id) {
            suffix += 1;
            id = format!("inline:{}:{}", slot, suffix);
        }
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

fn parent_id<'a>(id: &str, entries: &'a Map<String, Value>) -> Result<Option<&'a str>> {
    match entries.get(KEY_EXTENDS) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(parent)) => Ok(Some(parent.as_str())),
        Some(other) => Err(TrackerError::Config(format!(
            "Value for key [{}] in definition [{}] must be a string, found [{}]",
            KEY_EXTENDS, id, other
        ))),
    }
}
