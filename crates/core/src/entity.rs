// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entity snapshots: the unit of state the kernel stores and matches
//! callbacks against (spec §3, §4.2).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;
use std::collections::HashMap;

/// Key of the form `"<device>.<entity>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[serde(transparent)]
pub struct EntityId(SmolStr);

impl EntityId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Split into `(device, entity)`. Returns `None` if there is no `.`.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once('.')
    }

    pub fn device(&self) -> Option<&str> {
        self.split().map(|(d, _)| d)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        Self(SmolStr::new(s))
    }
}

impl std::borrow::Borrow<str> for EntityId {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// Current `state` + `attributes` of a single entity within a namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub state: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    /// Unix seconds the entity last transitioned `state`; plugin-supplied,
    /// not interpreted by the kernel.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_changed: Option<i64>,
}

impl EntitySnapshot {
    pub fn new(state: impl Into<String>) -> Self {
        Self { state: state.into(), attributes: HashMap::new(), last_changed: None }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Resolve an attribute by name: `"state"` reads the top-level `state`
    /// field, `"all"` is handled by callers separately, anything else looks
    /// in `attributes` (spec §4.2, §4.7 "consulting the top-level snapshot
    /// first then its attributes sub-mapping").
    pub fn get_field(&self, field: &str) -> Option<Value> {
        if field == "state" {
            return Some(Value::String(self.state.clone()));
        }
        self.attributes.get(field).cloned()
    }
}

#[cfg(test)]
#[path = "entity_tests.rs"]
mod tests;
