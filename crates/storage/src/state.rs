// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The state store: per-namespace entity snapshots (spec §3, §4.2).
//!
//! All operations take the store mutex for the duration of the call.
//! Callers must not hold other component locks (callbacks, schedule,
//! endpoints) while calling in — the store sits at the bottom of the
//! locking order (spec §5).

use autod_core::{EntityId, EntitySnapshot, Namespace};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;

/// Result of a [`StateStore::get`] call. Missing data is `None`, never an
/// error (spec §4.2: "Missing -> null result, not an error").
#[derive(Debug, Clone, PartialEq)]
pub enum GetField {
    /// The whole namespace: every entity snapshot in it.
    Namespace(HashMap<EntityId, EntitySnapshot>),
    /// Every snapshot whose entity id starts with `"<device>."`.
    Device(HashMap<EntityId, EntitySnapshot>),
    /// A single entity's `state` string.
    State(String),
    /// A single entity's full `attributes` mapping.
    Attributes(HashMap<String, Value>),
    /// A single named attribute (or top-level field) value.
    Attribute(Value),
}

#[derive(Default)]
struct Inner {
    namespaces: HashMap<Namespace, HashMap<EntityId, EntitySnapshot>>,
}

/// Per-namespace entity snapshot store, guarded by one mutex (spec §4.2,
/// §5 lock #1).
pub struct StateStore {
    inner: Mutex<Inner>,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self { inner: Mutex::new(Inner::default()) }
    }

    /// Installs a plugin's complete seed state atomically (spec §4.7).
    /// Returns an error if the namespace already has state installed.
    pub fn install_namespace(
        &self,
        namespace: Namespace,
        snapshots: HashMap<EntityId, EntitySnapshot>,
    ) -> Result<(), autod_core::KernelError> {
        let mut inner = self.inner.lock();
        if inner.namespaces.contains_key(&namespace) {
            return Err(autod_core::KernelError::DuplicateNamespace(namespace.to_string()));
        }
        inner.namespaces.insert(namespace, snapshots);
        Ok(())
    }

    /// Four-level resolution per spec §4.2.
    pub fn get(
        &self,
        namespace: &Namespace,
        device: Option<&str>,
        entity: Option<&str>,
        attribute: Option<&str>,
    ) -> Option<GetField> {
        let inner = self.inner.lock();
        let ns = inner.namespaces.get(namespace)?;

        let Some(device) = device else {
            return Some(GetField::Namespace(ns.clone()));
        };

        let Some(entity) = entity else {
            let prefix = format!("{device}.");
            let matched: HashMap<EntityId, EntitySnapshot> = ns
                .iter()
                .filter(|(id, _)| id.as_str().starts_with(&prefix))
                .map(|(id, snap)| (id.clone(), snap.clone()))
                .collect();
            return Some(GetField::Device(matched));
        };

        let entity_id = EntityId::new(format!("{device}.{entity}"));
        let snapshot = ns.get(&entity_id)?;

        let Some(attribute) = attribute else {
            return Some(GetField::State(snapshot.state.clone()));
        };

        if attribute == "all" {
            return Some(GetField::Attributes(snapshot.attributes.clone()));
        }

        snapshot.get_field(attribute).map(GetField::Attribute)
    }

    /// Replaces a single entity's snapshot atomically (spec §4.2, §4.7).
    pub fn set(&self, namespace: &Namespace, entity_id: EntityId, snapshot: EntitySnapshot) {
        let mut inner = self.inner.lock();
        inner.namespaces.entry(namespace.clone()).or_default().insert(entity_id, snapshot);
    }

    pub fn entity_exists(&self, namespace: &Namespace, entity_id: &EntityId) -> bool {
        let inner = self.inner.lock();
        inner.namespaces.get(namespace).map(|ns| ns.contains_key(entity_id)).unwrap_or(false)
    }

    /// Snapshot (clone) of a single entity, used by matching logic that
    /// needs `old_state`/`new_state` pairs outside the mutex's critical
    /// section (spec §4.7).
    pub fn snapshot_of(&self, namespace: &Namespace, entity_id: &EntityId) -> Option<EntitySnapshot> {
        let inner = self.inner.lock();
        inner.namespaces.get(namespace).and_then(|ns| ns.get(entity_id)).cloned()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
