// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test builders shared across crates (feature `test-support`).

use crate::app::AppConfigEntry;
use crate::entity::EntitySnapshot;
use std::collections::BTreeMap;

/// Builds an [`AppConfigEntry`] with sensible defaults for tests.
pub struct AppConfigEntryBuilder {
    class: String,
    module: String,
    dependencies: Option<String>,
    extra: BTreeMap<String, serde_json::Value>,
}

impl AppConfigEntryBuilder {
    pub fn new(class: impl Into<String>, module: impl Into<String>) -> Self {
        Self { class: class.into(), module: module.into(), dependencies: None, extra: BTreeMap::new() }
    }

    pub fn dependencies(mut self, deps: impl Into<String>) -> Self {
        self.dependencies = Some(deps.into());
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> AppConfigEntry {
        AppConfigEntry {
            class: self.class,
            module: self.module,
            dependencies: self.dependencies,
            extra: self.extra,
        }
    }
}

/// Builds an [`EntitySnapshot`] for tests, defaulting to state `"off"`.
pub fn snapshot(state: impl Into<String>) -> EntitySnapshot {
    EntitySnapshot::new(state)
}

/// Proptest strategies for core domain types, for other crates' property
/// tests (feature `test-support`).
pub mod strategies {
    use crate::entity::EntitySnapshot;
    use proptest::prelude::*;

    /// An [`EntitySnapshot`] with a short lowercase state and zero or more
    /// string-valued attributes — enough variety to exercise constraint and
    /// dispatch logic without modeling every possible attribute value.
    pub fn arb_entity_snapshot() -> impl Strategy<Value = EntitySnapshot> {
        (
            "[a-z][a-z_]{0,9}",
            prop::collection::vec(("[a-z][a-z_]{0,9}", "[a-z0-9 ]{0,12}"), 0..4),
        )
            .prop_map(|(state, attrs): (String, Vec<(String, String)>)| {
                let mut snapshot = EntitySnapshot::new(state);
                for (key, value) in attrs {
                    snapshot = snapshot.with_attribute(key, value);
                }
                snapshot
            })
    }
}
