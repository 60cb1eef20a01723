// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the typed app config model from an already-parsed document
//! (spec §4.8 "Configuration file").
//!
//! Reading the config file and parsing its YAML is file I/O left to the
//! daemon binary (spec.md §1 lists "YAML parsing" among the file-I/O
//! details treated as an external collaborator); this module only turns
//! the resulting generic document — any `serde_json::Value::Object`, which
//! is what `serde_yaml::from_str` produces just as well as `serde_json`
//! does — into typed per-app entries, skipping reserved top-level keys.

use autod_core::app::is_reserved_config_key;
use autod_core::{AppConfigEntry, AppName, KernelError};
use std::collections::BTreeMap;

/// Builds app entries from a parsed config document, in document order,
/// skipping reserved top-level keys.
pub fn from_document(doc: serde_json::Value) -> Result<BTreeMap<AppName, AppConfigEntry>, KernelError> {
    let serde_json::Value::Object(top) = doc else {
        return Err(KernelError::InvalidAppConfig("config document must be a mapping".to_string()));
    };

    let mut apps = BTreeMap::new();
    for (name, value) in top {
        if is_reserved_config_key(&name) {
            continue;
        }
        let entry: AppConfigEntry = serde_json::from_value(value)
            .map_err(|e| KernelError::InvalidAppConfig(format!("{name}: {e}")))?;
        apps.insert(AppName::new(&name), entry);
    }
    Ok(apps)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
