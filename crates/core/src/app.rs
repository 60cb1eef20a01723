// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App identity and configuration model (spec §3, §6, §4.8).

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::BTreeMap;

crate::define_id! {
    /// Identifies one (re)load of an app instance.
    ///
    /// Regenerated every time an app is (re)loaded; every registry and
    /// schedule entry captures the `AppId` current at registration time, and
    /// the dispatcher drops entries whose captured id no longer matches the
    /// app's current id (the "stale callback guard", spec §3, §8).
    pub struct AppId("app-");
}

/// The name an app is registered under — a top-level key in the config
/// document (spec §6), distinct from its `module` (the source file basename
/// that `dependencies` refers to).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(SmolStr);

impl AppName {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(SmolStr::new(s.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for AppName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AppName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for AppName {
    fn from(s: String) -> Self {
        Self(SmolStr::new(s))
    }
}

impl std::borrow::Borrow<str> for AppName {
    fn borrow(&self) -> &str {
        self.0.as_str()
    }
}

/// Reserved top-level config keys that are never app entries (spec §6).
pub const RESERVED_CONFIG_KEYS: &[&str] = &["DEFAULT", "AppDaemon", "HASS", "HADashboard"];

pub fn is_reserved_config_key(key: &str) -> bool {
    RESERVED_CONFIG_KEYS.contains(&key)
}

/// One app's config section: `class` + `module` are required; everything
/// else (constraints, app-specific keys) rides along in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfigEntry {
    pub class: String,
    pub module: String,
    /// Comma-separated module names this app's module depends on (spec §4.8).
    #[serde(default)]
    pub dependencies: Option<String>,
    /// Everything else: `constrain_*` keys and app-specific config, kept as
    /// a string-keyed map so constraint evaluation (spec §4.5) can look up
    /// `constrain_days`, `constrain_start_time`, etc. without a schema.
    /// `serde_json::Value` rather than a YAML-specific value type so this
    /// map can be handed straight to `autod-engine`'s constraint evaluator,
    /// which already speaks `Kwargs = BTreeMap<String, serde_json::Value>`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Read-only view of which [`AppId`] an app name currently resolves to.
///
/// Implemented by the app lifecycle manager (`autod-apps::Lifecycle`) and
/// consulted by the dispatcher's worker loop to drop stale callbacks (spec
/// §3, §4.6, §8): a registry or schedule entry captured an `AppId` at
/// registration time; if the app has since been reloaded, `current_id`
/// returns a different (or no) id and the callback is discarded rather than
/// invoked. Kept as a trait so `autod-engine` never depends on
/// `autod-apps`.
pub trait AppDirectory: Send + Sync {
    fn current_id(&self, name: &AppName) -> Option<AppId>;

    /// The app's current `constrain_*` config keys (spec §4.5, §4.6 step 1
    /// "Argument Constraints"), re-read at every dispatch rather than
    /// cached, since config can change live. Apps with no constraints (or
    /// hosts that don't track per-app config at all) return an empty map.
    fn app_constraints(&self, name: &AppName) -> crate::kwargs::Kwargs {
        let _ = name;
        crate::kwargs::Kwargs::new()
    }
}

impl AppConfigEntry {
    /// Parses `dependencies` into the list of module names it names.
    pub fn dependency_modules(&self) -> Vec<String> {
        match &self.dependencies {
            Some(s) => s.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect(),
            None => Vec::new(),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(|v| v.as_str())
    }

    /// This entry's `constrain_*` keys, ready to hand to the constraint
    /// evaluator as-is (spec §4.5, §4.6 "Argument Constraints").
    pub fn constraints(&self) -> crate::kwargs::Kwargs {
        self.extra.iter().filter(|(k, _)| k.starts_with("constrain_")).map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}
