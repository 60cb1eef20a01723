// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reads the daemon's YAML config file from disk and splits it into the
//! `AppDaemon` ambient settings and the per-app entries `autod-apps`
//! understands (spec §6 "Configuration file").
//!
//! YAML parsing lives here, in the daemon binary, rather than in
//! `autod-apps`: spec.md §1 lists "YAML parsing" among the file-I/O
//! details treated as an external collaborator, so the kernel crates only
//! ever see an already-parsed `serde_json::Value` document.

use crate::error::DaemonError;
use autod_core::{AppConfigEntry, AppName};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The `AppDaemon:` top-level section (spec §4.1 sun inputs, §4.8 `app_dir`,
/// §4.9 `utility_delay`, §4.10 `tick`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppDaemonSettings {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: f64,
    pub time_zone: String,
    pub app_dir: PathBuf,
    #[serde(default = "default_threads")]
    pub threads: usize,
    #[serde(default = "default_tick")]
    pub tick: u64,
    #[serde(default = "default_utility_delay")]
    pub utility_delay: u64,
    #[serde(default = "default_queue_size")]
    pub queue_size: usize,
    #[serde(default)]
    pub control_socket: Option<PathBuf>,
    /// Websocket URL for the illustrative `WebSocketPlugin` (spec §4.7). When
    /// absent the daemon falls back to an empty `MemoryPlugin` under the
    /// default namespace, so there is always at least one installed
    /// namespace for apps to subscribe against.
    #[serde(default)]
    pub ha_url: Option<String>,
    /// `false` runs the kernel off a [`autod_core::FakeClock`] instead of the
    /// wall clock (spec §4.1 "Simulated"). Defaults to `true`.
    #[serde(default = "default_realtime")]
    pub realtime: bool,
    /// Local time (`"%Y-%m-%d %H:%M:%S"`, in `time_zone`) the simulated
    /// clock starts from. Required when `realtime` is `false`; ignored
    /// otherwise.
    #[serde(default)]
    pub start_time: Option<String>,
    /// Local time (same format as `start_time`) past which the daemon stops
    /// itself. Optional even in simulated mode: absent means run until
    /// killed.
    #[serde(default)]
    pub endtime: Option<String>,
    /// Simulated seconds the clock advances on every real `tick` while
    /// `realtime` is `false` (spec §4.1 "advanced purely by interval, wall
    /// clock ignored"). Ignored in realtime mode.
    #[serde(default = "default_interval")]
    pub interval: i64,
}

fn default_threads() -> usize {
    10
}

fn default_tick() -> u64 {
    1
}

fn default_utility_delay() -> u64 {
    1
}

fn default_queue_size() -> usize {
    1024
}

fn default_realtime() -> bool {
    true
}

fn default_interval() -> i64 {
    1
}

#[derive(Debug)]
pub struct LoadedConfig {
    pub settings: AppDaemonSettings,
    pub apps: BTreeMap<AppName, AppConfigEntry>,
}

/// Reads and parses the YAML document at `path`, then hands its
/// already-parsed form to `autod_apps::from_document` for the app entries.
pub fn load(path: &Path) -> Result<LoadedConfig, DaemonError> {
    let text = std::fs::read_to_string(path).map_err(|source| DaemonError::ReadConfig { path: path.display().to_string(), source })?;
    let doc: serde_json::Value =
        serde_yaml::from_str(&text).map_err(|e| DaemonError::ParseConfig { path: path.display().to_string(), reason: e.to_string() })?;

    let settings = doc
        .get("AppDaemon")
        .cloned()
        .ok_or_else(|| DaemonError::ParseConfig { path: path.display().to_string(), reason: "missing AppDaemon section".to_string() })
        .and_then(|v| {
            serde_json::from_value(v).map_err(|e| DaemonError::ParseConfig { path: path.display().to_string(), reason: e.to_string() })
        })?;

    let apps = autod_apps::from_document(doc)?;
    Ok(LoadedConfig { settings, apps })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
