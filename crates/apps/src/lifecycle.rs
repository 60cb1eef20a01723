// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App lifecycle orchestration (spec §4.8 "Per-file load", "App
//! termination").
//!
//! Rust has no runtime equivalent of importing an arbitrary source file by
//! path, so "loading a module" here means invoking a compiled-in
//! [`AppFactory`] registered ahead of time for that module name — the
//! mtime-triggered load-plan and dependency-batch machinery around it is
//! otherwise unchanged from spec §4.8.

use crate::dependency::{self, DependencyGraph};
use crate::scan::{due_modules, scan};
use autod_core::kwargs::Kwargs;
use autod_core::{AppConfigEntry, AppDirectory, AppId, AppName, KernelError};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

/// What a user app implements (spec §4.8).
pub trait App: Send + Sync {
    /// Invoked synchronously right after instantiation.
    fn initialize(&self);

    /// Invoked synchronously before the app's callback/scheduler entries
    /// are cleared (spec §4.8 "App termination": terminate completes
    /// before any further state is torn down).
    fn terminate(&self) {}
}

/// Builds one app instance for a config entry.
pub type AppFactory = Arc<dyn Fn(AppName, AppId, &AppConfigEntry) -> Arc<dyn App> + Send + Sync>;

/// Clears an app's callback-registry/scheduler/endpoint entries — wired to
/// `autod_engine::Kernel::terminate_app` by the daemon binary, so this
/// crate never depends on a concrete `Kernel<C>` (spec §4.8 "App
/// termination" second half).
pub type TerminateHook = Arc<dyn Fn(&AppName) + Send + Sync>;

struct Instance {
    id: AppId,
    module: String,
    app: Arc<dyn App>,
}

pub struct Lifecycle {
    factories: BTreeMap<String, AppFactory>,
    on_terminate: TerminateHook,
    instances: Mutex<BTreeMap<AppName, Instance>>,
    known_mtimes: Mutex<BTreeMap<String, SystemTime>>,
    current_config: Mutex<BTreeMap<AppName, AppConfigEntry>>,
}

impl Lifecycle {
    pub fn new(factories: BTreeMap<String, AppFactory>, on_terminate: TerminateHook) -> Self {
        Self {
            factories,
            on_terminate,
            instances: Mutex::new(BTreeMap::new()),
            known_mtimes: Mutex::new(BTreeMap::new()),
            current_config: Mutex::new(BTreeMap::new()),
        }
    }

    /// One load/reload pass (spec §4.8): scans `app_dir`, diffs mtimes
    /// against the last scan, batches the due modules in dependency order,
    /// and (re)instantiates every app config entry whose module just
    /// loaded. Returns the app names (re)loaded this pass.
    pub fn sync(&self, app_dir: &Path, config: &BTreeMap<AppName, AppConfigEntry>) -> Result<Vec<AppName>, KernelError> {
        *self.current_config.lock() = config.clone();

        let scanned = scan(app_dir).map_err(|e| KernelError::InvalidAppConfig(e.to_string()))?;
        let mut known = self.known_mtimes.lock();
        let (due, next_known) = due_modules(&scanned, &known);
        *known = next_known;
        drop(known);

        self.sync_modules(&due, config)
    }

    /// Re-runs every configured module without touching the filesystem —
    /// for a forced full reload (spec §4.1, §4.8 "DST flip triggers full
    /// reload").
    pub fn reload_all(&self, config: &BTreeMap<AppName, AppConfigEntry>) -> Result<Vec<AppName>, KernelError> {
        *self.current_config.lock() = config.clone();
        let all_modules: BTreeSet<String> = config.values().map(|e| e.module.clone()).collect();
        self.sync_modules(&all_modules, config)
    }

    /// Reloads exactly `due` modules against `config`, without touching the
    /// filesystem — for a config-file-triggered reload (spec §4.8 "the
    /// app-config file itself changed") where the caller already knows which
    /// modules changed from diffing the old and new config, not from mtimes.
    pub fn reload_modules(&self, due: &BTreeSet<String>, config: &BTreeMap<AppName, AppConfigEntry>) -> Result<Vec<AppName>, KernelError> {
        *self.current_config.lock() = config.clone();
        self.sync_modules(due, config)
    }

    fn sync_modules(&self, due: &BTreeSet<String>, config: &BTreeMap<AppName, AppConfigEntry>) -> Result<Vec<AppName>, KernelError> {
        if due.is_empty() {
            return Ok(Vec::new());
        }
        let graph = build_graph(config);
        let load_order = dependency::batch(&graph, due)?;

        let mut loaded = Vec::new();
        for group in load_order {
            for item in group {
                if item.load {
                    loaded.extend(self.load_module(&item.module, config));
                }
            }
        }
        Ok(loaded)
    }

    /// Terminates and clears every app currently bound to `module`, then
    /// instantiates and initializes every config entry whose `module`
    /// matches (spec §4.8 "Per-file load").
    fn load_module(&self, module: &str, config: &BTreeMap<AppName, AppConfigEntry>) -> Vec<AppName> {
        let bound: Vec<AppName> = {
            let instances = self.instances.lock();
            instances.iter().filter(|(_, inst)| inst.module == module).map(|(name, _)| name.clone()).collect()
        };
        for name in &bound {
            self.terminate_one(name);
        }

        let Some(factory) = self.factories.get(module) else {
            tracing::warn!(module, "no app factory registered for module");
            return Vec::new();
        };

        let mut loaded = Vec::new();
        for (name, entry) in config.iter().filter(|(_, e)| e.module == module) {
            let id = AppId::new();
            let app = factory(name.clone(), id, entry);
            app.initialize();
            self.instances.lock().insert(name.clone(), Instance { id, module: module.to_string(), app });
            loaded.push(name.clone());
        }
        loaded
    }

    fn terminate_one(&self, name: &AppName) {
        let instance = self.instances.lock().remove(name);
        if let Some(instance) = instance {
            instance.app.terminate();
        }
        (self.on_terminate)(name);
    }

    /// Terminates every currently loaded app (daemon shutdown).
    pub fn terminate_all(&self) {
        let names: Vec<AppName> = self.instances.lock().keys().cloned().collect();
        for name in &names {
            self.terminate_one(name);
        }
    }

    pub fn is_loaded(&self, name: &AppName) -> bool {
        self.instances.lock().contains_key(name)
    }

    /// Every currently loaded app name, for diagnostic listing.
    pub fn loaded_app_names(&self) -> Vec<AppName> {
        self.instances.lock().keys().cloned().collect()
    }

    /// Terminates one app by name (diagnostic/control-socket surface). A
    /// no-op if `name` isn't currently loaded.
    pub fn terminate_app(&self, name: &AppName) {
        self.terminate_one(name);
    }
}

impl AppDirectory for Lifecycle {
    fn current_id(&self, name: &AppName) -> Option<AppId> {
        self.instances.lock().get(name).map(|i| i.id)
    }

    fn app_constraints(&self, name: &AppName) -> Kwargs {
        self.current_config.lock().get(name).map(|e| e.constraints()).unwrap_or_default()
    }
}

fn build_graph(config: &BTreeMap<AppName, AppConfigEntry>) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for entry in config.values() {
        let deps = graph.entry(entry.module.clone()).or_default();
        for dep in entry.dependency_modules() {
            deps.insert(dep);
        }
    }
    graph
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
