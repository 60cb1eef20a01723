// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The callback registry: state, event, and endpoint subscriptions keyed by
//! app (spec §3, §4.3).
//!
//! Three independent tables, one mutex each held only for the duration of a
//! single operation (spec §5, lock #2 "callbacks" — a leaf lock, never held
//! while calling into the scheduler or state store). Entries are kept in an
//! [`IndexMap`] per app so iteration order matches registration order (spec
//! §5 ordering guarantee: ties broken by handle insertion order).

use autod_core::kwargs::Kwargs;
use autod_core::{AppId, AppName, EntityId, HandleId, KernelError, Namespace};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// `(entity, attribute, old, new, sanitized kwargs)`.
pub type StateCallbackFn = Arc<dyn Fn(&EntityId, &str, Option<Value>, Option<Value>, Kwargs) + Send + Sync>;
/// `(event name, data, sanitized kwargs)`.
pub type EventCallbackFn = Arc<dyn Fn(&str, &Value, Kwargs) + Send + Sync>;
/// Request body in, response body out.
pub type EndpointCallbackFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// How a `state` subscription picks which entities it watches (spec §3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityFilter {
    /// No entity given: matches any entity in the namespace.
    Any,
    /// `"dev"` with no dot: matches any entity on that device.
    Device(String),
    /// `"dev.ent"`: matches exactly that entity.
    Exact(EntityId),
}

impl EntityFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            None => EntityFilter::Any,
            Some(s) => match EntityId::new(s).split() {
                Some(_) => EntityFilter::Exact(EntityId::new(s)),
                None => EntityFilter::Device(s.to_string()),
            },
        }
    }

    pub fn matches(&self, entity_id: &EntityId) -> bool {
        match self {
            EntityFilter::Any => true,
            EntityFilter::Device(dev) => entity_id.device() == Some(dev.as_str()),
            EntityFilter::Exact(id) => id == entity_id,
        }
    }

    /// Human-readable form for diagnostic listing: `"*"`, a bare device
    /// name, or a full `dev.ent` id.
    pub fn describe(&self) -> String {
        match self {
            EntityFilter::Any => "*".to_string(),
            EntityFilter::Device(dev) => dev.clone(),
            EntityFilter::Exact(id) => id.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct StateCallbackEntry {
    pub app: AppName,
    pub app_id: AppId,
    pub namespace: Namespace,
    pub entity: EntityFilter,
    /// Watched attribute, default `"state"`; `"all"` is a wildcard (spec §4.7).
    pub attribute: String,
    pub kwargs: Kwargs,
    pub function: StateCallbackFn,
    /// Dedicated slot for the settle-window timer handle (spec §9 "Shared
    /// mutable kwargs": modeled as a field on the record, not by mutating
    /// the caller's kwargs map).
    pub pending_timer_handle: Option<HandleId>,
}

#[derive(Clone)]
pub struct EventCallbackEntry {
    pub app: AppName,
    pub app_id: AppId,
    /// `None` is the event-name wildcard.
    pub event: Option<String>,
    pub kwargs: Kwargs,
    pub function: EventCallbackFn,
}

#[derive(Clone)]
pub struct EndpointCallbackEntry {
    pub app: AppName,
    pub app_id: AppId,
    pub function: EndpointCallbackFn,
}

struct Table<T> {
    by_app: HashMap<AppName, IndexMap<HandleId, T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self { by_app: HashMap::default() }
    }
}

impl<T> Table<T> {
    fn add(&mut self, app: AppName, entry: T) -> HandleId {
        let handle = HandleId::new();
        self.by_app.entry(app).or_default().insert(handle, entry);
        handle
    }

    fn cancel(&mut self, app: &AppName, handle: HandleId) -> bool {
        let Some(map) = self.by_app.get_mut(app) else { return false };
        let removed = map.shift_remove(&handle).is_some();
        if map.is_empty() {
            self.by_app.remove(app);
        }
        removed
    }

    fn get(&self, app: &AppName, handle: HandleId) -> Option<&T> {
        self.by_app.get(app)?.get(&handle)
    }

    fn get_mut(&mut self, app: &AppName, handle: HandleId) -> Option<&mut T> {
        self.by_app.get_mut(app)?.get_mut(&handle)
    }

    fn remove_app(&mut self, app: &AppName) {
        self.by_app.remove(app);
    }

    fn is_empty_for(&self, app: &AppName) -> bool {
        self.by_app.get(app).map(|m| m.is_empty()).unwrap_or(true)
    }
}

/// Callback registry: three independent tables guarded by independent
/// mutexes (spec §3, §4.3, §5).
#[derive(Default)]
pub struct CallbackRegistry {
    state: Mutex<Table<StateCallbackEntry>>,
    event: Mutex<Table<EventCallbackEntry>>,
    endpoint: Mutex<Table<EndpointCallbackEntry>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_state(&self, entry: StateCallbackEntry) -> HandleId {
        self.state.lock().add(entry.app.clone(), entry)
    }

    pub fn cancel_state(&self, app: &AppName, handle: HandleId) -> bool {
        self.state.lock().cancel(app, handle)
    }

    pub fn info_state(&self, app: &AppName, handle: HandleId) -> Result<(Namespace, Kwargs), KernelError> {
        let table = self.state.lock();
        table
            .get(app, handle)
            .map(|e| (e.namespace.clone(), autod_core::kwargs::sanitize(&e.kwargs)))
            .ok_or_else(|| KernelError::InvalidHandle(handle.to_string()))
    }

    pub fn set_pending_timer(&self, app: &AppName, handle: HandleId, timer: Option<HandleId>) {
        if let Some(entry) = self.state.lock().get_mut(app, handle) {
            entry.pending_timer_handle = timer;
        }
    }

    /// Snapshot of every state entry in `namespace`, for state-change
    /// matching (spec §4.7). Cloned out from under the lock so matching
    /// logic can call back into the scheduler/dispatcher without holding
    /// the registry mutex (spec §5 lock order).
    pub fn state_entries_in_namespace(&self, namespace: &Namespace) -> Vec<(AppName, HandleId, StateCallbackEntry)> {
        let table = self.state.lock();
        table
            .by_app
            .iter()
            .flat_map(|(app, map)| {
                map.iter()
                    .filter(|(_, e)| &e.namespace == namespace)
                    .map(|(h, e)| (app.clone(), *h, e.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    pub fn add_event(&self, entry: EventCallbackEntry) -> HandleId {
        self.event.lock().add(entry.app.clone(), entry)
    }

    pub fn cancel_event(&self, app: &AppName, handle: HandleId) -> bool {
        self.event.lock().cancel(app, handle)
    }

    pub fn info_event(&self, app: &AppName, handle: HandleId) -> Result<(Option<String>, Kwargs), KernelError> {
        let table = self.event.lock();
        table
            .get(app, handle)
            .map(|e| (e.event.clone(), autod_core::kwargs::sanitize(&e.kwargs)))
            .ok_or_else(|| KernelError::InvalidHandle(handle.to_string()))
    }

    pub fn event_entries(&self) -> Vec<(AppName, HandleId, EventCallbackEntry)> {
        let table = self.event.lock();
        table
            .by_app
            .iter()
            .flat_map(|(app, map)| map.iter().map(|(h, e)| (app.clone(), *h, e.clone())).collect::<Vec<_>>())
            .collect()
    }

    pub fn add_endpoint(&self, entry: EndpointCallbackEntry) -> HandleId {
        self.endpoint.lock().add(entry.app.clone(), entry)
    }

    pub fn cancel_endpoint(&self, app: &AppName, handle: HandleId) -> bool {
        self.endpoint.lock().cancel(app, handle)
    }

    pub fn info_endpoint(&self, app: &AppName, handle: HandleId) -> Result<(), KernelError> {
        let table = self.endpoint.lock();
        table.get(app, handle).map(|_| ()).ok_or_else(|| KernelError::InvalidHandle(handle.to_string()))
    }

    pub fn endpoint(&self, app: &AppName, handle: HandleId) -> Option<EndpointCallbackFn> {
        self.endpoint.lock().get(app, handle).map(|e| e.function.clone())
    }

    /// Removes every entry keyed on `app` across all three tables (spec §3
    /// "On app termination all entries ... MUST be removed", §4.8).
    pub fn remove_app(&self, app: &AppName) {
        self.state.lock().remove_app(app);
        self.event.lock().remove_app(app);
        self.endpoint.lock().remove_app(app);
    }

    pub fn is_empty_for(&self, app: &AppName) -> bool {
        self.state.lock().is_empty_for(app) && self.event.lock().is_empty_for(app) && self.endpoint.lock().is_empty_for(app)
    }

    /// `(handle, kind, target, attribute)` for every callback of `app`, for
    /// diagnostic listing. `kind` is one of `"state"`, `"event"`, `"endpoint"`.
    pub fn callback_summaries_for_app(&self, app: &AppName) -> Vec<(HandleId, &'static str, String, String)> {
        let mut out = Vec::new();
        if let Some(map) = self.state.lock().by_app.get(app) {
            out.extend(map.iter().map(|(h, e)| (*h, "state", e.entity.describe(), e.attribute.clone())));
        }
        if let Some(map) = self.event.lock().by_app.get(app) {
            out.extend(map.iter().map(|(h, e)| (*h, "event", e.event.clone().unwrap_or_else(|| "*".to_string()), String::new())));
        }
        if let Some(map) = self.endpoint.lock().by_app.get(app) {
            out.extend(map.iter().map(|(h, _)| (*h, "endpoint", String::new(), String::new())));
        }
        out
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
