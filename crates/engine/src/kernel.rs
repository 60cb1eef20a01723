// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The kernel: wires the clock, sun, state store, callback registry,
//! scheduler, and dispatcher together behind the API surface apps consume
//! (spec §6, §2 data flow).

use crate::constraint::{self, ConstraintContext, Presence};
use crate::dispatch::{Dispatcher, Job};
use crate::registry::{
    CallbackRegistry, EndpointCallbackFn, EntityFilter, EventCallbackEntry, EventCallbackFn, StateCallbackEntry,
    StateCallbackFn,
};
use crate::scheduler::{ScheduleCallbackFn, Scheduler};
use crate::sun::{local_from_ts, SunCalculator};
use autod_core::kwargs::{self, Kwargs};
use autod_core::{AppDirectory, AppId, AppName, EntityId, EntitySnapshot, HandleId, KernelError, KernelHandle, Namespace, SunEvent, SunState};
use autod_storage::{GetField, StateStore};
use chrono::Offset;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

/// Entities set via [`Kernel::set_app_state`] live here: they belong to no
/// plugin (spec §6 "A synthetic `state_changed` may be produced by
/// `set_app_state` for entities outside any plugin's namespace").
pub const APP_STATE_NAMESPACE: &str = "app_state";

/// Result of one [`Kernel::tick`] (spec §4.1, §4.10).
#[derive(Debug, Clone, Copy, Default)]
pub struct TickResult {
    /// `is_dst(now)` changed since the previous tick; the caller (the main
    /// loop binary) must trigger a full app reload (spec §4.1, §4.8).
    pub dst_flipped: bool,
    pub sunrise_changed: bool,
    pub sunset_changed: bool,
    pub timers_fired: usize,
    /// The dispatcher's queue rejected a job since the previous tick (spec
    /// §4.6 "a full queue is a fatal configuration error") — set once it
    /// happens and never cleared; the caller must stop the daemon rather
    /// than keep ticking.
    pub queue_full: bool,
}

pub struct Kernel<C: autod_core::Clock> {
    clock: C,
    sun_calc: SunCalculator,
    sun: Mutex<SunState>,
    last_utc_offset: Mutex<i32>,
    state: StateStore,
    registry: CallbackRegistry,
    scheduler: Scheduler,
    dispatcher: Dispatcher,
    directory: Arc<dyn AppDirectory>,
    presence: Arc<dyn Presence>,
    default_namespace: Namespace,
    queue_full: std::sync::atomic::AtomicBool,
}

impl<C: autod_core::Clock> Kernel<C> {
    pub fn new(
        clock: C,
        sun_calc: SunCalculator,
        directory: Arc<dyn AppDirectory>,
        presence: Arc<dyn Presence>,
        default_namespace: Namespace,
        queue_capacity: usize,
        worker_count: usize,
    ) -> Self {
        let now = clock.now_ts();
        let next_rising = sun_calc.next(now, SunEvent::NextRising);
        let next_setting = sun_calc.next(now, SunEvent::NextSetting);
        let sun = SunState { next_rising, next_setting };
        let last_utc_offset = utc_offset_seconds(sun_calc.timezone(), now);
        let dispatcher = Dispatcher::spawn(queue_capacity, worker_count, directory.clone());

        Self {
            clock,
            sun_calc,
            sun: Mutex::new(sun),
            last_utc_offset: Mutex::new(last_utc_offset),
            state: StateStore::new(),
            registry: CallbackRegistry::new(),
            scheduler: Scheduler::new(),
            dispatcher,
            directory,
            presence,
            default_namespace,
            queue_full: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Set once a dispatch has ever hit [`KernelError::QueueFull`]; surfaced
    /// on every [`TickResult`] from that point on so the main loop can stop
    /// the daemon (spec §4.6 "a full queue is a fatal configuration error").
    fn note_dispatch_result(&self, app: &AppName, context: &str, result: Result<(), KernelError>) {
        match result {
            Ok(()) => {}
            Err(KernelError::QueueFull) => {
                tracing::error!(app = %app, context, "dispatcher queue full, this is a fatal configuration error");
                self.queue_full.store(true, std::sync::atomic::Ordering::SeqCst);
            }
            Err(err) => tracing::warn!(app = %app, error = %err, context, "dispatch failed"),
        }
    }

    // ---- Time helpers (spec §6 "Time helpers") ----

    pub fn get_now_ts(&self) -> i64 {
        self.clock.now_ts()
    }

    pub fn get_now(&self) -> chrono::DateTime<chrono_tz::Tz> {
        local_from_ts(self.sun_calc.timezone(), self.get_now_ts())
    }

    pub fn sunrise(&self) -> i64 {
        self.sun.lock().next_rising
    }

    pub fn sunset(&self) -> i64 {
        self.sun.lock().next_setting
    }

    pub fn parse_time(&self, time_str: &str) -> Result<u32, KernelError> {
        constraint::parse_time(&self.constraint_context(), time_str)
    }

    pub fn now_is_between(&self, start: &str, end: &str) -> Result<bool, KernelError> {
        constraint::now_is_between(&self.constraint_context(), start, end)
    }

    fn constraint_context(&self) -> ConstraintContext<'_> {
        ConstraintContext {
            now_ts: self.get_now_ts(),
            timezone: self.sun_calc.timezone(),
            sun: *self.sun.lock(),
            state: &self.state,
            default_namespace: self.default_namespace.clone(),
        }
    }

    // ---- State (spec §6 "State") ----

    pub fn install_namespace(&self, namespace: Namespace, seed: std::collections::HashMap<EntityId, EntitySnapshot>) -> Result<(), KernelError> {
        self.state.install_namespace(namespace, seed)
    }

    pub fn get_state(
        &self,
        namespace: &Namespace,
        device: Option<&str>,
        entity: Option<&str>,
        attribute: Option<&str>,
    ) -> Option<GetField> {
        self.state.get(namespace, device, entity, attribute)
    }

    pub fn entity_exists(&self, namespace: &Namespace, entity_id: &EntityId) -> bool {
        self.state.entity_exists(namespace, entity_id)
    }

    /// Plugin-originated state change: replaces state, then runs
    /// state-change matching and event matching (spec §4.7).
    pub fn state_update(&self, namespace: &Namespace, event_type: &str, data: &Value) {
        if event_type == "state_changed" {
            if let Some(entity_id) = data.get("entity_id").and_then(|v| v.as_str()) {
                let entity_id = EntityId::new(entity_id);
                if let Some(new_state) = data.pointer("/data/new_state") {
                    if let Ok(snapshot) = serde_json::from_value::<EntitySnapshot>(new_state.clone()) {
                        let old_snapshot = self.state.snapshot_of(namespace, &entity_id);
                        self.state.set(namespace, entity_id.clone(), snapshot.clone());
                        self.match_state_change(namespace, &entity_id, old_snapshot.as_ref(), &snapshot);
                    }
                }
            }
        }
        self.match_event(event_type, data);
    }

    /// `set_state`: direct overwrite without the full `state_update` event
    /// envelope, still runs matching (spec §4.2, §6).
    pub fn set_state(&self, namespace: &Namespace, entity_id: EntityId, snapshot: EntitySnapshot) {
        let old = self.state.snapshot_of(namespace, &entity_id);
        self.state.set(namespace, entity_id.clone(), snapshot.clone());
        self.match_state_change(namespace, &entity_id, old.as_ref(), &snapshot);
    }

    /// `set_app_state`: for entities with no owning plugin (spec §6).
    pub fn set_app_state(&self, entity_id: EntityId, snapshot: EntitySnapshot) {
        let namespace = Namespace::new(APP_STATE_NAMESPACE);
        // Best-effort: the namespace may not exist yet on the first call.
        let _ = self.state.install_namespace(namespace.clone(), std::collections::HashMap::new());
        self.set_state(&namespace, entity_id, snapshot);
    }

    fn match_state_change(&self, namespace: &Namespace, entity_id: &EntityId, old: Option<&EntitySnapshot>, new: &EntitySnapshot) {
        for (app, handle, entry) in self.registry.state_entries_in_namespace(namespace) {
            if !entry.entity.matches(entity_id) {
                continue;
            }

            if entry.attribute == "all" {
                let old_val = old.map(|s| serde_json::to_value(s).unwrap_or(Value::Null));
                let new_val = serde_json::to_value(new).unwrap_or(Value::Null);
                self.submit_attr_job(app, handle, &entry, entity_id.clone(), "all", old_val, Some(new_val));
                continue;
            }

            let old_val = old.and_then(|s| s.get_field(&entry.attribute));
            let new_val = new.get_field(&entry.attribute);
            let expect_old = entry.kwargs.get("old");
            let expect_new = entry.kwargs.get("new");
            let gate = (expect_old.is_none() || expect_old == old_val.as_ref())
                && (expect_new.is_none() || expect_new == new_val.as_ref());

            if gate {
                if let Some(duration) = kwargs::get_i64(&entry.kwargs, "duration") {
                    self.schedule_settle_timer(&app, handle, &entry, entity_id, old_val, new_val, duration);
                } else {
                    self.submit_attr_job(app, handle, &entry, entity_id.clone(), &entry.attribute.clone(), old_val, new_val);
                }
            } else if let Some(pending) = entry.pending_timer_handle {
                // the settle window was broken before it elapsed.
                self.scheduler.cancel_timer(&app, pending);
                self.registry.set_pending_timer(&app, handle, None);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn schedule_settle_timer(
        &self,
        app: &AppName,
        handle: HandleId,
        entry: &StateCallbackEntry,
        entity_id: &EntityId,
        old_val: Option<Value>,
        new_val: Option<Value>,
        duration: i64,
    ) {
        let now = self.get_now_ts();
        let function = entry.function.clone();
        let entity_clone = entity_id.clone();
        let attribute = entry.attribute.clone();
        let sanitized = kwargs::sanitize(&entry.kwargs);
        let timer_fn: ScheduleCallbackFn = Arc::new(move |_| {
            function(&entity_clone, &attribute, old_val.clone(), new_val.clone(), sanitized.clone());
        });
        let mut timer_kwargs = Kwargs::new();
        timer_kwargs.insert("offset".into(), json!(duration));
        if let Ok(timer_handle) = self.scheduler.insert(app.clone(), entry.app_id, now, timer_fn, false, None, timer_kwargs) {
            self.registry.set_pending_timer(app, handle, Some(timer_handle));
        }
    }

    fn match_event(&self, event_type: &str, data: &Value) {
        for (app, handle, entry) in self.registry.event_entries() {
            if let Some(expected) = &entry.event {
                if expected != event_type {
                    continue;
                }
            }
            let matches_filter = entry.kwargs.iter().all(|(k, v)| match data.get(k) {
                Some(actual) => actual == v,
                None => true,
            });
            if matches_filter {
                self.submit_event_job(app, handle, &entry, event_type, data.clone());
            }
        }
    }

    /// Plugin-originated custom event with no backing state change (spec §6
    /// `appd_started`, and general plugin events).
    pub fn process_event(&self, event_type: &str, data: Value) {
        self.match_event(event_type, &data);
    }

    // ---- Subscriptions (spec §6 "Subscription") ----

    pub fn listen_state(
        &self,
        app: AppName,
        app_id: AppId,
        namespace: Namespace,
        entity: Option<&str>,
        attribute: Option<&str>,
        kwargs_in: Kwargs,
        function: StateCallbackFn,
    ) -> Result<HandleId, KernelError> {
        let filter = EntityFilter::parse(entity);
        let attribute_name = attribute.unwrap_or("state").to_string();
        let mut entry = StateCallbackEntry {
            app: app.clone(),
            app_id,
            namespace: namespace.clone(),
            entity: filter.clone(),
            attribute: attribute_name.clone(),
            kwargs: kwargs_in.clone(),
            function: function.clone(),
            pending_timer_handle: None,
        };

        // Special path (spec §4.3): immediate + duration + new, pre-satisfied.
        let immediate = kwargs::get_bool(&kwargs_in, "immediate").unwrap_or(false);
        if immediate {
            if let (Some(duration), Some(expect_new), EntityFilter::Exact(entity_id)) =
                (kwargs::get_i64(&kwargs_in, "duration"), kwargs_in.get("new").cloned(), &filter)
            {
                if let Some(current) = self.state.snapshot_of(&namespace, entity_id) {
                    if current.get_field(&attribute_name).as_ref() == Some(&expect_new) {
                        let now = self.get_now_ts();
                        let function = function.clone();
                        let entity_clone = entity_id.clone();
                        let attribute_clone = attribute_name.clone();
                        let nv = expect_new.clone();
                        let sanitized = kwargs::sanitize(&kwargs_in);
                        let timer_fn: ScheduleCallbackFn = Arc::new(move |_| {
                            function(&entity_clone, &attribute_clone, Some(nv.clone()), Some(nv.clone()), sanitized.clone());
                        });
                        let mut timer_kwargs = Kwargs::new();
                        timer_kwargs.insert("offset".into(), json!(duration));
                        let timer_handle = self.scheduler.insert(app.clone(), app_id, now, timer_fn, false, None, timer_kwargs)?;
                        entry.pending_timer_handle = Some(timer_handle);
                    }
                }
            }
        }

        Ok(self.registry.add_state(entry))
    }

    pub fn cancel_state(&self, app: &AppName, handle: HandleId) -> bool {
        self.registry.cancel_state(app, handle)
    }

    pub fn info_state(&self, app: &AppName, handle: HandleId) -> Result<(Namespace, Kwargs), KernelError> {
        self.registry.info_state(app, handle)
    }

    pub fn listen_event(
        &self,
        app: AppName,
        app_id: AppId,
        event: Option<String>,
        kwargs_in: Kwargs,
        function: EventCallbackFn,
    ) -> HandleId {
        self.registry.add_event(EventCallbackEntry { app, app_id, event, kwargs: kwargs_in, function })
    }

    pub fn cancel_event(&self, app: &AppName, handle: HandleId) -> bool {
        self.registry.cancel_event(app, handle)
    }

    pub fn info_event(&self, app: &AppName, handle: HandleId) -> Result<(Option<String>, Kwargs), KernelError> {
        self.registry.info_event(app, handle)
    }

    pub fn register_endpoint(&self, app: AppName, app_id: AppId, function: EndpointCallbackFn) -> HandleId {
        self.registry.add_endpoint(crate::registry::EndpointCallbackEntry { app, app_id, function })
    }

    pub fn unregister_endpoint(&self, app: &AppName, handle: HandleId) -> bool {
        self.registry.cancel_endpoint(app, handle)
    }

    pub fn info_endpoint(&self, app: &AppName, handle: HandleId) -> Result<(), KernelError> {
        self.registry.info_endpoint(app, handle)
    }

    pub fn call_endpoint(&self, app: &AppName, handle: HandleId, request: Value) -> Option<Value> {
        self.registry.endpoint(app, handle).map(|f| f(request))
    }

    // ---- Scheduling (spec §6 "Scheduling") ----

    pub fn run_in(&self, app: AppName, app_id: AppId, delay_secs: i64, kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        let now = self.get_now_ts();
        let mut kw = kwargs_in;
        kw.entry("offset".to_string()).or_insert_with(|| json!(delay_secs));
        self.scheduler.insert(app, app_id, now, function, false, None, kw)
    }

    pub fn run_at(&self, app: AppName, app_id: AppId, at_ts: i64, kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        self.scheduler.insert(app, app_id, at_ts, function, false, None, kwargs_in)
    }

    /// Runs once at the next occurrence of `time_of_day` (today if still
    /// ahead, else tomorrow).
    pub fn run_once(&self, app: AppName, app_id: AppId, time_of_day: &str, kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        let at = self.next_occurrence_of(time_of_day)?;
        self.run_at(app, app_id, at, kwargs_in, function)
    }

    pub fn run_every(&self, app: AppName, app_id: AppId, start_ts: i64, interval: i64, mut kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        kwargs_in.insert("interval".into(), json!(interval));
        self.scheduler.insert(app, app_id, start_ts, function, true, None, kwargs_in)
    }

    pub fn run_daily(&self, app: AppName, app_id: AppId, time_of_day: &str, kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        let start = self.next_occurrence_of(time_of_day)?;
        self.run_every(app, app_id, start, 86_400, kwargs_in, function)
    }

    pub fn run_hourly(&self, app: AppName, app_id: AppId, kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        let start = self.get_now_ts() + 3_600;
        self.run_every(app, app_id, start, 3_600, kwargs_in, function)
    }

    pub fn run_minutely(&self, app: AppName, app_id: AppId, kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        let start = self.get_now_ts() + 60;
        self.run_every(app, app_id, start, 60, kwargs_in, function)
    }

    pub fn run_at_sunrise(&self, app: AppName, app_id: AppId, mut kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        kwargs_in.insert("interval".into(), json!(0));
        self.scheduler.insert(app, app_id, self.sunrise(), function, true, Some(SunEvent::NextRising), kwargs_in)
    }

    pub fn run_at_sunset(&self, app: AppName, app_id: AppId, mut kwargs_in: Kwargs, function: ScheduleCallbackFn) -> Result<HandleId, KernelError> {
        kwargs_in.insert("interval".into(), json!(0));
        self.scheduler.insert(app, app_id, self.sunset(), function, true, Some(SunEvent::NextSetting), kwargs_in)
    }

    pub fn cancel_timer(&self, app: &AppName, handle: HandleId) -> bool {
        self.scheduler.cancel_timer(app, handle)
    }

    pub fn info_timer(&self, app: &AppName, handle: HandleId) -> Result<(i64, i64, Kwargs), KernelError> {
        self.scheduler.info_timer(app, handle)
    }

    fn next_occurrence_of(&self, time_of_day: &str) -> Result<i64, KernelError> {
        let secs_of_day = self.parse_time(time_of_day)? as i64;
        let now = self.get_now();
        let today_midnight = now.date_naive().and_time(chrono::NaiveTime::MIN).and_utc().timestamp()
            - utc_offset_seconds(self.sun_calc.timezone(), self.get_now_ts()) as i64;
        let mut candidate = today_midnight + secs_of_day;
        if candidate <= self.get_now_ts() {
            candidate += 86_400;
        }
        Ok(candidate)
    }

    // ---- Diagnostics (spec §6 "CLI/diagnostic surface") ----

    /// `(handle, kind, target, attribute)` per registered callback.
    pub fn callback_entries(&self, app: &AppName) -> Vec<(HandleId, &'static str, String, String)> {
        self.registry.callback_summaries_for_app(app)
    }

    /// `(handle, next_fire, interval, inactive)` per pending scheduler entry.
    pub fn schedule_entries(&self, app: &AppName) -> Vec<(HandleId, i64, i64, bool)> {
        self.scheduler.entries_for_app(app).into_iter().map(|(h, e)| (h, e.timestamp, e.interval, e.inactive)).collect()
    }

    /// `(pending, capacity)` of the dispatcher's work queue.
    pub fn queue_stats(&self) -> (usize, usize) {
        self.dispatcher.queue_stats()
    }

    // ---- App lifecycle integration ----

    /// Removes every callback-registry and scheduler entry for `app` (spec
    /// §3, §4.8 "App termination").
    pub fn terminate_app(&self, app: &AppName) {
        self.registry.remove_app(app);
        self.scheduler.remove_app(app);
    }

    // ---- Tick (spec §4.1, §4.10) ----

    /// Drives one pass of the main loop's scheduler tick: recomputes sun
    /// state, detects a DST flip, fires due timers, and dispatches them.
    pub fn tick(&self) -> TickResult {
        let now = self.get_now_ts();
        let mut result = TickResult::default();

        {
            let mut sun = self.sun.lock();
            if now >= sun.next_rising {
                let new_rising = self.sun_calc.next(now, SunEvent::NextRising);
                if new_rising != sun.next_rising {
                    sun.next_rising = new_rising;
                    result.sunrise_changed = true;
                }
            }
            if now >= sun.next_setting {
                let new_setting = self.sun_calc.next(now, SunEvent::NextSetting);
                if new_setting != sun.next_setting {
                    sun.next_setting = new_setting;
                    result.sunset_changed = true;
                }
            }
        }

        if result.sunrise_changed {
            self.scheduler.process_sun(SunEvent::NextRising, self.sunrise());
        }
        if result.sunset_changed {
            self.scheduler.process_sun(SunEvent::NextSetting, self.sunset());
        }

        let mut last_offset = self.last_utc_offset.lock();
        let current_offset = utc_offset_seconds(self.sun_calc.timezone(), now);
        if current_offset != *last_offset {
            result.dst_flipped = true;
            *last_offset = current_offset;
        }
        drop(last_offset);

        let sun_snapshot = *self.sun.lock();
        let due = self.scheduler.fire(now, |event| sun_snapshot.get(event));
        result.timers_fired = due.len();

        for (app, _handle, entry) in due {
            let ctx = ConstraintContext {
                now_ts: now,
                timezone: self.sun_calc.timezone(),
                sun: sun_snapshot,
                state: &self.state,
                default_namespace: self.default_namespace.clone(),
            };
            let app_kwargs = self.directory.app_constraints(&app);
            let job = Job::Timer { app: app.clone(), app_id: entry.app_id, function: entry.function.clone(), kwargs: entry.kwargs.clone() };
            let outcome = self.dispatcher.dispatch(job, &ctx, &app_kwargs, self.presence.as_ref());
            self.note_dispatch_result(&app, "timer dispatch", outcome);
        }

        result.queue_full = self.queue_full.load(std::sync::atomic::Ordering::SeqCst);
        result
    }

    fn submit_attr_job(
        &self,
        app: AppName,
        _handle: HandleId,
        entry: &StateCallbackEntry,
        entity: EntityId,
        attribute: &str,
        old: Option<Value>,
        new: Option<Value>,
    ) {
        let ctx = self.constraint_context();
        let app_kwargs = self.directory.app_constraints(&app);
        let job = Job::Attr {
            app: app.clone(),
            app_id: entry.app_id,
            function: entry.function.clone(),
            entity,
            attribute: attribute.to_string(),
            old,
            new,
            kwargs: entry.kwargs.clone(),
        };
        let outcome = self.dispatcher.dispatch(job, &ctx, &app_kwargs, self.presence.as_ref());
        self.note_dispatch_result(&app, "state-change dispatch", outcome);
    }

    fn submit_event_job(&self, app: AppName, _handle: HandleId, entry: &EventCallbackEntry, event: &str, data: Value) {
        let ctx = self.constraint_context();
        let app_kwargs = self.directory.app_constraints(&app);
        let job = Job::Event {
            app: app.clone(),
            app_id: entry.app_id,
            function: entry.function.clone(),
            event: event.to_string(),
            data,
            kwargs: entry.kwargs.clone(),
        };
        let outcome = self.dispatcher.dispatch(job, &ctx, &app_kwargs, self.presence.as_ref());
        self.note_dispatch_result(&app, "event dispatch", outcome);
    }

    /// Whether a dispatch has ever hit [`KernelError::QueueFull`] (spec
    /// §4.6) — sticky once true. Polled by [`TickResult::queue_full`] and
    /// available directly for callers that react outside the tick loop.
    pub fn queue_full(&self) -> bool {
        self.queue_full.load(std::sync::atomic::Ordering::SeqCst)
    }
}

impl<C: autod_core::Clock> KernelHandle for Kernel<C> {
    fn install_namespace(&self, namespace: Namespace, seed: std::collections::HashMap<EntityId, EntitySnapshot>) -> Result<(), KernelError> {
        Kernel::install_namespace(self, namespace, seed)
    }

    fn state_update(&self, namespace: &Namespace, event_type: &str, data: &Value) {
        Kernel::state_update(self, namespace, event_type, data)
    }
}

fn utc_offset_seconds(tz: chrono_tz::Tz, ts: i64) -> i32 {
    local_from_ts(tz, ts).offset().fix().local_minus_utc()
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
