// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher & worker pool (spec §4.6): evaluates constraints, enqueues
//! work on a bounded channel, and a fixed number of concurrent workers run
//! callbacks with isolation from each other and from the kernel.
//!
//! Workers are realized as `tokio::task::spawn_blocking` calls gated by a
//! [`Semaphore`] sized to the configured worker count — the async
//! equivalent of the original's fixed pool of daemon threads pulling off a
//! bounded queue (spec §5). Each job runs to completion on its own blocking
//! thread; a panic inside user code is caught and logged exactly like the
//! original's broad `except Exception`, and never reaches the dispatcher
//! loop.

use crate::constraint::{self, ConstraintContext, Presence};
use crate::registry::{EventCallbackFn, StateCallbackFn};
use crate::scheduler::ScheduleCallbackFn;
use autod_core::kwargs::{self, Kwargs};
use autod_core::{AppDirectory, AppId, AppName, EntityId, KernelError};
use serde_json::Value;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};

/// One unit of work handed to a worker (spec §4.6).
pub enum Job {
    Initialize { app: AppName, app_id: AppId, function: Arc<dyn Fn() + Send + Sync> },
    Timer { app: AppName, app_id: AppId, function: ScheduleCallbackFn, kwargs: Kwargs },
    Attr {
        app: AppName,
        app_id: AppId,
        function: StateCallbackFn,
        entity: EntityId,
        attribute: String,
        old: Option<Value>,
        new: Option<Value>,
        kwargs: Kwargs,
    },
    Event { app: AppName, app_id: AppId, function: EventCallbackFn, event: String, data: Value, kwargs: Kwargs },
}

impl Job {
    fn app(&self) -> &AppName {
        match self {
            Job::Initialize { app, .. } => app,
            Job::Timer { app, .. } => app,
            Job::Attr { app, .. } => app,
            Job::Event { app, .. } => app,
        }
    }

    fn app_id(&self) -> AppId {
        match self {
            Job::Initialize { app_id, .. } => *app_id,
            Job::Timer { app_id, .. } => *app_id,
            Job::Attr { app_id, .. } => *app_id,
            Job::Event { app_id, .. } => *app_id,
        }
    }
}

pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
    queue_capacity: usize,
}

impl Dispatcher {
    /// Spawns the dispatcher's receive loop and its worker semaphore.
    /// `queue_capacity` bounds the channel (spec §4.6 "if the queue is full
    /// this is a fatal configuration error" — callers see [`KernelError::QueueFull`]
    /// from [`Self::try_enqueue`] rather than the producer blocking).
    pub fn spawn(queue_capacity: usize, workers: usize, directory: Arc<dyn AppDirectory>) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity);
        tokio::spawn(Self::run(rx, workers, directory));
        Self { tx, queue_capacity }
    }

    pub fn try_enqueue(&self, job: Job) -> Result<(), KernelError> {
        self.tx.try_send(job).map_err(|_| KernelError::QueueFull)
    }

    /// `(pending, capacity)` for diagnostic listing (spec §6 "CLI/diagnostic
    /// surface"). `pending` is derived from the channel's free-slot count,
    /// not tracked separately.
    pub fn queue_stats(&self) -> (usize, usize) {
        (self.queue_capacity - self.tx.capacity(), self.queue_capacity)
    }

    /// Evaluates constraints (C5) and enqueues only if all pass; a failing
    /// constraint silently drops the job (`Ok(())`, nothing enqueued),
    /// matching spec §4.6 step 1. [`KernelError::QueueFull`] is a distinct,
    /// fatal outcome (spec §4.6) and is returned to the caller rather than
    /// absorbed here — see [`crate::kernel::Kernel::tick`] and its sibling
    /// submit paths for how it gets escalated.
    pub fn dispatch(
        &self,
        job: Job,
        ctx: &ConstraintContext<'_>,
        app_kwargs: &Kwargs,
        presence: &dyn Presence,
    ) -> Result<(), KernelError> {
        let job_kwargs = match &job {
            Job::Initialize { .. } => None,
            Job::Timer { kwargs, .. } => Some(kwargs),
            Job::Attr { kwargs, .. } => Some(kwargs),
            Job::Event { kwargs, .. } => Some(kwargs),
        };

        if !constraint::passes_all(ctx, app_kwargs, presence)? {
            return Ok(());
        }
        if let Some(kw) = job_kwargs {
            if !constraint::passes_all(ctx, kw, presence)? {
                return Ok(());
            }
        }

        self.try_enqueue(job)
    }

    async fn run(mut rx: mpsc::Receiver<Job>, workers: usize, directory: Arc<dyn AppDirectory>) {
        let workers = workers.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        while let Some(job) = rx.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => break,
            };
            let directory = directory.clone();
            tokio::task::spawn_blocking(move || {
                let _permit = permit;
                run_job(job, directory.as_ref());
            });
        }
    }
}

fn run_job(job: Job, directory: &dyn AppDirectory) {
    let app = job.app().clone();
    let job_id = job.app_id();

    let current = directory.current_id(&app);
    if current != Some(job_id) {
        tracing::debug!(app = %app, "stale callback discarded");
        return;
    }

    let result = std::panic::catch_unwind(AssertUnwindSafe(|| match job {
        Job::Initialize { function, .. } => function(),
        Job::Timer { function, kwargs: kw, .. } => function(kwargs::sanitize(&kw)),
        Job::Attr { function, entity, attribute, old, new, kwargs: kw, .. } => {
            function(&entity, &attribute, old, new, kwargs::sanitize(&kw))
        }
        Job::Event { function, event, data, kwargs: kw, .. } => function(&event, &data, kwargs::sanitize(&kw)),
    }));

    if let Err(panic) = result {
        let message = panic_message(&panic);
        tracing::error!(app = %app, error = %message, "callback panicked");
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
