// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-process plugin with no external I/O, for kernel integration tests
//! (spec §4.7 "concrete plugin implementations... out of scope" — this one
//! exists purely to drive the kernel in tests, not as a real adapter).

use crate::error::PluginError;
use crate::plugin::Plugin;
use async_trait::async_trait;
use autod_core::{EntityId, EntitySnapshot, KernelHandle, Namespace};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

/// An in-process plugin whose "remote" feed is a channel the test holds
/// the sending half of.
pub struct MemoryPlugin {
    namespace: Namespace,
    seed: Mutex<HashMap<EntityId, EntitySnapshot>>,
    updates_rx: Mutex<Option<mpsc::Receiver<(String, Value)>>>,
    updates_tx: mpsc::Sender<(String, Value)>,
    utility_calls: Arc<AtomicUsize>,
}

impl MemoryPlugin {
    pub fn new(namespace: Namespace, seed: HashMap<EntityId, EntitySnapshot>) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel(64);
        Self {
            namespace,
            seed: Mutex::new(seed),
            updates_rx: Mutex::new(Some(updates_rx)),
            updates_tx,
            utility_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// The sending half of this plugin's update feed — tests push
    /// `(event_type, data)` pairs through it as if they arrived from a
    /// real source.
    pub fn feed(&self) -> mpsc::Sender<(String, Value)> {
        self.updates_tx.clone()
    }

    pub fn utility_call_count(&self) -> usize {
        self.utility_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Plugin for MemoryPlugin {
    fn get_namespace(&self) -> Namespace {
        self.namespace.clone()
    }

    async fn get_complete_state(&self) -> Result<HashMap<EntityId, EntitySnapshot>, PluginError> {
        Ok(self.seed.lock().clone())
    }

    async fn get_updates(&self, kernel: Arc<dyn KernelHandle>, mut shutdown: oneshot::Receiver<()>) {
        let Some(mut rx) = self.updates_rx.lock().take() else {
            tracing::warn!(namespace = %self.namespace, "get_updates called more than once");
            return;
        };
        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                update = rx.recv() => {
                    match update {
                        Some((event_type, data)) => kernel.state_update(&self.namespace, &event_type, &data),
                        None => break,
                    }
                }
            }
        }
    }

    async fn utility(&self) {
        self.utility_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn stop(&self) {}
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
