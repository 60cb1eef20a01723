// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Plugin` contract (spec §4.7): each plugin owns one namespace of
//! entity state and feeds it updates over the long-running `get_updates`
//! task. Concrete plugin implementations beyond the two illustrative ones
//! in this crate are out of scope (spec.md §1).

use crate::error::PluginError;
use async_trait::async_trait;
use autod_core::{EntityId, EntitySnapshot, KernelHandle, Namespace};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::oneshot;

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Must be unique across every loaded plugin (spec §4.7).
    fn get_namespace(&self) -> Namespace;

    /// Seed state installed atomically into the state store before
    /// `get_updates` starts (spec §4.7).
    async fn get_complete_state(&self) -> Result<HashMap<EntityId, EntitySnapshot>, PluginError>;

    /// Runs until `shutdown` fires, pushing every update into `kernel` via
    /// [`KernelHandle::state_update`] (spec §4.7). Errors encountered while
    /// running are this plugin's own concern to log; the host never sees
    /// them.
    async fn get_updates(&self, kernel: Arc<dyn KernelHandle>, shutdown: oneshot::Receiver<()>);

    /// Called once per utility tick for maintenance (spec §4.9).
    async fn utility(&self);

    /// Graceful shutdown (spec §5 Cancellation): called after `get_updates`
    /// has been asked to stop.
    async fn stop(&self);
}
