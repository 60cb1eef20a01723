// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The narrow surface a plugin needs back from the kernel (spec §4.7).
//!
//! `autod_engine::Kernel` is generic over `Clock`, which (being `Clone`)
//! isn't object-safe, so a plugin can't hold an `Arc<dyn Kernel<_>>`
//! directly. This trait is the object-safe subset plugins actually call,
//! implemented by `Kernel<C>` for any `C`, mirroring how [`crate::AppDirectory`]
//! decouples the dispatcher from any concrete app-lifecycle type.

use crate::{EntityId, EntitySnapshot, KernelError, Namespace};
use serde_json::Value;
use std::collections::HashMap;

pub trait KernelHandle: Send + Sync {
    /// Installs a plugin's seed state atomically (spec §4.7 "On startup,
    /// plugins are loaded and their seed state installed atomically").
    fn install_namespace(&self, namespace: Namespace, seed: HashMap<EntityId, EntitySnapshot>) -> Result<(), KernelError>;

    /// Pushes one update from a plugin's `get_updates` stream (spec §4.7
    /// "state_update(namespace, data)").
    fn state_update(&self, namespace: &Namespace, event_type: &str, data: &Value);
}
