// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-batch resolution (spec §4.8 "Dependency resolution").
//!
//! Repeatedly selects the subset of pending modules whose dependencies are
//! all already satisfied by a previous batch, emits it as one batch, and
//! removes it from pending. An empty batch while pending is non-empty means
//! a circular or missing reference.

use autod_core::KernelError;
use std::collections::{BTreeMap, BTreeSet};

/// `module -> the modules it depends on`, built from every app config
/// entry's `module`/`dependencies` (several apps may share one module; their
/// dependency sets are unioned).
pub type DependencyGraph = BTreeMap<String, BTreeSet<String>>;

/// Batches every module reachable in `graph`, starting from `pending`
/// (modules new or changed this scan) plus any module that depends, even
/// transitively, on one of those (spec §4.8 "plus any file that declares a
/// dependency on a file in the first two sets, computed transitively").
///
/// Every module in `graph` not in the transitive closure of `pending` is
/// still included in the ordering (so load-marked modules can depend on it)
/// but is never itself considered "newly due" by the caller — see
/// [`Batch::load`].
pub fn batch(graph: &DependencyGraph, pending: &BTreeSet<String>) -> Result<Vec<Vec<Batch>>, KernelError> {
    let to_load = transitive_dependents(graph, pending);

    let mut remaining: BTreeSet<String> = graph.keys().cloned().collect();
    let mut satisfied: BTreeSet<String> = BTreeSet::new();
    let mut load_order = Vec::new();

    while !remaining.is_empty() {
        let mut batch_entry = Vec::new();
        for module in remaining.iter() {
            let satisfied_already = match graph.get(module) {
                Some(deps) => deps.iter().all(|d| satisfied.contains(d)),
                None => true,
            };
            if satisfied_already {
                batch_entry.push(module.clone());
            }
        }

        if batch_entry.is_empty() {
            let names: Vec<String> = remaining.into_iter().collect();
            return Err(KernelError::UnresolvedDependencies(names.join(",")));
        }

        for module in &batch_entry {
            remaining.remove(module);
            satisfied.insert(module.clone());
        }

        let emitted = batch_entry.into_iter().map(|module| {
            let load = to_load.contains(&module);
            Batch { module, load }
        });
        load_order.push(emitted.collect());
    }

    Ok(load_order)
}

/// `pending`, plus every module that depends on a module in the result,
/// expanded to a fixed point — a module two hops away from a pending module
/// through its dependency chain still needs reloading (spec §4.8 "computed
/// transitively").
fn transitive_dependents(graph: &DependencyGraph, pending: &BTreeSet<String>) -> BTreeSet<String> {
    let mut load = pending.clone();
    loop {
        let mut grew = false;
        for (module, deps) in graph {
            if !load.contains(module) && deps.iter().any(|dep| load.contains(dep)) {
                load.insert(module.clone());
                grew = true;
            }
        }
        if !grew {
            return load;
        }
    }
}

/// One module in a load batch: `load` is false for a module that merely
/// needs to participate in ordering (it wasn't itself new/changed) but
/// satisfies another pending module's dependency (spec §4.8 "Non-load
/// entries still participate in ordering").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub module: String,
    pub load: bool,
}

#[cfg(test)]
#[path = "dependency_tests.rs"]
mod tests;
