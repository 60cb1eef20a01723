// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel-internal error taxonomy (spec §7).
//!
//! Only programming errors in the kernel itself are represented here and
//! allowed to abort an operation — no error inside a single app, callback,
//! or plugin may produce one of these; those are caught at their boundary
//! and logged instead (see `autod-engine::dispatch` and
//! `autod-adapters::plugin`).

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum KernelError {
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("invalid time string: {0}")]
    InvalidTimeString(String),

    #[error("can't specify offset as well as random_start or random_end")]
    OffsetConflict,

    #[error("latitude needs to be -90..90, got {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude needs to be -180..180, got {0}")]
    LongitudeOutOfRange(f64),

    #[error("duplicate namespace: {0}")]
    DuplicateNamespace(String),

    #[error("queue is full")]
    QueueFull,

    #[error("unable to resolve dependencies due to incorrect or circular references: {0}")]
    UnresolvedDependencies(String),

    #[error("invalid app config: {0}")]
    InvalidAppConfig(String),
}
