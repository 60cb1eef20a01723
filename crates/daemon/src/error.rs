// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("reading config file {path}: {source}")]
    ReadConfig { path: String, source: std::io::Error },

    #[error("parsing config file {path}: {reason}")]
    ParseConfig { path: String, reason: String },

    #[error(transparent)]
    Kernel(#[from] autod_core::KernelError),

    #[error("control socket: {0}")]
    Io(#[from] std::io::Error),

    #[error("control protocol: {0}")]
    Protocol(#[from] autod_wire::ProtocolError),
}
