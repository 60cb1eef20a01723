// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control-socket listener (spec §6 "CLI/diagnostic surface"): accepts
//! one `autod-wire` request per connection, answers it against the live
//! [`Daemon`], and closes.

use crate::daemon::Daemon;
use autod_core::AppName;
use autod_wire::{read_request, write_response, CallbackEntry, Query, Response, ScheduleEntry};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::{UnixListener, UnixStream};

pub struct Listener {
    socket: UnixListener,
    path: PathBuf,
    daemon: Arc<Daemon>,
}

impl Listener {
    /// Binds `path`, removing a stale socket file left by a prior run first.
    pub fn bind(path: &Path, daemon: Arc<Daemon>) -> std::io::Result<Self> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        let socket = UnixListener::bind(path)?;
        Ok(Self { socket, path: path.to_path_buf(), daemon })
    }

    /// Accepts connections until `shutdown` fires, spawning one task per
    /// connection. Removes the socket file on the way out.
    pub async fn run(self, shutdown: Arc<tokio::sync::Notify>) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.notified() => break,
                accepted = self.socket.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let daemon = self.daemon.clone();
                            tokio::spawn(async move {
                                if let Err(err) = handle_connection(stream, &daemon).await {
                                    tracing::warn!(error = %err, "control connection failed");
                                }
                            });
                        }
                        Err(err) => tracing::warn!(error = %err, "control socket accept failed"),
                    }
                }
            }
        }
        let _ = std::fs::remove_file(&self.path);
    }
}

async fn handle_connection(mut stream: UnixStream, daemon: &Daemon) -> Result<(), autod_wire::ProtocolError> {
    let query = read_request(&mut stream).await?;
    let response = dispatch(daemon, query).await;
    write_response(&mut stream, &response).await
}

async fn dispatch(daemon: &Daemon, query: Query) -> Response {
    match query {
        Query::Ping => Response::Pong,
        Query::ListApps => {
            Response::Apps { names: daemon.lifecycle.loaded_app_names().into_iter().map(|name| name.to_string()).collect() }
        }
        Query::GetCallbacks { app } => {
            let entries = daemon
                .kernel
                .callback_entries(&AppName::new(&app))
                .into_iter()
                .map(|(handle, kind, target, attribute)| CallbackEntry { handle: handle.to_string(), kind: kind.to_string(), target, attribute })
                .collect();
            Response::Callbacks { entries }
        }
        Query::GetSchedule { app } => {
            let entries = daemon
                .kernel
                .schedule_entries(&AppName::new(&app))
                .into_iter()
                .map(|(handle, next_fire, interval, inactive)| ScheduleEntry { handle: handle.to_string(), next_fire, interval, inactive })
                .collect();
            Response::Schedule { entries }
        }
        Query::GetSunInfo => Response::SunInfo { sunrise: daemon.kernel.sunrise(), sunset: daemon.kernel.sunset() },
        Query::GetQueueDepth => {
            let (pending, capacity) = daemon.kernel.queue_stats();
            Response::QueueDepth { pending, capacity }
        }
        Query::ReloadApps => match daemon.reload_apps() {
            Ok(_) => Response::Ok,
            Err(err) => Response::Error { message: err.to_string() },
        },
        Query::StopApp { app } => {
            daemon.lifecycle.terminate_app(&AppName::new(&app));
            Response::Ok
        }
        Query::Stop => {
            daemon.shutdown_handle().notify_waiters();
            Response::ShuttingDown
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
