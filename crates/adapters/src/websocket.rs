// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An illustrative plugin that polls a remote hub over a websocket (spec
//! §4.7), mirroring the teacher's websocket event-bridge pattern
//! (subscribe, read JSON frames, translate into kernel calls). Minimal and
//! not exhaustively featured per spec.md §1 — no reconnect-with-backoff,
//! no TLS config beyond what the URL scheme implies.

use crate::error::PluginError;
use crate::plugin::Plugin;
use async_trait::async_trait;
use autod_core::{EntityId, EntitySnapshot, KernelHandle, Namespace};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;

/// One update frame the hub sends: `{event_type, data}` (spec §4.7
/// "pushes `{event_type, data}`").
#[derive(Debug, Deserialize)]
struct UpdateFrame {
    event_type: String,
    data: serde_json::Value,
}

/// Response to the one-shot snapshot request sent at startup.
#[derive(Debug, Deserialize)]
struct SnapshotFrame {
    entities: HashMap<EntityId, EntitySnapshot>,
}

pub struct WebSocketPlugin {
    namespace: Namespace,
    url: String,
}

impl WebSocketPlugin {
    pub fn new(namespace: Namespace, url: impl Into<String>) -> Self {
        Self { namespace, url: url.into() }
    }
}

#[async_trait]
impl Plugin for WebSocketPlugin {
    fn get_namespace(&self) -> Namespace {
        self.namespace.clone()
    }

    async fn get_complete_state(&self) -> Result<HashMap<EntityId, EntitySnapshot>, PluginError> {
        let seed_state = async {
            let (mut ws, _) = tokio_tungstenite::connect_async(&self.url).await.map_err(|e| e.to_string())?;
            ws.send(Message::Text(r#"{"op":"snapshot"}"#.into())).await.map_err(|e| e.to_string())?;
            let frame = ws.next().await.ok_or_else(|| "connection closed before snapshot".to_string())?.map_err(|e| e.to_string())?;
            let Message::Text(text) = frame else {
                return Err("snapshot response was not a text frame".to_string());
            };
            let snapshot: SnapshotFrame = serde_json::from_str(&text).map_err(|e| e.to_string())?;
            Ok(snapshot.entities)
        };

        match tokio::time::timeout(Duration::from_secs(5), seed_state).await {
            Ok(Ok(entities)) => Ok(entities),
            Ok(Err(reason)) => Err(PluginError::SeedStateFailed { namespace: self.namespace.to_string(), reason }),
            Err(_) => Err(PluginError::SeedStateFailed { namespace: self.namespace.to_string(), reason: "timed out".to_string() }),
        }
    }

    async fn get_updates(&self, kernel: Arc<dyn KernelHandle>, mut shutdown: oneshot::Receiver<()>) {
        let (ws, _) = match tokio_tungstenite::connect_async(&self.url).await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "websocket plugin: connect failed");
                return;
            }
        };
        let (_write, mut read) = ws.split();

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str::<UpdateFrame>(&text) {
                                Ok(frame) => kernel.state_update(&self.namespace, &frame.event_type, &frame.data),
                                Err(e) => tracing::warn!(namespace = %self.namespace, error = %e, "websocket plugin: unparseable frame"),
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(namespace = %self.namespace, error = %e, "websocket plugin: stream error");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn utility(&self) {}

    async fn stop(&self) {
        tracing::info!(namespace = %self.namespace, "websocket plugin stopping");
    }
}

#[cfg(test)]
#[path = "websocket_tests.rs"]
mod tests;
