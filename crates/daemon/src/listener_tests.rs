// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::config::{AppDaemonSettings, LoadedConfig};
use autod_wire::{read_message, write_message};
use std::collections::BTreeMap;
use std::time::Duration;

fn test_daemon() -> Arc<Daemon> {
    let settings = AppDaemonSettings {
        latitude: 51.5,
        longitude: -0.13,
        elevation: 0.0,
        time_zone: "Europe/London".to_string(),
        app_dir: PathBuf::from("/nonexistent"),
        threads: 2,
        tick: 1,
        utility_delay: 1,
        queue_size: 16,
        control_socket: None,
        ha_url: None,
        realtime: true,
        start_time: None,
        endtime: None,
        interval: 1,
    };
    let loaded = LoadedConfig { settings, apps: BTreeMap::new() };
    Arc::new(Daemon::new(loaded, Vec::new(), None).unwrap())
}

async fn roundtrip(socket: &Path, query: &Query) -> Response {
    let mut stream = UnixStream::connect(socket).await.unwrap();
    let payload = autod_wire::encode(query).unwrap();
    write_message(&mut stream, &payload).await.unwrap();
    let response_bytes = read_message(&mut stream).await.unwrap();
    autod_wire::decode(&response_bytes).unwrap()
}

#[tokio::test]
async fn ping_gets_pong() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("autod.sock");
    let daemon = test_daemon();
    let listener = Listener::bind(&socket_path, daemon.clone()).unwrap();
    let shutdown = daemon.shutdown_handle();
    let handle = tokio::spawn(listener.run(shutdown));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let response = roundtrip(&socket_path, &Query::Ping).await;
    assert_eq!(response, Response::Pong);

    daemon.shutdown_handle().notify_waiters();
    handle.await.unwrap();
    assert!(!socket_path.exists());
}

#[tokio::test]
async fn list_apps_on_an_empty_daemon_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("autod.sock");
    let daemon = test_daemon();
    let listener = Listener::bind(&socket_path, daemon.clone()).unwrap();
    let shutdown = daemon.shutdown_handle();
    let handle = tokio::spawn(listener.run(shutdown));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let response = roundtrip(&socket_path, &Query::ListApps).await;
    assert_eq!(response, Response::Apps { names: Vec::new() });

    daemon.shutdown_handle().notify_waiters();
    handle.await.unwrap();
}

#[tokio::test]
async fn stop_query_triggers_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("autod.sock");
    let daemon = test_daemon();
    let listener = Listener::bind(&socket_path, daemon.clone()).unwrap();
    let shutdown = daemon.shutdown_handle();
    let handle = tokio::spawn(listener.run(shutdown));

    tokio::time::sleep(Duration::from_millis(20)).await;
    let response = roundtrip(&socket_path, &Query::Stop).await;
    assert_eq!(response, Response::ShuttingDown);

    handle.await.unwrap();
}
