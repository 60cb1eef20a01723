// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::prelude::DaemonHandle;
use std::time::Duration;

fn output_text(output: &std::process::Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn autod_answers_ping_on_its_control_socket() {
    let daemon = DaemonHandle::start();
    let output = daemon.ctl(&["ping"]);
    assert!(output.status.success());
    assert_eq!(output_text(&output).trim(), "pong");
}

#[test]
fn autod_reports_an_empty_app_list_with_no_configured_apps() {
    let daemon = DaemonHandle::start();
    let output = daemon.ctl(&["apps"]);
    assert!(output.status.success());
    assert!(output_text(&output).trim().is_empty());
}

#[test]
fn autod_reports_sun_times_and_an_empty_queue() {
    let daemon = DaemonHandle::start();

    let sun = daemon.ctl(&["sun"]);
    assert!(sun.status.success());
    assert!(output_text(&sun).starts_with("sunrise="));

    let queue = daemon.ctl(&["queue"]);
    assert!(queue.status.success());
    assert_eq!(output_text(&queue).trim(), "pending=0\tcapacity=1024");
}

#[test]
fn reload_picks_up_an_app_added_to_the_config_file_on_disk() {
    let daemon = DaemonHandle::start();
    assert!(output_text(&daemon.ctl(&["apps"])).trim().is_empty());

    daemon.set_apps("beat:\n  class: Heartbeat\n  module: heartbeat\n");
    let output = daemon.ctl(&["reload"]);
    assert!(output.status.success());

    let apps = daemon.ctl(&["apps"]);
    assert_eq!(output_text(&apps).trim(), "beat");
}

#[test]
fn reload_terminates_an_app_removed_from_the_config_file_on_disk() {
    let daemon = DaemonHandle::start();
    daemon.set_apps("beat:\n  class: Heartbeat\n  module: heartbeat\n");
    assert!(daemon.ctl(&["reload"]).status.success());
    assert_eq!(output_text(&daemon.ctl(&["apps"])).trim(), "beat");

    daemon.set_apps("");
    assert!(daemon.ctl(&["reload"]).status.success());
    assert!(output_text(&daemon.ctl(&["apps"])).trim().is_empty());
}

#[test]
fn shutdown_query_stops_the_daemon() {
    let daemon = DaemonHandle::start();
    let output = daemon.ctl(&["shutdown"]);
    assert!(output.status.success());
    assert_eq!(output_text(&output).trim(), "shutting down");

    let socket = daemon.socket.clone();
    let gone = crate::prelude::wait_for(Duration::from_secs(5), || !socket.exists());
    assert!(gone, "control socket should be removed once the daemon shuts down");
}
