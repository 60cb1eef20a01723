// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn loads_app_daemon_settings_and_app_entries() {
    let file = write_config(
        r#"
AppDaemon:
  latitude: 51.5
  longitude: -0.13
  time_zone: Europe/London
  app_dir: /etc/autod/apps

porch_light:
  class: PorchLight
  module: porch_light
  constrain_days: mon,tue
"#,
    );

    let loaded = load(file.path()).unwrap();
    assert_eq!(loaded.settings.latitude, 51.5);
    assert_eq!(loaded.settings.time_zone, "Europe/London");
    assert_eq!(loaded.settings.threads, 10);
    assert_eq!(loaded.apps.len(), 1);
    assert!(loaded.apps.contains_key(&AppName::new("porch_light")));
}

#[test]
fn realtime_defaults_true_with_no_simulated_fields() {
    let file = write_config(
        r#"
AppDaemon:
  latitude: 51.5
  longitude: -0.13
  time_zone: Europe/London
  app_dir: /etc/autod/apps
"#,
    );
    let loaded = load(file.path()).unwrap();
    assert!(loaded.settings.realtime);
    assert!(loaded.settings.start_time.is_none());
}

#[test]
fn simulated_settings_parse() {
    let file = write_config(
        r#"
AppDaemon:
  latitude: 51.5
  longitude: -0.13
  time_zone: Europe/London
  app_dir: /etc/autod/apps
  realtime: false
  start_time: "2026-01-01 00:00:00"
  endtime: "2026-01-02 00:00:00"
  interval: 60
"#,
    );
    let loaded = load(file.path()).unwrap();
    assert!(!loaded.settings.realtime);
    assert_eq!(loaded.settings.start_time, Some("2026-01-01 00:00:00".to_string()));
    assert_eq!(loaded.settings.endtime, Some("2026-01-02 00:00:00".to_string()));
    assert_eq!(loaded.settings.interval, 60);
}

#[test]
fn missing_app_daemon_section_is_an_error() {
    let file = write_config("porch_light:\n  class: PorchLight\n  module: porch_light\n");
    let err = load(file.path()).unwrap_err();
    assert!(matches!(err, DaemonError::ParseConfig { .. }));
}

#[test]
fn missing_file_is_a_read_error() {
    let err = load(std::path::Path::new("/no/such/path.yaml")).unwrap_err();
    assert!(matches!(err, DaemonError::ReadConfig { .. }));
}
