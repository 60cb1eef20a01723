// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the workspace specs: locates the `autod`/`autodctl`
//! binaries cargo built alongside the test binary, writes a scratch config,
//! and drives the daemon as a real child process.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

/// `autod`/`autodctl` live in the same `target/{debug,release}` directory as
/// the test binary itself, one level up from the `deps/` directory the test
/// binary runs from.
fn bin_path(name: &str) -> PathBuf {
    let mut path = std::env::current_exe().expect("current_exe");
    path.pop();
    if path.ends_with("deps") {
        path.pop();
    }
    path.push(name);
    path
}

fn config_contents(socket: &Path, app_dir: &Path, apps_yaml: &str) -> String {
    format!(
        "AppDaemon:\n  latitude: 51.5\n  longitude: -0.13\n  time_zone: Europe/London\n  app_dir: {}\n  control_socket: {}\n  tick: 1\n  utility_delay: 1\n{apps_yaml}",
        app_dir.display(),
        socket.display(),
    )
}

fn write_config(dir: &Path, socket: &Path, app_dir: &Path) -> PathBuf {
    let config_path = dir.join("autod.yaml");
    std::fs::write(&config_path, config_contents(socket, app_dir, "")).expect("write scratch config");
    config_path
}

/// A running `autod` daemon against a scratch config. Killed on drop.
pub struct DaemonHandle {
    child: Child,
    pub socket: PathBuf,
    pub config: PathBuf,
    app_dir: PathBuf,
    _dir: tempfile::TempDir,
}

impl DaemonHandle {
    /// Starts `autod` against a fresh temp directory and waits for its
    /// control socket to appear.
    pub fn start() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let app_dir = dir.path().join("apps");
        std::fs::create_dir_all(&app_dir).expect("create app dir");
        let socket = dir.path().join("autod.sock");
        let config = write_config(dir.path(), &socket, &app_dir);

        let child = Command::new(bin_path("autod"))
            .arg("--config")
            .arg(&config)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("spawn autod");

        let handle = Self { child, socket, config, app_dir, _dir: dir };
        assert!(handle.wait_for_socket(Duration::from_secs(5)), "autod never created its control socket");
        handle
    }

    /// Rewrites the scratch config file's app entries (everything after the
    /// `AppDaemon:` section), e.g. to exercise a config-file reload.
    pub fn set_apps(&self, apps_yaml: &str) {
        std::fs::write(&self.config, config_contents(&self.socket, &self.app_dir, apps_yaml)).expect("rewrite scratch config");
    }

    fn wait_for_socket(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.socket.exists() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        false
    }

    /// Runs `autodctl <args>` against this daemon's socket.
    pub fn ctl(&self, args: &[&str]) -> std::process::Output {
        Command::new(bin_path("autodctl"))
            .arg("--socket")
            .arg(&self.socket)
            .args(args)
            .output()
            .expect("spawn autodctl")
    }
}

impl Drop for DaemonHandle {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Polls `condition` until it's true or `timeout` elapses.
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}
