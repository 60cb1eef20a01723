// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Entry point: parses CLI args, loads the YAML config, brings up the
//! kernel/app-lifecycle/plugin host, and runs until asked to stop.

use autod_adapters::{MemoryPlugin, Plugin, WebSocketPlugin};
use autod_core::Namespace;
use autod_daemon::{config, Daemon, Listener};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "autod", about = "Event and timing kernel daemon")]
struct Args {
    /// Path to the YAML config file.
    #[arg(short, long, default_value = "/etc/autod/autod.yaml")]
    config: PathBuf,
}

fn build_plugins(settings: &config::AppDaemonSettings) -> Vec<Arc<dyn Plugin>> {
    let namespace = Namespace::new(autod_daemon::daemon::DEFAULT_NAMESPACE);
    match &settings.ha_url {
        Some(url) => vec![Arc::new(WebSocketPlugin::new(namespace, url.clone())) as Arc<dyn Plugin>],
        None => vec![Arc::new(MemoryPlugin::new(namespace, Default::default())) as Arc<dyn Plugin>],
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let loaded = config::load(&args.config)?;
    let control_socket = loaded.settings.control_socket.clone().unwrap_or_else(|| PathBuf::from("/run/autod.sock"));
    let plugins = build_plugins(&loaded.settings);

    let daemon = Arc::new(Daemon::new(loaded, plugins, Some(args.config.clone()))?);
    daemon.start_plugins().await?;
    daemon.load_apps()?;

    let listener = Listener::bind(&control_socket, daemon.clone())?;
    let shutdown = daemon.shutdown_handle();

    let main_loop = tokio::spawn({
        let daemon = daemon.clone();
        async move { daemon.run_main_loop().await }
    });
    let utility_loop = tokio::spawn({
        let daemon = daemon.clone();
        async move { daemon.run_utility_loop().await }
    });
    let listener_task = tokio::spawn(listener.run(shutdown.clone()));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => tracing::info!("received shutdown signal"),
        _ = shutdown.notified() => tracing::info!("shutdown requested via control socket"),
    }

    daemon.stop().await;
    let _ = tokio::join!(main_loop, utility_loop, listener_task);
    Ok(())
}
