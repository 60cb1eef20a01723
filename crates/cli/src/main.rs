// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `autodctl`: a thin client over the daemon's control socket (spec §6
//! "CLI/diagnostic surface"). Every subcommand sends one [`Query`] and
//! prints the matching [`Response`].

use anyhow::{Context, Result};
use autod_wire::{read_message, write_message, Query, Response};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tokio::net::UnixStream;

const LONG_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "autodctl", long_version = LONG_VERSION)]
struct Cli {
    /// Path to the daemon's control socket.
    #[arg(long, default_value = "/run/autod.sock")]
    socket: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Checks that the daemon is alive.
    Ping,
    /// Lists every currently loaded app.
    Apps,
    /// Lists the callbacks registered by an app.
    Callbacks { app: String },
    /// Lists the scheduler entries owned by an app.
    Schedule { app: String },
    /// Prints the next sunrise/sunset timestamps.
    Sun,
    /// Prints the dispatcher's queue depth.
    Queue,
    /// Forces a full reload of every configured app.
    Reload,
    /// Terminates one app without restarting it.
    StopApp { app: String },
    /// Asks the daemon to shut down.
    Shutdown,
}

impl From<Command> for Query {
    fn from(command: Command) -> Self {
        match command {
            Command::Ping => Query::Ping,
            Command::Apps => Query::ListApps,
            Command::Callbacks { app } => Query::GetCallbacks { app },
            Command::Schedule { app } => Query::GetSchedule { app },
            Command::Sun => Query::GetSunInfo,
            Command::Queue => Query::GetQueueDepth,
            Command::Reload => Query::ReloadApps,
            Command::StopApp { app } => Query::StopApp { app },
            Command::Shutdown => Query::Stop,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let query: Query = cli.command.into();
    let response = send(&cli.socket, &query).await?;
    print_response(&response);
    if matches!(response, Response::Error { .. }) {
        std::process::exit(1);
    }
    Ok(())
}

async fn send(socket: &PathBuf, query: &Query) -> Result<Response> {
    let mut stream =
        UnixStream::connect(socket).await.with_context(|| format!("connecting to {}", socket.display()))?;
    let payload = autod_wire::encode(query).context("encoding request")?;
    write_message(&mut stream, &payload).await.context("sending request")?;
    let bytes = read_message(&mut stream).await.context("reading response")?;
    autod_wire::decode(&bytes).context("decoding response")
}

fn print_response(response: &Response) {
    match response {
        Response::Pong => println!("pong"),
        Response::Ok => println!("ok"),
        Response::ShuttingDown => println!("shutting down"),
        Response::Error { message } => eprintln!("error: {message}"),
        Response::Apps { names } => {
            for name in names {
                println!("{name}");
            }
        }
        Response::Callbacks { entries } => {
            for entry in entries {
                println!("{}\t{}\t{}\t{}", entry.handle, entry.kind, entry.target, entry.attribute);
            }
        }
        Response::Schedule { entries } => {
            for entry in entries {
                println!("{}\tnext_fire={}\tinterval={}\tinactive={}", entry.handle, entry.next_fire, entry.interval, entry.inactive);
            }
        }
        Response::SunInfo { sunrise, sunset } => println!("sunrise={sunrise}\tsunset={sunset}"),
        Response::QueueDepth { pending, capacity } => println!("pending={pending}\tcapacity={capacity}"),
    }
}
