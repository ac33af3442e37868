// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Poltergeist Daemon (polterd)
//!
//! Per-project background process that watches the source tree and keeps
//! declared targets fresh.
//!
//! Architecture:
//! - Listener task: socket I/O, posts commands into the engine loop
//! - Engine loop: one task owning the scheduler and target controllers

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use polter_adapters::{DesktopAlertAdapter, FsNotifier};
use polter_core::PoltergeistConfig;
use polter_daemon::lifecycle::{self, DaemonPaths, LifecycleError, StartupResult};
use polter_daemon::listener::{ListenCtx, Listener};
use polter_daemon::runtime::DaemonRuntime;
use polter_state::DaemonInfo;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, Notify};
use tracing::{error, info};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

struct Args {
    project: PathBuf,
    config: Option<PathBuf>,
    /// When non-empty, only these targets are watched.
    targets: Vec<String>,
}

fn print_help() {
    println!("polterd {VERSION}");
    println!("Poltergeist daemon - watches a project and rebuilds its targets");
    println!();
    println!("USAGE:");
    println!("    polterd [--project <dir>] [--config <file>]");
    println!();
    println!("The daemon is typically started by the `poltergeist` CLI and");
    println!("should not be invoked directly. It listens on a per-project");
    println!("Unix socket in the state directory.");
    println!();
    println!("OPTIONS:");
    println!("    --project <dir>    Project root (default: current directory)");
    println!("    --config <file>    Config file (default: <project>/poltergeist.config.json)");
    println!("    --target <name>    Watch only this target (repeatable)");
    println!("    -h, --help         Print help information");
    println!("    -v, --version      Print version information");
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args {
        project: std::env::current_dir().map_err(|e| e.to_string())?,
        config: None,
        targets: Vec::new(),
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("polterd {VERSION}");
                std::process::exit(0);
            }
            "--help" | "-h" | "help" => {
                print_help();
                std::process::exit(0);
            }
            "--project" => {
                let value = iter.next().ok_or("--project requires a value")?;
                args.project = PathBuf::from(value);
            }
            "--config" => {
                let value = iter.next().ok_or("--config requires a value")?;
                args.config = Some(PathBuf::from(value));
            }
            "--target" => {
                let value = iter.next().ok_or("--target requires a value")?;
                args.targets.push(value);
            }
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("error: {message}");
            eprintln!("Usage: polterd [--project <dir>] [--config <file>]");
            std::process::exit(1);
        }
    };

    let project_root = std::fs::canonicalize(&args.project).map_err(|e| {
        format!("cannot resolve project root '{}': {e}", args.project.display())
    })?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| project_root.join("poltergeist.config.json"));

    // Config errors are fatal at startup
    let config_text = std::fs::read_to_string(&config_path)
        .map_err(|e| format!("cannot read config '{}': {e}", config_path.display()))?;
    let mut config = PoltergeistConfig::from_json(&config_text)
        .map_err(|e| format!("invalid config '{}': {e}", config_path.display()))?;
    if !args.targets.is_empty() {
        for target in &mut config.targets {
            if !args.targets.contains(&target.name) {
                target.enabled = false;
            }
        }
    }

    let paths = DaemonPaths::resolve(&project_root);
    std::fs::create_dir_all(&paths.state_dir)?;

    // Rotate the log if it has grown too large, then drop the startup
    // marker (before tracing setup, so the CLI can find this attempt)
    rotate_log_if_needed(&paths.daemon_log);
    write_startup_marker(&paths)?;
    let _log_guard = setup_logging(&paths)?;

    info!(project = %project_root.display(), "starting daemon");

    let StartupResult { daemon, listener } =
        match lifecycle::startup(&project_root, Some(&config_path), config) {
            Ok(result) => result,
            Err(LifecycleError::AlreadyRunning { pid }) => {
                match pid {
                    Some(pid) => eprintln!("polterd is already running (pid {pid})"),
                    None => eprintln!("polterd is already running"),
                }
                std::process::exit(1);
            }
            Err(e) => {
                write_startup_error(&paths, &e.to_string());
                error!("failed to start daemon: {e}");
                return Err(e.into());
            }
        };

    // Wire the engine loop; notifier failure at this point is fatal
    let store = Arc::clone(&daemon.store);
    let target_names: Vec<String> = daemon.targets.iter().map(|t| t.name.clone()).collect();
    let (command_tx, command_rx) = mpsc::channel(32);

    let runtime = match DaemonRuntime::new(
        daemon,
        FsNotifier::new(),
        DesktopAlertAdapter::new(),
        command_rx,
    )
    .await
    {
        Ok(runtime) => runtime,
        Err(e) => {
            write_startup_error(&paths, &format!("notifier unavailable: {e}"));
            error!("notifier unavailable: {e}");
            let _ = DaemonInfo::remove(&paths.daemon_info);
            if paths.socket.exists() {
                let _ = std::fs::remove_file(&paths.socket);
            }
            std::process::exit(1);
        }
    };

    // Listener task
    let listener = Listener::new(
        listener,
        ListenCtx {
            store,
            targets: target_names,
            command_tx,
        },
    );
    tokio::spawn(listener.run());

    // Signals feed the same shutdown path as the Shutdown command
    let shutdown = Arc::new(Notify::new());
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = sigint.recv() => info!("received SIGINT"),
        }
        signal_shutdown.notify_one();
    });

    info!(socket = %paths.socket.display(), "daemon ready");

    // Handshake marker for the parent process (CLI waiting on startup)
    println!("READY");

    let daemon = runtime.run(shutdown).await;
    daemon.release();
    info!("daemon stopped");
    Ok(())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate the daemon log if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `.log` → `.log.1` → `.log.2` → `.log.3`, deleting the oldest.
/// Best-effort: rotation failures must not prevent startup.
fn rotate_log_if_needed(log_path: &std::path::Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

/// Startup marker prefix written to the log before anything else.
/// The CLI uses this to scope error scans to the current attempt.
const STARTUP_MARKER_PREFIX: &str = "--- polterd: starting (pid: ";

fn write_startup_marker(paths: &DaemonPaths) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = paths.daemon_log.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.daemon_log)?;
    writeln!(file, "{}{}) ---\n", STARTUP_MARKER_PREFIX, std::process::id())?;
    Ok(())
}

/// Write a startup error synchronously so the CLI sees it even when the
/// process exits before the async log writer flushes.
fn write_startup_error(paths: &DaemonPaths, message: &str) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.daemon_log)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {message}");
}

fn setup_logging(
    paths: &DaemonPaths,
) -> Result<tracing_appender::non_blocking::WorkerGuard, std::io::Error> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = paths
        .daemon_log
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = paths
        .daemon_log
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "daemon.log".into());

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let default_level = if polter_daemon::env::debug_daemon() {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
