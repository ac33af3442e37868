// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Unix-socket listener task.
//!
//! Each connection is served by its own task. Reads (Ping, Status) answer
//! from the state store directly; mutations and scheduler queries are
//! posted into the engine loop and awaited over a oneshot reply.

use polter_state::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::protocol::{
    read_request, write_response, ProtocolError, Request, Response, DEFAULT_TIMEOUT,
    PROTOCOL_VERSION,
};
use crate::runtime::DaemonCommand;

/// Idle time before a quiet connection is dropped.
const CONNECTION_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared context for connection handlers.
pub struct ListenCtx {
    pub store: Arc<StateStore>,
    /// Names of the targets this daemon owns, for Status reads.
    pub targets: Vec<String>,
    pub command_tx: mpsc::Sender<DaemonCommand>,
}

pub struct Listener {
    listener: UnixListener,
    ctx: Arc<ListenCtx>,
}

impl Listener {
    pub fn new(listener: UnixListener, ctx: ListenCtx) -> Self {
        Self {
            listener,
            ctx: Arc::new(ctx),
        }
    }

    /// Accept loop; runs until the socket is torn down.
    pub async fn run(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, _addr)) => {
                    let ctx = Arc::clone(&self.ctx);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, ctx).await {
                            match e {
                                ProtocolError::ConnectionClosed | ProtocolError::Timeout => {
                                    debug!("connection ended: {e}");
                                }
                                other => warn!("connection error: {other}"),
                            }
                        }
                    });
                }
                Err(e) => {
                    // Accept failures are transient (fd pressure) or mean
                    // shutdown tore the socket down; either way keep going
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}

async fn handle_connection(
    mut stream: UnixStream,
    ctx: Arc<ListenCtx>,
) -> Result<(), ProtocolError> {
    loop {
        let request = read_request(&mut stream, CONNECTION_IDLE_TIMEOUT).await?;
        let response = respond(&request, &ctx).await;
        write_response(&mut stream, &response, DEFAULT_TIMEOUT).await?;

        if matches!(request, Request::Shutdown) {
            return Ok(());
        }
    }
}

async fn respond(request: &Request, ctx: &ListenCtx) -> Response {
    match request {
        Request::Ping => Response::Pong {
            version: PROTOCOL_VERSION.to_string(),
            pid: std::process::id(),
        },

        Request::Status => {
            let mut targets = serde_json::Map::new();
            for name in &ctx.targets {
                if let Some(state) = ctx.store.read(name) {
                    match serde_json::to_value(&state) {
                        Ok(value) => {
                            targets.insert(name.clone(), value);
                        }
                        Err(e) => warn!(target = %name, error = %e, "state not serializable"),
                    }
                }
            }
            Response::Status { targets }
        }

        Request::Queue => {
            let (reply_tx, reply_rx) = oneshot::channel();
            if ctx
                .command_tx
                .send(DaemonCommand::Queue { reply: reply_tx })
                .await
                .is_err()
            {
                return engine_gone();
            }
            match tokio::time::timeout(DEFAULT_TIMEOUT, reply_rx).await {
                Ok(Ok(snapshot)) => Response::Queue { snapshot },
                _ => engine_gone(),
            }
        }

        Request::Build { target, force } => {
            let (reply_tx, reply_rx) = oneshot::channel();
            let command = DaemonCommand::Build {
                target: target.clone(),
                force: *force,
                reply: reply_tx,
            };
            if ctx.command_tx.send(command).await.is_err() {
                return engine_gone();
            }
            match tokio::time::timeout(DEFAULT_TIMEOUT, reply_rx).await {
                Ok(Ok(outcome)) => match outcome {
                    polter_engine::ManualOutcome::Queued => Response::Ack,
                    polter_engine::ManualOutcome::Merged => Response::Merged,
                    polter_engine::ManualOutcome::Disabled => Response::Error {
                        message: format!("target '{target}' is disabled"),
                    },
                    polter_engine::ManualOutcome::UnknownTarget => Response::Error {
                        message: format!("unknown target '{target}'"),
                    },
                },
                _ => engine_gone(),
            }
        }

        Request::Shutdown => {
            let _ = ctx.command_tx.send(DaemonCommand::Shutdown).await;
            Response::Ack
        }
    }
}

fn engine_gone() -> Response {
    Response::Error {
        message: "daemon engine loop is not responding".to_string(),
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
