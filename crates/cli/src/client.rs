// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC client for a project's daemon.
//!
//! One short-lived connection per request keeps the client trivially
//! correct; the daemon serves each connection on its own task.

use polter_daemon::protocol::{
    decode, encode, read_message, write_message, ProtocolError, Request, Response,
    DEFAULT_TIMEOUT,
};
use polter_state::{DaemonInfo, ProjectPaths};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("no daemon is running for this project")]
    NotRunning,

    #[error("daemon error: {0}")]
    Daemon(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client bound to one project's socket.
pub struct DaemonClient {
    socket_path: PathBuf,
    info_path: PathBuf,
}

impl DaemonClient {
    pub fn for_project(project_root: &Path) -> Self {
        let paths = ProjectPaths::for_project(project_root);
        Self {
            socket_path: paths.socket_file(),
            info_path: paths.daemon_info_file(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// The daemon info record, only when its process is live.
    pub fn live_info(&self) -> Option<DaemonInfo> {
        DaemonInfo::read_live(&self.info_path)
    }

    /// Send one request and await its response.
    pub async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|_| ClientError::NotRunning)?;

        let data = encode(request)?;
        tokio::time::timeout(DEFAULT_TIMEOUT, write_message(&mut stream, &data))
            .await
            .map_err(|_| ProtocolError::Timeout)??;

        let bytes = tokio::time::timeout(DEFAULT_TIMEOUT, read_message(&mut stream))
            .await
            .map_err(|_| ProtocolError::Timeout)??;
        Ok(decode(&bytes)?)
    }

    /// Ping; Ok(version) when a daemon answers.
    pub async fn ping(&self) -> Result<String, ClientError> {
        match self.request(&Request::Ping).await? {
            Response::Pong { version, .. } => Ok(version),
            Response::Error { message } => Err(ClientError::Daemon(message)),
            _ => Err(ClientError::Daemon("unexpected response to ping".to_string())),
        }
    }

    /// Full state map for the project's targets.
    pub async fn status(
        &self,
    ) -> Result<serde_json::Map<String, serde_json::Value>, ClientError> {
        match self.request(&Request::Status).await? {
            Response::Status { targets } => Ok(targets),
            Response::Error { message } => Err(ClientError::Daemon(message)),
            _ => Err(ClientError::Daemon("unexpected response to status".to_string())),
        }
    }

    /// Admit a build; Ok(true) when queued, Ok(false) when merged into a
    /// running build's follow-up.
    pub async fn build(&self, target: &str, force: bool) -> Result<bool, ClientError> {
        let request = Request::Build {
            target: target.to_string(),
            force,
        };
        match self.request(&request).await? {
            Response::Ack => Ok(true),
            Response::Merged => Ok(false),
            Response::Error { message } => Err(ClientError::Daemon(message)),
            _ => Err(ClientError::Daemon("unexpected response to build".to_string())),
        }
    }

    /// Scheduler introspection.
    pub async fn queue(&self) -> Result<polter_engine::scheduler::QueueSnapshot, ClientError> {
        match self.request(&Request::Queue).await? {
            Response::Queue { snapshot } => Ok(snapshot),
            Response::Error { message } => Err(ClientError::Daemon(message)),
            _ => Err(ClientError::Daemon("unexpected response to queue".to_string())),
        }
    }

    /// Request a graceful shutdown.
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.request(&Request::Shutdown).await? {
            Response::Ack => Ok(()),
            Response::Error { message } => Err(ClientError::Daemon(message)),
            _ => Err(ClientError::Daemon("unexpected response to shutdown".to_string())),
        }
    }
}
