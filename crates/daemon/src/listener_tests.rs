// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use polter_core::test_support::target_fixture;
use polter_engine::scheduler::QueueSnapshot;
use polter_engine::ManualOutcome;
use tempfile::TempDir;
use tokio::net::UnixStream;

use crate::protocol::{decode, encode, read_message, write_message};

struct ListenerHarness {
    _state_dir: TempDir,
    socket: std::path::PathBuf,
    command_rx: mpsc::Receiver<DaemonCommand>,
}

async fn listener_harness() -> ListenerHarness {
    let state_dir = TempDir::new().unwrap();
    let project = TempDir::new().unwrap();

    let store = Arc::new(
        StateStore::open_at(state_dir.path().to_path_buf(), project.path(), None).unwrap(),
    );
    store.init(&target_fixture("app")).unwrap();

    let socket = state_dir.path().join("test.sock");
    let unix_listener = UnixListener::bind(&socket).unwrap();
    let (command_tx, command_rx) = mpsc::channel(8);

    let listener = Listener::new(
        unix_listener,
        ListenCtx {
            store,
            targets: vec!["app".to_string()],
            command_tx,
        },
    );
    tokio::spawn(listener.run());

    ListenerHarness {
        _state_dir: state_dir,
        socket,
        command_rx,
    }
}

async fn roundtrip(stream: &mut UnixStream, request: &Request) -> Response {
    let data = encode(request).unwrap();
    write_message(stream, &data).await.unwrap();
    let bytes = read_message(stream).await.unwrap();
    decode(&bytes).unwrap()
}

#[tokio::test]
async fn ping_answers_with_version_and_pid() {
    let h = listener_harness().await;
    let mut stream = UnixStream::connect(&h.socket).await.unwrap();

    let response = roundtrip(&mut stream, &Request::Ping).await;
    match response {
        Response::Pong { version, pid } => {
            assert_eq!(pid, std::process::id());
            assert!(!version.is_empty());
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn status_returns_state_documents() {
    let h = listener_harness().await;
    let mut stream = UnixStream::connect(&h.socket).await.unwrap();

    let response = roundtrip(&mut stream, &Request::Status).await;
    match response {
        Response::Status { targets } => {
            assert!(targets.contains_key("app"));
            assert_eq!(targets["app"]["target"], "app");
            assert_eq!(targets["app"]["lastBuild"]["status"], "idle");
        }
        other => panic!("unexpected response: {other:?}"),
    }
}

#[tokio::test]
async fn build_request_reaches_the_engine_loop() {
    let mut h = listener_harness().await;
    let mut stream = UnixStream::connect(&h.socket).await.unwrap();

    // Answer the command like the engine loop would
    let responder = tokio::spawn(async move {
        match h.command_rx.recv().await {
            Some(DaemonCommand::Build { target, reply, .. }) => {
                assert_eq!(target, "app");
                let _ = reply.send(ManualOutcome::Queued);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        h.command_rx
    });

    let response = roundtrip(
        &mut stream,
        &Request::Build {
            target: "app".to_string(),
            force: false,
        },
    )
    .await;
    assert!(matches!(response, Response::Ack));
    responder.await.unwrap();
}

#[tokio::test]
async fn queue_request_returns_snapshot() {
    let mut h = listener_harness().await;
    let mut stream = UnixStream::connect(&h.socket).await.unwrap();

    let responder = tokio::spawn(async move {
        if let Some(DaemonCommand::Queue { reply }) = h.command_rx.recv().await {
            let _ = reply.send(QueueSnapshot::default());
        }
        h.command_rx
    });

    let response = roundtrip(&mut stream, &Request::Queue).await;
    match response {
        Response::Queue { snapshot } => {
            assert!(snapshot.running.is_empty());
        }
        other => panic!("unexpected response: {other:?}"),
    }
    responder.await.unwrap();
}

#[tokio::test]
async fn shutdown_acks_then_posts_command() {
    let mut h = listener_harness().await;
    let mut stream = UnixStream::connect(&h.socket).await.unwrap();

    let response = roundtrip(&mut stream, &Request::Shutdown).await;
    assert!(matches!(response, Response::Ack));

    let command = h.command_rx.recv().await;
    assert!(matches!(command, Some(DaemonCommand::Shutdown)));
}

#[tokio::test]
async fn multiple_requests_share_one_connection() {
    let h = listener_harness().await;
    let mut stream = UnixStream::connect(&h.socket).await.unwrap();

    for _ in 0..3 {
        let response = roundtrip(&mut stream, &Request::Ping).await;
        assert!(matches!(response, Response::Pong { .. }));
    }
}
