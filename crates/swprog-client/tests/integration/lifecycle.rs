//! Session state machine against a live socket.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use swprog_client::{Session, SessionConfig, SessionEvent, SessionState};
use swprog_protocol::{encode, FrameLayout};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::harness::*;

async fn wait_for_state(session: &Session, want: SessionState) {
    let mut states = session.watch_state();
    tokio::time::timeout(EVENT_TIMEOUT, states.wait_for(|s| *s == want))
        .await
        .expect("timed out waiting for state")
        .unwrap();
}

#[tokio::test]
async fn test_connect_reaches_connected() {
    let daemon = FakeDaemon::start();
    let (mut session, mut rx) = daemon.session();
    assert_eq!(session.state(), SessionState::Disconnected);

    session.connect().unwrap();
    assert_ne!(session.state(), SessionState::Disconnected);

    let _conn = daemon.accept().await;
    expect_connected(&mut rx).await;
    assert!(session.is_connected());
}

/// A second connect while connected is ignored: no new socket, same state.
#[tokio::test]
async fn test_double_connect_is_ignored() {
    let daemon = FakeDaemon::start();
    let (mut session, mut rx) = daemon.session();
    session.connect().unwrap();
    let mut conn = daemon.accept().await;
    expect_connected(&mut rx).await;

    session.connect().unwrap();
    assert_eq!(session.state(), SessionState::Connected);
    assert!(daemon.try_accept().await.is_none());
    expect_silence(&mut rx).await;

    // The first connection keeps delivering.
    conn.send(&record(1, 0, "")).await;
    match next_event(&mut rx).await {
        SessionEvent::Progress(p) => assert_eq!(p.status_name, "START"),
        other => panic!("expected Progress, got {other:?}"),
    }
}

/// Orderly close by the daemon: exactly one PeerClosed, never a ConnectionError.
#[tokio::test]
async fn test_peer_close_reports_once() {
    let daemon = FakeDaemon::start();
    let (mut session, mut rx) = daemon.session();
    session.connect().unwrap();
    let conn = daemon.accept().await;
    expect_connected(&mut rx).await;

    drop(conn);

    match next_event(&mut rx).await {
        SessionEvent::PeerClosed => {}
        other => panic!("expected PeerClosed, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Disconnected);
    expect_silence(&mut rx).await;
}

#[tokio::test]
async fn test_missing_endpoint_reports_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let (sub, mut rx) = swprog_client::channel_subscriber();
    let mut session =
        Session::with_subscriber(SessionConfig::new(dir.path().join("swupdateprog")), sub);

    session.connect().unwrap();
    match next_event(&mut rx).await {
        SessionEvent::ConnectionError { kind, .. } => {
            assert_eq!(kind, std::io::ErrorKind::NotFound)
        }
        other => panic!("expected ConnectionError, got {other:?}"),
    }
    wait_for_state(&session, SessionState::Disconnected).await;
    expect_silence(&mut rx).await;
}

/// Closing the session drops the socket and stops delivery.
#[tokio::test]
async fn test_close_session_drops_socket() {
    let daemon = FakeDaemon::start();
    let (mut session, mut rx) = daemon.session();
    session.connect().unwrap();
    let conn = daemon.accept().await;
    expect_connected(&mut rx).await;

    session.close();

    let mut stream = conn.into_stream();
    let mut buf = [0u8; 16];
    let n = tokio::time::timeout(EVENT_TIMEOUT, stream.read(&mut buf))
        .await
        .expect("daemon side never saw the close")
        .unwrap();
    assert_eq!(n, 0);
}

/// Once close returns, nothing more is delivered and the state stays
/// Disconnected, even while the daemon keeps writing on another worker.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_close_stops_delivery_under_load() {
    let daemon = FakeDaemon::start();
    let delivered = Arc::new(AtomicUsize::new(0));
    let counter = delivered.clone();
    let mut session = Session::with_subscriber(
        SessionConfig::new(&daemon.path),
        move |event: SessionEvent| {
            if let SessionEvent::Progress(_) = event {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        },
    );
    let mut states = session.watch_state();
    session.connect().unwrap();

    let mut stream = daemon.accept().await.into_stream();
    let frame = encode(&FrameLayout::DEFAULT, &record(2, 1, "rootfs"));
    let writer = tokio::spawn(async move {
        while stream.write_all(&frame).await.is_ok() {}
    });

    tokio::time::timeout(EVENT_TIMEOUT, async {
        while delivered.load(Ordering::SeqCst) < 10 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("frames never arrived");
    session.close();
    let seen = delivered.load(Ordering::SeqCst);

    tokio::time::sleep(QUIET_PERIOD).await;
    assert_eq!(delivered.load(Ordering::SeqCst), seen);
    assert_eq!(*states.borrow_and_update(), SessionState::Disconnected);
    assert!(!states.has_changed().unwrap_or(false));

    tokio::time::timeout(EVENT_TIMEOUT, writer)
        .await
        .expect("writer never saw the close")
        .unwrap();
}

/// A fresh session attaches after the previous one was closed by the peer.
#[tokio::test]
async fn test_reconnect_with_new_session() {
    let daemon = FakeDaemon::start();

    let (mut first, mut rx) = daemon.session();
    first.connect().unwrap();
    drop(daemon.accept().await);
    expect_connected(&mut rx).await;
    assert!(matches!(next_event(&mut rx).await, SessionEvent::PeerClosed));
    drop(first);

    let (mut second, mut rx) = daemon.session();
    second.connect().unwrap();
    let mut conn = daemon.accept().await;
    expect_connected(&mut rx).await;
    conn.send(&record(2, 1, "rootfs")).await;
    assert!(matches!(next_event(&mut rx).await, SessionEvent::Progress(_)));

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(second.is_connected());
}
