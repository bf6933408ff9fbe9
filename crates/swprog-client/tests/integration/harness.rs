//! Test harness: an in-process stand-in for the SWUpdate progress socket.
//!
//! FakeDaemon listens on a Unix socket in a temp dir; DaemonConn writes raw
//! frames to one attached client.

use std::path::PathBuf;
use std::time::Duration;

use swprog_client::{channel_subscriber, Session, SessionConfig, SessionEvent};
use swprog_protocol::{encode, FrameLayout, ProgressRecord};
use tokio::io::AsyncWriteExt;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc::UnboundedReceiver;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

pub struct FakeDaemon {
    pub path: PathBuf,
    listener: UnixListener,
    _tempdir: tempfile::TempDir,
}

#[allow(dead_code)]
impl FakeDaemon {
    pub fn start() -> Self {
        let tempdir = tempfile::tempdir().unwrap();
        let path = tempdir.path().join("swupdateprog");
        let listener = UnixListener::bind(&path).unwrap();
        Self {
            path,
            listener,
            _tempdir: tempdir,
        }
    }

    pub async fn accept(&self) -> DaemonConn {
        let (stream, _addr) = tokio::time::timeout(EVENT_TIMEOUT, self.listener.accept())
            .await
            .expect("timed out waiting for client")
            .unwrap();
        DaemonConn { stream }
    }

    /// Accept with a short deadline; `None` when nobody connected.
    pub async fn try_accept(&self) -> Option<DaemonConn> {
        match tokio::time::timeout(QUIET_PERIOD, self.listener.accept()).await {
            Ok(Ok((stream, _))) => Some(DaemonConn { stream }),
            _ => None,
        }
    }

    /// Session attached to this daemon with a channel subscriber.
    pub fn session(&self) -> (Session, UnboundedReceiver<SessionEvent>) {
        let (sub, rx) = channel_subscriber();
        let session = Session::with_subscriber(SessionConfig::new(&self.path), sub);
        (session, rx)
    }
}

pub struct DaemonConn {
    stream: UnixStream,
}

#[allow(dead_code)]
impl DaemonConn {
    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
        self.stream.flush().await.unwrap();
    }

    pub async fn send(&mut self, record: &ProgressRecord) {
        let frame = encode(&FrameLayout::DEFAULT, record);
        self.send_raw(&frame).await;
    }

    pub fn into_stream(self) -> UnixStream {
        self.stream
    }
}

pub fn record(status: u32, step: u32, image: &str) -> ProgressRecord {
    ProgressRecord {
        magic: 0,
        status,
        dwl_percent: 100,
        dwl_bytes: [0, 4096, 0],
        nsteps: 3,
        cur_step: step,
        cur_percent: 10 * step,
        cur_image: image.into(),
        hnd_name: "raw".into(),
        source: 4,
        infolen: 0,
        info: String::new(),
    }
}

pub async fn next_event(rx: &mut UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for session event")
        .expect("event channel closed")
}

/// Assert nothing arrives for a short while.
pub async fn expect_silence(rx: &mut UnboundedReceiver<SessionEvent>) {
    if let Ok(Some(event)) = tokio::time::timeout(QUIET_PERIOD, rx.recv()).await {
        panic!("unexpected event: {event:?}");
    }
}

pub async fn expect_connected(rx: &mut UnboundedReceiver<SessionEvent>) {
    match next_event(rx).await {
        SessionEvent::Connected => {}
        other => panic!("expected Connected, got {other:?}"),
    }
}
