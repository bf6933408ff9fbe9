//! Socket session -- one connection attempt to the progress socket.
//!
//! State machine:
//!   Disconnected --connect()--> Connecting --established--> Connected
//!   Connecting --error--> Disconnected (ConnectionError)
//!   Connected --peer EOF--> Disconnected (PeerClosed)
//!   Connected --read error--> Disconnected (ConnectionError)
//!
//! The session never retries on its own; callers build a new one.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::StreamExt;
use swprog_protocol::{FrameLayout, ProgressCodec};
use tokio::net::UnixStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use crate::dispatch::{Dispatcher, SessionEvent, Subscriber};
use crate::endpoint::MAX_SOCKET_PATH;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid endpoint {path:?}: {reason}")]
    InvalidEndpoint { path: PathBuf, reason: &'static str },
    #[error("connect() needs a running tokio runtime")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub socket_path: PathBuf,
    pub layout: FrameLayout,
}

impl SessionConfig {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            layout: FrameLayout::DEFAULT,
        }
    }

    pub fn with_layout(mut self, layout: FrameLayout) -> Self {
        self.layout = layout;
        self
    }
}

type SharedDispatcher = Arc<Mutex<Dispatcher>>;

pub struct Session {
    config: SessionConfig,
    state: Arc<watch::Sender<SessionState>>,
    dispatcher: SharedDispatcher,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            config,
            state: Arc::new(state),
            dispatcher: Arc::new(Mutex::new(Dispatcher::new())),
            cancel: CancellationToken::new(),
            task: None,
        }
    }

    pub fn with_subscriber(config: SessionConfig, subscriber: impl Subscriber) -> Self {
        let session = Self::new(config);
        session.subscribe(subscriber);
        session
    }

    /// Register the subscriber, replacing any previous one.
    ///
    /// Must not be called from inside a subscriber callback.
    pub fn subscribe(&self, subscriber: impl Subscriber) -> bool {
        lock(&self.dispatcher).register(subscriber)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    /// Observe state transitions.
    pub fn watch_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Start connecting. Returns once the receive task is spawned; the outcome
    /// arrives as `Connected` or `ConnectionError` through the subscriber.
    pub fn connect(&mut self) -> Result<()> {
        let current = self.state();
        if current != SessionState::Disconnected {
            tracing::warn!(
                path = %self.config.socket_path.display(),
                state = ?current,
                "connect called on an active session, ignoring"
            );
            return Ok(());
        }

        validate_endpoint(&self.config.socket_path)?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SessionError::NoRuntime)?;

        if let Some(old) = self.task.take() {
            old.abort();
        }
        self.cancel = CancellationToken::new();

        self.state.send_replace(SessionState::Connecting);
        tracing::debug!(path = %self.config.socket_path.display(), "connecting to progress socket");

        let link = TaskLink {
            state: self.state.clone(),
            dispatcher: self.dispatcher.clone(),
            cancel: self.cancel.clone(),
        };
        self.task = Some(runtime.spawn(run_session(self.config.clone(), link)));
        Ok(())
    }

    /// Drop the connection. A partially received frame is discarded and no
    /// further events are delivered.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        {
            // Held across cancel so a publish in flight on another worker
            // either finishes first or sees the token.
            let _dispatcher = lock(&self.dispatcher);
            self.cancel.cancel();
            self.state.send_replace(SessionState::Disconnected);
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn validate_endpoint(path: &Path) -> Result<()> {
    let len = path.as_os_str().len();
    if len == 0 {
        return Err(SessionError::InvalidEndpoint {
            path: path.to_path_buf(),
            reason: "empty socket path",
        });
    }
    if len > MAX_SOCKET_PATH {
        return Err(SessionError::InvalidEndpoint {
            path: path.to_path_buf(),
            reason: "socket path longer than sun_path",
        });
    }
    Ok(())
}

fn lock(dispatcher: &SharedDispatcher) -> std::sync::MutexGuard<'_, Dispatcher> {
    dispatcher.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What the receive task shares with its session.
struct TaskLink {
    state: Arc<watch::Sender<SessionState>>,
    dispatcher: SharedDispatcher,
    cancel: CancellationToken,
}

impl TaskLink {
    /// Run `f` with the dispatcher locked, unless the session was closed.
    /// Returns false when closed; nothing is written or delivered then.
    fn publish(&self, f: impl FnOnce(&watch::Sender<SessionState>, &mut Dispatcher)) -> bool {
        let mut dispatcher = lock(&self.dispatcher);
        if self.cancel.is_cancelled() {
            return false;
        }
        f(&self.state, &mut dispatcher);
        true
    }

    fn end(&self, event: SessionEvent) {
        self.publish(|state, dispatcher| {
            state.send_replace(SessionState::Disconnected);
            dispatcher.notify(event);
        });
    }
}

/// Receive task: connect, then decode and dispatch frames until the stream ends.
async fn run_session(config: SessionConfig, link: TaskLink) {
    let path = config.socket_path.display().to_string();

    let connected = tokio::select! {
        _ = link.cancel.cancelled() => return,
        connected = UnixStream::connect(&config.socket_path) => connected,
    };
    let stream = match connected {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!(path = path.as_str(), error = %e, "cannot connect to progress socket");
            link.end(SessionEvent::connection_error(&e));
            return;
        }
    };

    let attached = link.publish(|state, dispatcher| {
        state.send_replace(SessionState::Connected);
        dispatcher.notify(SessionEvent::Connected);
    });
    if !attached {
        return;
    }
    tracing::info!(path = path.as_str(), width = config.layout.width(), "connected to progress socket");

    let mut frames = FramedRead::new(stream, ProgressCodec::new(config.layout));
    let failure = loop {
        let next = tokio::select! {
            _ = link.cancel.cancelled() => return,
            next = frames.next() => next,
        };
        match next {
            Some(Ok(record)) => {
                if !link.publish(|_, dispatcher| dispatcher.dispatch(record)) {
                    return;
                }
            }
            Some(Err(e)) => break Some(e),
            None => break None,
        }
    };

    match failure {
        None => {
            tracing::info!(path = path.as_str(), "progress socket closed by peer");
            link.end(SessionEvent::PeerClosed);
        }
        Some(e) => {
            tracing::warn!(path = path.as_str(), error = %e, "progress socket receive failed");
            let io = match e {
                swprog_protocol::ProtocolError::Io(io) => io,
                other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
            };
            link.end(SessionEvent::connection_error(&io));
        }
    }
}
