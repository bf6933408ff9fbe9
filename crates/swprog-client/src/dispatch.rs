//! Event dispatcher -- one subscriber slot per session.
//!
//! Every decoded frame is delivered exactly once, in decode order. Connection
//! lifecycle notifications travel the same path with their own variants, so a
//! `PeerClosed` can never be mistaken for a `DONE` record.

use serde::Serialize;
use swprog_protocol::{ProgressEvent, ProgressRecord};
use tokio::sync::mpsc;

/// What a subscriber receives.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// The socket is established; frames may follow.
    Connected,
    /// One decoded, enriched frame.
    Progress(ProgressEvent),
    /// The daemon closed its end in an orderly way.
    PeerClosed,
    /// Connect or receive failed. The session is disconnected.
    ConnectionError {
        #[serde(skip)]
        kind: std::io::ErrorKind,
        message: String,
    },
}

impl SessionEvent {
    pub fn connection_error(err: &std::io::Error) -> Self {
        SessionEvent::ConnectionError {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Receiver of session events. Runs inline on the session's receive task, so
/// it must not block for long.
pub trait Subscriber: Send + 'static {
    fn on_event(&mut self, event: SessionEvent);
}

impl<F> Subscriber for F
where
    F: FnMut(SessionEvent) + Send + 'static,
{
    fn on_event(&mut self, event: SessionEvent) {
        self(event)
    }
}

/// Hands events off to another task over an unbounded channel.
pub struct ChannelSubscriber(mpsc::UnboundedSender<SessionEvent>);

impl Subscriber for ChannelSubscriber {
    fn on_event(&mut self, event: SessionEvent) {
        if self.0.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}

/// Subscriber that forwards into a channel, plus the receiving end.
pub fn channel_subscriber() -> (ChannelSubscriber, mpsc::UnboundedReceiver<SessionEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSubscriber(tx), rx)
}

#[derive(Default)]
pub struct Dispatcher {
    subscriber: Option<Box<dyn Subscriber>>,
    delivered: u64,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscriber(subscriber: impl Subscriber) -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(subscriber);
        dispatcher
    }

    /// Fill the slot. An existing subscriber is replaced; returns whether one was.
    pub fn register(&mut self, subscriber: impl Subscriber) -> bool {
        let replaced = self.subscriber.replace(Box::new(subscriber)).is_some();
        if replaced {
            tracing::debug!("replaced existing progress subscriber");
        }
        replaced
    }

    pub fn unregister(&mut self) -> bool {
        self.subscriber.take().is_some()
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    /// Progress events delivered so far.
    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Enrich a decoded record and hand it to the subscriber.
    pub fn dispatch(&mut self, record: ProgressRecord) {
        let event = record.enrich();
        tracing::trace!(
            status = event.status_name.as_str(),
            step = event.cur_step,
            percent = event.cur_percent,
            "dispatching progress"
        );
        self.delivered += 1;
        self.notify(SessionEvent::Progress(event));
    }

    pub fn notify(&mut self, event: SessionEvent) {
        match self.subscriber.as_mut() {
            Some(subscriber) => subscriber.on_event(event),
            None => tracing::trace!(?event, "no subscriber registered, dropping event"),
        }
    }
}
