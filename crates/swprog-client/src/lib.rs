//! swprog Client -- attaches to the SWUpdate progress socket and forwards
//! decoded progress events to a single subscriber.
//!
//! One tokio task per session owns the socket and reassembles frames; the
//! dispatcher runs the subscriber inline on that task, in arrival order.

pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod monitor;
pub mod session;

pub use dispatch::{channel_subscriber, ChannelSubscriber, Dispatcher, SessionEvent, Subscriber};
pub use endpoint::{expand_tilde, resolve_socket_path};
pub use session::{Session, SessionConfig, SessionError, SessionState};
