//! swprog Protocol -- wire types and frame codec for the SWUpdate progress socket.
//!
//! The daemon writes one fixed-width binary record per progress update on a
//! Unix stream socket. There is no length prefix: the frame width itself is
//! the framing, and it must match the producer's build.

pub mod codec;
pub mod layout;
pub mod record;
pub mod status;

pub use codec::{decode, encode, ProgressCodec};
pub use layout::{ByteOrder, FrameLayout, DEFAULT_FRAME_WIDTH, RECORD_FIELDS_WIDTH};
pub use record::{ProgressEvent, ProgressRecord};
pub use status::{source_name, status_name, RecoveryStatus, SourceType, UNKNOWN_NAME};

/// File name of the progress socket inside the runtime directory.
pub const SOCKET_PROGRESS_DEFAULT: &str = "swupdateprog";

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("truncated record: need {needed} bytes, got {got}")]
    TruncatedRecord { needed: usize, got: usize },
    #[error("frame width {width} is smaller than the record fields ({min} bytes)")]
    LayoutTooSmall { width: usize, min: usize },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
