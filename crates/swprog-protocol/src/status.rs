//! Status vocabulary -- symbolic names for the status and source ordinals.
//!
//! Discriminants are the wire ordinals. Both enums are append-only: the
//! daemon's C enums forbid reordering, and so does every deployed consumer.

use serde::{Deserialize, Serialize};

/// Name returned for ordinals outside the known range.
pub const UNKNOWN_NAME: &str = "UNKNOWN";

/// Update status reported by the daemon (`RECOVERY_STATUS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u32)]
pub enum RecoveryStatus {
    Idle = 0,
    Start = 1,
    Run = 2,
    Success = 3,
    Failure = 4,
    Download = 5,
    Done = 6,
    Subprogress = 7,
    Progress = 8,
}

impl RecoveryStatus {
    pub const ALL: [RecoveryStatus; 9] = [
        RecoveryStatus::Idle,
        RecoveryStatus::Start,
        RecoveryStatus::Run,
        RecoveryStatus::Success,
        RecoveryStatus::Failure,
        RecoveryStatus::Download,
        RecoveryStatus::Done,
        RecoveryStatus::Subprogress,
        RecoveryStatus::Progress,
    ];

    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        match ordinal {
            0 => Some(RecoveryStatus::Idle),
            1 => Some(RecoveryStatus::Start),
            2 => Some(RecoveryStatus::Run),
            3 => Some(RecoveryStatus::Success),
            4 => Some(RecoveryStatus::Failure),
            5 => Some(RecoveryStatus::Download),
            6 => Some(RecoveryStatus::Done),
            7 => Some(RecoveryStatus::Subprogress),
            8 => Some(RecoveryStatus::Progress),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryStatus::Idle => "IDLE",
            RecoveryStatus::Start => "START",
            RecoveryStatus::Run => "RUN",
            RecoveryStatus::Success => "SUCCESS",
            RecoveryStatus::Failure => "FAILURE",
            RecoveryStatus::Download => "DOWNLOAD",
            RecoveryStatus::Done => "DONE",
            RecoveryStatus::Subprogress => "SUBPROGRESS",
            RecoveryStatus::Progress => "PROGRESS",
        }
    }

    /// SUCCESS and FAILURE close an update run.
    pub fn is_terminal(self) -> bool {
        matches!(self, RecoveryStatus::Success | RecoveryStatus::Failure)
    }
}

/// Interface that triggered the update (`sourcetype`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[repr(u32)]
pub enum SourceType {
    Unknown = 0,
    Webserver = 1,
    Suricatta = 2,
    Downloader = 3,
    Local = 4,
    ChunksDownloader = 5,
}

impl SourceType {
    pub fn from_ordinal(ordinal: u32) -> Option<Self> {
        match ordinal {
            0 => Some(SourceType::Unknown),
            1 => Some(SourceType::Webserver),
            2 => Some(SourceType::Suricatta),
            3 => Some(SourceType::Downloader),
            4 => Some(SourceType::Local),
            5 => Some(SourceType::ChunksDownloader),
            _ => None,
        }
    }

    pub fn ordinal(self) -> u32 {
        self as u32
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Unknown => "UNKNOWN",
            SourceType::Webserver => "WEBSERVER",
            SourceType::Suricatta => "SURICATTA",
            SourceType::Downloader => "DOWNLOADER",
            SourceType::Local => "LOCAL",
            SourceType::ChunksDownloader => "CHUNKS_DOWNLOADER",
        }
    }
}

/// Symbolic name for a status ordinal, `"UNKNOWN"` when out of range.
pub fn status_name(ordinal: u32) -> &'static str {
    RecoveryStatus::from_ordinal(ordinal).map_or(UNKNOWN_NAME, RecoveryStatus::as_str)
}

/// Symbolic name for a source ordinal, `"UNKNOWN"` when out of range.
pub fn source_name(ordinal: u32) -> &'static str {
    SourceType::from_ordinal(ordinal).map_or(UNKNOWN_NAME, SourceType::as_str)
}
