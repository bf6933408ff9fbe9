//! Progress socket location.
//!
//! Without an explicit path the daemon listens in its runtime directory:
//! `$RUNTIME_DIRECTORY`, then `$TMPDIR`, then `/run/swupdate` when writable,
//! then `/tmp`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use swprog_protocol::SOCKET_PROGRESS_DEFAULT;

/// `sun_path` holds 108 bytes including the terminating NUL.
pub const MAX_SOCKET_PATH: usize = 107;

const RUN_DIR: &str = "/run/swupdate";

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME").map(PathBuf::from) {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Resolve the progress socket: a configured, non-empty path wins, otherwise
/// the daemon's default location is derived from the environment.
pub fn resolve_socket_path(configured: Option<&str>) -> PathBuf {
    match configured {
        Some(path) if !path.is_empty() => expand_tilde(path),
        _ => default_socket_dir(
            std::env::var_os("RUNTIME_DIRECTORY"),
            std::env::var_os("TMPDIR"),
            dir_is_writable(Path::new(RUN_DIR)),
        )
        .join(SOCKET_PROGRESS_DEFAULT),
    }
}

fn default_socket_dir(
    runtime_dir: Option<OsString>,
    tmpdir: Option<OsString>,
    run_dir_writable: bool,
) -> PathBuf {
    if let Some(dir) = runtime_dir.or(tmpdir) {
        return PathBuf::from(dir);
    }
    if run_dir_writable {
        PathBuf::from(RUN_DIR)
    } else {
        PathBuf::from("/tmp")
    }
}

fn dir_is_writable(dir: &Path) -> bool {
    std::fs::metadata(dir)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false)
}
