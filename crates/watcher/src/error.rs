//! Error taxonomy for a watch run

use crate::event::DecodeError;
use nix::errno::Errno;
use std::io;
use thiserror::Error;

/// Everything that ends a watch run early
///
/// Setup and cleanup failures keep the name of the failing operation so the
/// diagnostic reads like `inotify_add_watch "/tmp/x": (0x2) - No such file or directory`.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("{op}: (0x{:x}) - {}", code(.errno), .errno.desc())]
    Setup { op: String, errno: Errno },

    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("read: (0x{:x}) - {}", code(.errno), .errno.desc())]
    Read { errno: Errno },

    #[error("{op}: (0x{:x}) - {}", code(.errno), .errno.desc())]
    Cleanup { op: String, errno: Errno },

    #[error("{op}: {source}")]
    Output {
        op: &'static str,
        #[source]
        source: io::Error,
    },
}

impl WatchError {
    pub fn setup(op: impl Into<String>, errno: Errno) -> Self {
        WatchError::Setup { op: op.into(), errno }
    }

    pub fn cleanup(op: impl Into<String>, errno: Errno) -> Self {
        WatchError::Cleanup { op: op.into(), errno }
    }

    pub(crate) fn output(source: io::Error) -> Self {
        WatchError::Output {
            op: "write stdout",
            source,
        }
    }

    /// Process exit status for this failure
    ///
    /// OS failures exit with their errno. A corrupt buffer has no errno of
    /// its own and exits with `EIO`.
    pub fn exit_code(&self) -> i32 {
        match self {
            WatchError::Setup { errno, .. }
            | WatchError::Read { errno }
            | WatchError::Cleanup { errno, .. } => code(errno),
            WatchError::Decode(_) => Errno::EIO as i32,
            WatchError::Output { source, .. } => source.raw_os_error().unwrap_or(1),
        }
    }
}

/// The errno behind an I/O error, `EIO` when it carries none
pub(crate) fn errno_of(err: &io::Error) -> Errno {
    match err.raw_os_error() {
        Some(raw) if raw != 0 => Errno::from_i32(raw),
        _ => Errno::EIO,
    }
}

fn code(errno: &Errno) -> i32 {
    *errno as i32
}
