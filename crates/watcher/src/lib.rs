//! Single-path inotify monitoring
//!
//! This crate provides:
//! - A safe decoder for the packed inotify record stream
//! - Text and JSON rendering of decoded records
//! - A blocking watch loop that stops cleanly on SIGINT/SIGTERM
//! - Guaranteed release of the watch and descriptor on every exit path

pub mod channel;
pub mod error;
pub mod event;
pub mod format;
pub mod platform;
pub mod session;
pub mod signal;
pub mod watch_loop;

pub use channel::{NotificationChannel, WatchId};
pub use error::WatchError;
pub use event::{DecodeError, EventMask, EventRecord};
pub use format::OutputFormat;
pub use session::Session;
pub use watch_loop::{LoopState, WatchLoop};

use event::MAX_RECORD_SIZE;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default read buffer capacity, in maximum-size records
pub const DEFAULT_BUFFER_RECORDS: usize = 10;

/// Tunables for a watch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Kinds to subscribe to
    pub mask: EventMask,
    /// Read buffer capacity, in maximum-size records
    pub buffer_records: usize,
    /// Event line rendering
    pub format: OutputFormat,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            mask: EventMask::WATCH_ALL,
            buffer_records: DEFAULT_BUFFER_RECORDS,
            format: OutputFormat::Text,
        }
    }
}

impl WatchOptions {
    /// Read buffer size in bytes
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_records.max(1) * MAX_RECORD_SIZE
    }
}

/// How a run ended
#[derive(Debug, Default)]
pub struct RunReport {
    /// Setup, read, decode or output failure that ended the run
    pub failure: Option<WatchError>,
    /// Release failures, detach before close
    pub cleanup_errors: Vec<WatchError>,
}

impl RunReport {
    /// 0 for a clean stop, otherwise the code of the run failure or of the
    /// first cleanup failure
    pub fn exit_code(&self) -> i32 {
        match (&self.failure, self.cleanup_errors.first()) {
            (Some(err), _) => err.exit_code(),
            (None, Some(err)) => err.exit_code(),
            (None, None) => 0,
        }
    }

    /// Every error, run failure first
    pub fn errors(&self) -> impl Iterator<Item = &WatchError> {
        self.failure.iter().chain(self.cleanup_errors.iter())
    }
}

/// Resolve the watch target once at startup; `.` becomes the working directory
pub fn resolve_target(path: &Path) -> Result<PathBuf, WatchError> {
    if path == Path::new(".") {
        std::env::current_dir().map_err(|err| WatchError::setup("getcwd", error::errno_of(&err)))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Watches one path and prints its events until stopped
pub struct Watcher {
    target: PathBuf,
    options: WatchOptions,
}

impl Watcher {
    pub fn new(target: PathBuf, options: WatchOptions) -> Self {
        Self { target, options }
    }

    /// Watch with inotify and the process-wide SIGINT/SIGTERM handlers
    #[cfg(target_os = "linux")]
    pub fn run<W: Write>(&self, out: W) -> RunReport {
        self.run_with(platform::InotifyChannel::open, signal::install, out)
    }

    /// Watch with a caller-supplied channel and signal setup
    ///
    /// Opens the channel, attaches the target, installs the signal handlers,
    /// prints the banner and runs the loop. Whatever was acquired is released
    /// before returning, whichever step failed.
    pub fn run_with<C, W>(
        &self,
        open: impl FnOnce() -> nix::Result<C>,
        install_signals: impl FnOnce() -> Result<(), WatchError>,
        out: W,
    ) -> RunReport
    where
        C: NotificationChannel,
        W: Write,
    {
        let channel = match open() {
            Ok(channel) => channel,
            Err(errno) => {
                return RunReport {
                    failure: Some(WatchError::setup("inotify_init", errno)),
                    cleanup_errors: Vec::new(),
                }
            }
        };
        info!(fd = channel.id(), "notification channel opened");

        let mut session = Session::new(channel, out);

        let setup = session
            .attach(&self.target, self.options.mask)
            .and_then(|_| install_signals())
            .and_then(|()| session.banner(&self.target));

        match setup {
            Ok(()) => {
                WatchLoop::new(&mut session, self.options.buffer_capacity(), self.options.format).run()
            }
            Err(err) => RunReport {
                failure: Some(err),
                cleanup_errors: session.release(),
            },
        }
    }
}
