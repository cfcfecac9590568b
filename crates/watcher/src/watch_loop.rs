//! The blocking read/decode/print cycle
//!
//! ```text
//! INIT -> RUNNING -> STOPPING -> STOPPED
//!                \-> FAILED  --/
//! ```
//!
//! `run` leaves RUNNING on EINTR or a pending stop request (STOPPING), or on a
//! read or decode failure (FAILED). Either way the session is released before
//! the loop reaches STOPPED.

use crate::channel::NotificationChannel;
use crate::error::WatchError;
use crate::event;
use crate::format::OutputFormat;
use crate::session::Session;
use crate::signal;
use crate::RunReport;
use nix::errno::Errno;
use std::io::Write;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Running,
    Stopping,
    Failed,
    Stopped,
}

pub struct WatchLoop<'s, C: NotificationChannel, W: Write> {
    session: &'s mut Session<C, W>,
    buffer: Vec<u8>,
    format: OutputFormat,
    stop_check: fn() -> bool,
    state: LoopState,
}

impl<'s, C: NotificationChannel, W: Write> WatchLoop<'s, C, W> {
    /// `capacity` is the size of the read buffer in bytes
    pub fn new(session: &'s mut Session<C, W>, capacity: usize, format: OutputFormat) -> Self {
        Self {
            session,
            buffer: vec![0u8; capacity],
            format,
            stop_check: signal::stop_requested,
            state: LoopState::Init,
        }
    }

    /// Replace the pending-stop probe consulted before every read
    pub fn with_stop_check(mut self, stop_check: fn() -> bool) -> Self {
        self.stop_check = stop_check;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Run until stopped or failed, then release the session
    pub fn run(&mut self) -> RunReport {
        self.state = LoopState::Running;
        info!(fd = self.session.channel_id(), "watch loop running");

        let failure = match self.pump() {
            Ok(()) => {
                self.state = LoopState::Stopping;
                info!(signal = ?signal::received(), "stopping");
                None
            }
            Err(err) => {
                self.state = LoopState::Failed;
                debug!(%err, "watch loop failed");
                Some(err)
            }
        };

        let cleanup_errors = self.session.release();
        self.state = LoopState::Stopped;

        RunReport {
            failure,
            cleanup_errors,
        }
    }

    fn pump(&mut self) -> Result<(), WatchError> {
        let fd = self.session.channel_id();

        loop {
            if (self.stop_check)() {
                debug!("stop requested before read");
                return Ok(());
            }

            let n = match self.session.read(&mut self.buffer) {
                Ok(n) => n,
                Err(Errno::EINTR) => {
                    debug!("read interrupted");
                    return Ok(());
                }
                Err(errno) => return Err(WatchError::Read { errno }),
            };

            debug!(bytes = n, "read from notification channel");
            self.session
                .emit(format_args!("Read {} bytes from inotify file descriptor 0x{:x}.", n, fd))?;

            if n == 0 {
                continue;
            }

            for record in event::events(&self.buffer, n) {
                let record = record?;
                self.session.emit_bytes(&self.format.render(&record))?;
            }
        }
    }
}
