//! Ownership of the notification handle and its watch registration
//!
//! A `Session` holds both resources and releases them in reverse order of
//! acquisition exactly once, either through [`Session::release`] or, as a
//! backstop, when it is dropped.

use crate::channel::{NotificationChannel, WatchId};
use crate::error::WatchError;
use crate::event::EventMask;
use std::fmt::Display;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, warn};

pub struct Session<C: NotificationChannel, W: Write> {
    channel: C,
    out: W,
    watch: Option<WatchId>,
    open: bool,
}

impl<C: NotificationChannel, W: Write> Session<C, W> {
    /// Take ownership of an already opened channel
    pub fn new(channel: C, out: W) -> Self {
        Self {
            channel,
            out,
            watch: None,
            open: true,
        }
    }

    /// Register `target` with the channel
    pub fn attach(&mut self, target: &Path, mask: EventMask) -> Result<WatchId, WatchError> {
        let wd = self.channel.add_watch(target, mask).map_err(|errno| {
            WatchError::setup(format!("inotify_add_watch \"{}\"", target.display()), errno)
        })?;
        info!(wd = wd.0, path = %target.display(), "watch attached");
        self.watch = Some(wd);
        Ok(wd)
    }

    pub fn channel_id(&self) -> i32 {
        self.channel.id()
    }

    pub fn watch_id(&self) -> Option<WatchId> {
        self.watch
    }

    /// Print the startup line
    pub fn banner(&mut self, target: &Path) -> Result<(), WatchError> {
        let wd = self.watch.map_or(-1, |wd| wd.0);
        let fd = self.channel.id();
        self.emit(format_args!(
            "PID {} monitoring \"{}\" with inotify file descriptor 0x{:x} and inotify watch descriptor 0x{:x}.",
            std::process::id(),
            target.display(),
            fd,
            wd
        ))
    }

    /// Blocking read from the channel
    pub fn read(&mut self, buffer: &mut [u8]) -> nix::Result<usize> {
        self.channel.read(buffer)
    }

    /// Write one line to the output
    pub fn emit(&mut self, line: impl Display) -> Result<(), WatchError> {
        writeln!(self.out, "{}", line).map_err(WatchError::output)
    }

    /// Write one line of raw bytes to the output
    pub fn emit_bytes(&mut self, line: &[u8]) -> Result<(), WatchError> {
        self.out
            .write_all(line)
            .and_then(|()| self.out.write_all(b"\n"))
            .map_err(WatchError::output)
    }

    /// Detach the watch, then close the channel
    ///
    /// Both steps are attempted even if the first fails. Returns every
    /// failure in the order it happened; calling again is a no-op.
    pub fn release(&mut self) -> Vec<WatchError> {
        let mut errors = Vec::new();

        if let Some(wd) = self.watch.take() {
            self.note(format_args!("Closing inotify watch descriptor 0x{:x}.", wd));
            if let Err(errno) = self.channel.rm_watch(wd) {
                errors.push(WatchError::cleanup(format!("inotify_rm_watch 0x{:x}", wd), errno));
            }
        }

        if self.open {
            self.open = false;
            let fd = self.channel.id();
            self.note(format_args!("Closing inotify file descriptor 0x{:x}.", fd));
            if let Err(errno) = self.channel.close() {
                errors.push(WatchError::cleanup(format!("close 0x{:x}", fd), errno));
            }
        }

        for err in &errors {
            debug!(%err, "cleanup failed");
        }
        errors
    }

    /// Whether the handle has not been released yet
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// The output sink
    pub fn output(&self) -> &W {
        &self.out
    }

    fn note(&mut self, line: impl Display) {
        if let Err(err) = self.emit(line) {
            warn!(%err, "failed to write cleanup notice");
        }
    }
}

impl<C: NotificationChannel, W: Write> Drop for Session<C, W> {
    fn drop(&mut self) {
        if self.open || self.watch.is_some() {
            warn!("session dropped before release");
            self.release();
        }
    }
}
