//! Linux inotify channel

use crate::channel::{NotificationChannel, WatchId};
use crate::event::EventMask;
use nix::errno::Errno;
use nix::unistd;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::RawFd;
use std::path::Path;
use tracing::{debug, warn};

/// An open inotify instance in blocking mode
///
/// The descriptor is closed by [`NotificationChannel::close`]; dropping an
/// instance that was never closed closes it as a last resort.
#[derive(Debug)]
pub struct InotifyChannel {
    fd: RawFd,
}

impl InotifyChannel {
    /// `inotify_init1(IN_CLOEXEC)`, without `IN_NONBLOCK`
    ///
    /// Reads block until a record arrives or a signal interrupts them.
    pub fn open() -> nix::Result<Self> {
        let fd = Errno::result(unsafe { libc::inotify_init1(libc::IN_CLOEXEC) })?;
        debug!(fd, "inotify instance opened");
        Ok(Self { fd })
    }
}

impl NotificationChannel for InotifyChannel {
    fn id(&self) -> i32 {
        self.fd
    }

    fn add_watch(&mut self, path: &Path, mask: EventMask) -> nix::Result<WatchId> {
        let path = CString::new(path.as_os_str().as_bytes()).map_err(|_| Errno::EINVAL)?;
        let wd = Errno::result(unsafe { libc::inotify_add_watch(self.fd, path.as_ptr(), mask.bits()) })?;
        Ok(WatchId(wd))
    }

    fn rm_watch(&mut self, wd: WatchId) -> nix::Result<()> {
        Errno::result(unsafe { libc::inotify_rm_watch(self.fd, wd.0) }).map(drop)
    }

    fn read(&mut self, buffer: &mut [u8]) -> nix::Result<usize> {
        unistd::read(self.fd, buffer)
    }

    fn close(&mut self) -> nix::Result<()> {
        if self.fd < 0 {
            return Ok(());
        }
        let fd = std::mem::replace(&mut self.fd, -1);
        unistd::close(fd)
    }
}

impl Drop for InotifyChannel {
    fn drop(&mut self) {
        if self.fd >= 0 {
            warn!(fd = self.fd, "inotify descriptor dropped without close");
            let _ = self.close();
        }
    }
}
