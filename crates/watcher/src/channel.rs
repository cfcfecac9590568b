//! Notification channel abstraction
//!
//! The watch loop only needs five operations from the kernel facility. Keeping
//! them behind a trait lets the loop run against a scripted channel in tests.

use crate::event::EventMask;
use std::fmt;
use std::path::Path;

/// Watch descriptor returned when a path is attached to a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchId(pub i32);

impl fmt::LowerHex for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

/// Kernel handle producing packed event records
pub trait NotificationChannel {
    /// Descriptor number, for diagnostics
    fn id(&self) -> i32;

    /// Attach `path` and start reporting the kinds in `mask`
    fn add_watch(&mut self, path: &Path, mask: EventMask) -> nix::Result<WatchId>;

    /// Detach a previously attached watch
    fn rm_watch(&mut self, wd: WatchId) -> nix::Result<()>;

    /// Block until records are available and copy them into `buffer`
    fn read(&mut self, buffer: &mut [u8]) -> nix::Result<usize>;

    /// Release the handle
    fn close(&mut self) -> nix::Result<()>;
}
