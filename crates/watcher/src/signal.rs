//! SIGINT/SIGTERM bridge
//!
//! Handlers are installed without `SA_RESTART`, so a signal arriving while the
//! watch loop is blocked in `read` makes the read fail with `EINTR`. The
//! handler itself only records the signal number and writes a fixed message;
//! both are async-signal-safe.

use crate::error::WatchError;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use nix::unistd;
use std::os::fd::BorrowedFd;
use std::sync::atomic::{AtomicI32, Ordering};
use tracing::debug;

/// Written from the handler with a single `write(2)`
pub const MESSAGE: &[u8] = b"\nReceived signal.\n";

/// Signals that request a clean stop
pub const STOP_SIGNALS: [Signal; 2] = [Signal::SIGINT, Signal::SIGTERM];

static RECEIVED: AtomicI32 = AtomicI32::new(0);

// SAFETY: standard output stays open for the life of the process
const STDOUT: BorrowedFd<'static> = unsafe { BorrowedFd::borrow_raw(libc::STDOUT_FILENO) };

extern "C" fn handle_signal(signo: libc::c_int) {
    RECEIVED.store(signo, Ordering::SeqCst);
    let _ = unistd::write(STDOUT, MESSAGE);
}

/// Install the stop handler for SIGINT and SIGTERM
pub fn install() -> Result<(), WatchError> {
    let action = SigAction::new(
        SigHandler::Handler(handle_signal),
        SaFlags::empty(),
        SigSet::empty(),
    );

    for signal in STOP_SIGNALS {
        unsafe { sigaction(signal, &action) }
            .map_err(|errno| WatchError::setup(format!("sigaction {}", signal.as_str()), errno))?;
        debug!(signal = signal.as_str(), "stop handler installed");
    }

    Ok(())
}

/// Whether a stop signal has arrived since the handlers were installed
pub fn stop_requested() -> bool {
    RECEIVED.load(Ordering::SeqCst) != 0
}

/// The most recent stop signal, if any
pub fn received() -> Option<Signal> {
    match RECEIVED.load(Ordering::SeqCst) {
        0 => None,
        signo => Signal::try_from(signo).ok(),
    }
}
