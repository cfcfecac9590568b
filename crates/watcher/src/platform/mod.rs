//! Platform-specific notification channels

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(target_os = "linux")]
pub use linux::InotifyChannel;
