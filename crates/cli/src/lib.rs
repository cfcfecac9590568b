//! Library half of the `pathwatch` binary

pub mod config;
pub mod logging;
