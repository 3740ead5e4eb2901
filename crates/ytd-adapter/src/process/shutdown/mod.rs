//! Graceful process shutdown: SIGTERM with a grace period, then SIGKILL.

mod child;

pub use child::shutdown_child;
