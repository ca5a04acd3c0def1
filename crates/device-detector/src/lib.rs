//! Streaming server device-id detection for Eclipse
//!
//! The streaming server selects its capture output by its own device id,
//! which differs from the OS GUID. The only place that id is exposed is the
//! server log written after a restart, so detection briefly enables the
//! virtual display, restarts the server and scrapes the log.

mod detector;
pub mod log_scan;
mod traits;

pub use detector::*;
pub use traits::*;
