//! Display slot resolution and mode changes for Eclipse
//!
//! Maps the virtual display to the OS display slot used by the monitor
//! configuration tool (MultiMonitorTool), and applies resolution and refresh
//! rate changes to that slot.

pub mod enumeration;
mod resolver;

pub use resolver::*;

/// Adapter name fragments identifying a virtual display row
pub const DEFAULT_VIRTUAL_MARKERS: &[&str] =
    &["Mtt", "Virtual Display", "IddSample", "VDD by MTT"];

/// Lowest slot the positional fallback will pick; real primaries sit below it
pub const FALLBACK_MIN_SLOT: u32 = 2;
