//! Shared types for the Eclipse virtual display subsystem
//!
//! Data model and error taxonomy used by the driver controller, the display
//! resolver and the streaming device-id detector.

mod display;
mod error;
mod guid;
mod identity;

pub use display::*;
pub use error::*;
pub use guid::*;
pub use identity::*;

/// Hardware id shared by every instance of the virtual display driver family
pub const VDD_HARDWARE_ID: &str = r"Root\MttVDD";

/// Prefix the OS uses for display slot paths (`\\.\DISPLAYn`)
pub const DISPLAY_SLOT_PREFIX: &str = r"\\.\DISPLAY";
