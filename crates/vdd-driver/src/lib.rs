//! Virtual display driver lifecycle for Eclipse
//!
//! Owns exactly one instance of the virtual display driver family:
//! - `identity`: persisted record of which OS instance is ours
//! - `settings`: copies the driver settings file into place
//! - `devcon`: device console command lines and output parsing
//! - `controller`: install / enable / disable / status
//! - `traits`: the enable/disable/status seam used by other components

mod controller;
pub mod devcon;
mod identity;
mod settings;
mod traits;

pub use controller::*;
pub use identity::*;
pub use settings::*;
pub use traits::*;
