//! External tool invocation for Eclipse
//!
//! Every device-console and monitor-tool call goes through [`ToolRunner`]:
//! output is always captured, exit codes are reported but never trusted, and
//! each invocation is bounded by a timeout.

mod error;
pub mod mock;
mod process;
mod traits;

pub use error::*;
pub use process::*;
pub use traits::*;

/// Default bound for a single external tool invocation
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 30;
