//! Error taxonomy for the virtual display subsystem

use std::time::Duration;

use thiserror::Error;

/// Virtual display error
///
/// Every public operation reports failure through this type; nothing in the
/// subsystem panics on external tool or file-system errors.
#[derive(Debug, Error)]
pub enum VddError {
    #[error("No virtual display instance is installed")]
    NotInstalled,

    #[error("Virtual display instance {0} was removed externally")]
    Removed(String),

    #[error("Install did not produce a new virtual display instance")]
    InstallFailed,

    #[error("Tool invocation failed: {0}")]
    ToolInvocation(String),

    #[error("Unexpected tool output: {0}")]
    Parse(String),

    #[error("Virtual display must be enabled")]
    MustBeEnabled,

    #[error("Timed out after {after:?}: {what}")]
    Timeout { what: String, after: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VddError {
    /// Stable machine-readable code reported to callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotInstalled => "notInstalled",
            Self::Removed(_) => "removed",
            Self::InstallFailed => "installFailed",
            Self::ToolInvocation(_) => "toolInvocationFailure",
            Self::Parse(_) => "parseFailure",
            Self::MustBeEnabled => "mustBeEnabled",
            Self::Timeout { .. } => "timeout",
            Self::Io(_) => "io",
        }
    }
}

/// Result type alias for virtual display operations
pub type VddResult<T> = Result<T, VddError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(VddError::NotInstalled.code(), "notInstalled");
        assert_eq!(VddError::Removed(r"ROOT\DISPLAY\0001".into()).code(), "removed");
        assert_eq!(VddError::MustBeEnabled.code(), "mustBeEnabled");
        assert_eq!(
            VddError::Timeout {
                what: "devcon".into(),
                after: Duration::from_secs(1)
            }
            .code(),
            "timeout"
        );
    }
}
