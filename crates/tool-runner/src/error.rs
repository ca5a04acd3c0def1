//! Tool invocation error types

use std::time::Duration;

use thiserror::Error;
use vdd_types::VddError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} did not finish within {after:?}")]
    Timeout { program: String, after: Duration },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type ToolResult<T> = Result<T, ToolError>;

impl From<ToolError> for VddError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::Timeout { program, after } => VddError::Timeout {
                what: program,
                after,
            },
            other => VddError::ToolInvocation(other.to_string()),
        }
    }
}
