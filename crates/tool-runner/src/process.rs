//! Child-process tool runner

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{ToolError, ToolInvocation, ToolOutput, ToolResult, ToolRunner};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Runs tools as child processes with a per-invocation timeout
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> ToolResult<ToolOutput> {
        debug!("Running {}", invocation.display());

        let mut command = Command::new(&invocation.program);
        command
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let child = command.spawn().map_err(|source| ToolError::Spawn {
            program: invocation.program_name(),
            source,
        })?;

        // Dropping the child on timeout kills it (kill_on_drop)
        let output = match tokio::time::timeout(invocation.timeout, child.wait_with_output()).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    "{} timed out after {:?}",
                    invocation.program_name(),
                    invocation.timeout
                );
                return Err(ToolError::Timeout {
                    program: invocation.program_name(),
                    after: invocation.timeout,
                });
            }
        };

        let output = ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        };

        debug!(
            "{} exited with {:?} ({} bytes stdout, {} bytes stderr)",
            invocation.program_name(),
            output.exit_code,
            output.stdout.len(),
            output.stderr.len()
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let runner = ProcessRunner::new();
        let invocation = ToolInvocation::new("definitely-not-a-real-tool-eclipse");
        let err = runner.run(&invocation).await.unwrap_err();
        assert!(matches!(err, ToolError::Spawn { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_still_captures_output() {
        let runner = ProcessRunner::new();
        let invocation = ToolInvocation::new("sh")
            .arg("-c")
            .arg("echo partial; echo oops 1>&2; exit 3");
        let output = runner.run(&invocation).await.unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(output.text().contains("partial"));
        assert!(output.text().contains("oops"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_is_reported() {
        let runner = ProcessRunner::new();
        let invocation = ToolInvocation::new("sleep")
            .arg("5")
            .timeout(std::time::Duration::from_millis(100));
        let err = runner.run(&invocation).await.unwrap_err();
        assert!(matches!(err, ToolError::Timeout { .. }));
    }
}
