//! Streaming server restart through the Windows service manager

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use device_detector::{RestartOutcome, ServerRestarter};
use tool_runner::{ToolInvocation, ToolRunner};
use tracing::{debug, info, warn};

const SERVICE_TIMEOUT: Duration = Duration::from_secs(60);

/// Stops and starts the streaming server service with `net`
pub struct ServiceRestarter {
    runner: Arc<dyn ToolRunner>,
    service_name: String,
}

impl ServiceRestarter {
    pub fn new(runner: Arc<dyn ToolRunner>, service_name: impl Into<String>) -> Self {
        Self {
            runner,
            service_name: service_name.into(),
        }
    }

    async fn net(&self, verb: &str) -> Option<String> {
        let invocation = ToolInvocation::new("net")
            .arg(verb)
            .arg(&self.service_name)
            .timeout(SERVICE_TIMEOUT);

        match self.runner.run(&invocation).await {
            Ok(output) => Some(output.text().to_lowercase()),
            Err(e) => {
                warn!("net {} {} failed: {}", verb, self.service_name, e);
                None
            }
        }
    }
}

#[async_trait]
impl ServerRestarter for ServiceRestarter {
    async fn restart(&self) -> RestartOutcome {
        // A stopped service reports "not started"; starting it is still a restart
        if let Some(text) = self.net("stop").await {
            debug!("net stop: {}", text.trim());
        }

        let success = match self.net("start").await {
            Some(text) => {
                text.contains("started successfully") || text.contains("already been started")
            }
            None => false,
        };

        if success {
            info!("Restarted {}", self.service_name);
        } else {
            warn!("Could not restart {}", self.service_name);
        }
        RestartOutcome { success }
    }
}
