//! Collaborators injected into the detector

use async_trait::async_trait;
use display_config::DisplayResolver;
use vdd_types::VddResult;

/// Result reported by a restart callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestartOutcome {
    pub success: bool,
}

/// Restarts the streaming server so it re-enumerates its outputs
#[async_trait]
pub trait ServerRestarter: Send + Sync {
    async fn restart(&self) -> RestartOutcome;
}

/// Source of the physical display count logged before detection
#[async_trait]
pub trait DisplayCensus: Send + Sync {
    async fn physical_display_count(&self) -> VddResult<usize>;
}

#[async_trait]
impl DisplayCensus for DisplayResolver {
    async fn physical_display_count(&self) -> VddResult<usize> {
        self.count_physical_displays().await
    }
}
