//! Virtual display trait abstraction

use async_trait::async_trait;
use vdd_types::{DriverStatus, VddResult};

use crate::DriverController;

/// Enable/disable/status surface consumed by the resolver and detector
#[async_trait]
pub trait VirtualDisplay: Send + Sync {
    /// Turn the owned virtual display on
    async fn enable(&self) -> VddResult<()>;

    /// Turn the owned virtual display off
    async fn disable(&self) -> VddResult<()>;

    /// Current status; never fails
    async fn status(&self) -> DriverStatus;
}

#[async_trait]
impl VirtualDisplay for DriverController {
    async fn enable(&self) -> VddResult<()> {
        DriverController::enable(self).await
    }

    async fn disable(&self) -> VddResult<()> {
        DriverController::disable(self).await
    }

    async fn status(&self) -> DriverStatus {
        DriverController::status(self).await
    }
}
