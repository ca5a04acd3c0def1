//! Application state: the wired-up subsystem

use std::sync::Arc;

use device_detector::DeviceIdDetector;
use display_config::DisplayResolver;
use tool_runner::{ProcessRunner, ToolRunner};
use vdd_driver::{DriverController, SettingsPropagator};

use crate::config::AgentConfig;
use crate::restart::ServiceRestarter;

/// Application-wide state
pub struct AppState {
    pub controller: Arc<DriverController>,
    pub resolver: Arc<DisplayResolver>,
    pub detector: DeviceIdDetector,
    pub settings: SettingsPropagator,
}

impl AppState {
    pub fn new(config: &AgentConfig) -> Self {
        Self::with_runner(config, Arc::new(ProcessRunner::new()))
    }

    /// Build every component on top of one tool runner
    pub fn with_runner(config: &AgentConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let settings = SettingsPropagator::new(config.settings_config());

        let controller = Arc::new(DriverController::new(
            config.controller_config(),
            runner.clone(),
            config.identity_store(),
            settings.clone(),
        ));

        let resolver = Arc::new(DisplayResolver::new(
            config.resolver_config(),
            runner.clone(),
            controller.clone(),
        ));

        let restarter = Arc::new(ServiceRestarter::new(
            runner,
            config.streaming.service_name.clone(),
        ));
        let detector = DeviceIdDetector::new(config.detector_config(), controller.clone())
            .with_restarter(restarter)
            .with_census(resolver.clone());

        Self {
            controller,
            resolver,
            detector,
            settings,
        }
    }
}
