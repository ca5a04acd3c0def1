//! Agent configuration
//!
//! One JSON document holding tool locations, driver constants and timing.
//! Missing fields fall back to defaults, so an empty `{}` is valid.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use device_detector::DetectorConfig;
use display_config::{DEFAULT_VIRTUAL_MARKERS, ResolverConfig};
use serde::{Deserialize, Serialize};
use tracing::info;
use vdd_driver::{ControllerConfig, IdentityStore, SettingsConfig};
use vdd_types::VDD_HARDWARE_ID;

const APP_DIR: &str = "Eclipse";
const CONFIG_FILE: &str = "agent.json";

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ToolPaths {
    pub devcon: PathBuf,
    pub multi_monitor_tool: PathBuf,
    /// Bound for every tool call, in seconds
    pub timeout_secs: u64,
}

impl Default for ToolPaths {
    fn default() -> Self {
        let tools = install_dir().join("tools");
        Self {
            devcon: tools.join("devcon.exe"),
            multi_monitor_tool: tools.join("MultiMonitorTool.exe"),
            timeout_secs: tool_runner::DEFAULT_TOOL_TIMEOUT_SECS,
        }
    }
}

/// Virtual display driver package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DriverSection {
    pub inf: PathBuf,
    pub hardware_id: String,
    pub install_timeout_secs: u64,
    pub registration_timeout_secs: u64,
    pub registration_poll_ms: u64,
    /// Bundled `vdd_settings.xml`
    pub settings_source: PathBuf,
    /// Locations the driver reads its settings from
    pub settings_targets: Vec<PathBuf>,
    /// Override for the identity file location
    pub identity_path: Option<PathBuf>,
    pub virtual_markers: Vec<String>,
}

impl Default for DriverSection {
    fn default() -> Self {
        let settings = SettingsConfig::default();
        Self {
            inf: install_dir().join("drivers").join("MttVDD.inf"),
            hardware_id: VDD_HARDWARE_ID.to_string(),
            install_timeout_secs: 120,
            registration_timeout_secs: 10,
            registration_poll_ms: 500,
            settings_source: install_dir().join(settings.source),
            settings_targets: settings.targets,
            identity_path: None,
            virtual_markers: DEFAULT_VIRTUAL_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// Streaming server collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StreamingSection {
    pub log_path: PathBuf,
    /// Windows service restarted before log scraping
    pub service_name: String,
    pub settle_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub pair_window: usize,
}

impl Default for StreamingSection {
    fn default() -> Self {
        let detector = DetectorConfig::default();
        Self {
            log_path: detector.log_path,
            service_name: "SunshineService".to_string(),
            settle_timeout_secs: detector.settle_timeout.as_secs(),
            poll_interval_ms: detector.poll_interval.as_millis() as u64,
            pair_window: detector.pair_window,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AgentConfig {
    pub tools: ToolPaths,
    pub driver: DriverSection,
    pub streaming: StreamingSection,
}

impl AgentConfig {
    /// `<config dir>/Eclipse/agent.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `path`, else the default location if it exists, else defaults
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path().filter(|p| p.is_file()) {
                Some(path) => path,
                None => {
                    info!("No config found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tools.timeout_secs)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            devcon_path: self.tools.devcon.clone(),
            driver_inf: self.driver.inf.clone(),
            hardware_id: self.driver.hardware_id.clone(),
            tool_timeout: self.tool_timeout(),
            install_timeout: Duration::from_secs(self.driver.install_timeout_secs),
            registration_timeout: Duration::from_secs(self.driver.registration_timeout_secs),
            registration_poll_interval: Duration::from_millis(self.driver.registration_poll_ms),
        }
    }

    pub fn settings_config(&self) -> SettingsConfig {
        SettingsConfig {
            source: self.driver.settings_source.clone(),
            targets: self.driver.settings_targets.clone(),
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            monitor_tool_path: self.tools.multi_monitor_tool.clone(),
            tool_timeout: self.tool_timeout(),
            virtual_markers: self.driver.virtual_markers.clone(),
        }
    }

    pub fn detector_config(&self) -> DetectorConfig {
        DetectorConfig {
            log_path: self.streaming.log_path.clone(),
            settle_timeout: Duration::from_secs(self.streaming.settle_timeout_secs),
            poll_interval: Duration::from_millis(self.streaming.poll_interval_ms),
            pair_window: self.streaming.pair_window,
        }
    }

    pub fn identity_store(&self) -> IdentityStore {
        let path = self
            .driver
            .identity_path
            .clone()
            .or_else(IdentityStore::default_path)
            .unwrap_or_else(|| install_dir().join("vdd_identity.json"));
        IdentityStore::new(path)
    }
}

/// Directory containing the agent executable
fn install_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
