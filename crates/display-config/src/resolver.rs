//! Display resolution resolver

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tool_runner::{DEFAULT_TOOL_TIMEOUT_SECS, ToolInvocation, ToolRunner};
use tracing::{debug, info, warn};
use vdd_driver::VirtualDisplay;
use vdd_types::{
    DisplayResolution, DisplaySettings, DisplaySlot, RefreshRate, VddError, VddResult,
};

use crate::DEFAULT_VIRTUAL_MARKERS;
use crate::enumeration::MonitorExport;

const EXPORT_FILE: &str = "monitors.csv";

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Path to MultiMonitorTool.exe
    pub monitor_tool_path: PathBuf,
    pub tool_timeout: Duration,
    /// Adapter name fragments identifying the virtual display
    pub virtual_markers: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            monitor_tool_path: PathBuf::from("MultiMonitorTool.exe"),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            virtual_markers: DEFAULT_VIRTUAL_MARKERS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }
}

/// `Name=<slot path> Width=<w> Height=<h> DisplayFrequency=<hz>`
pub fn monitor_config_string(
    slot: DisplaySlot,
    resolution: DisplayResolution,
    refresh: RefreshRate,
) -> String {
    format!(
        "Name={} Width={} Height={} DisplayFrequency={}",
        slot.path(),
        resolution.width,
        resolution.height,
        refresh.hz()
    )
}

/// Maps the virtual display to an OS slot and changes its mode
pub struct DisplayResolver {
    config: ResolverConfig,
    runner: Arc<dyn ToolRunner>,
    display: Arc<dyn VirtualDisplay>,
}

impl DisplayResolver {
    pub fn new(
        config: ResolverConfig,
        runner: Arc<dyn ToolRunner>,
        display: Arc<dyn VirtualDisplay>,
    ) -> Self {
        Self {
            config,
            runner,
            display,
        }
    }

    /// Slot number of the virtual display, from a fresh export
    pub async fn resolve_slot(&self) -> VddResult<DisplaySlot> {
        let export = self.export().await?;
        let slot = export
            .virtual_slot(&self.config.virtual_markers)
            .ok_or_else(|| VddError::Parse("no virtual display slot in export".into()))?;
        debug!("Virtual display resolved to slot {}", slot);
        Ok(slot)
    }

    /// Apply a mode; the virtual display must be enabled
    pub async fn set_resolution(
        &self,
        resolution: DisplayResolution,
        refresh: RefreshRate,
    ) -> VddResult<DisplaySlot> {
        if !self.display.status().await.is_enabled() {
            return Err(VddError::MustBeEnabled);
        }
        self.apply(resolution, refresh).await
    }

    /// Apply a mode without checking the enabled state
    ///
    /// Used for switching presets while streaming, where a disable/enable
    /// cycle would make the server re-detect its output. The caller
    /// guarantees the display is enabled.
    pub async fn update_config(
        &self,
        resolution: DisplayResolution,
        refresh: RefreshRate,
    ) -> VddResult<DisplaySlot> {
        self.apply(resolution, refresh).await
    }

    /// Mode currently reported for the virtual display
    pub async fn current_settings(&self) -> Option<DisplaySettings> {
        let export = match self.export().await {
            Ok(export) => export,
            Err(e) => {
                warn!("Monitor export failed: {}", e);
                return None;
            }
        };

        let settings = export
            .virtual_row(&self.config.virtual_markers)?
            .settings(export.frequency_column);
        debug!("Current virtual display settings: {:?}", settings);
        settings
    }

    /// Number of attached displays that are not virtual
    pub async fn count_physical_displays(&self) -> VddResult<usize> {
        let export = self.export().await?;
        Ok(export.physical_count(&self.config.virtual_markers))
    }

    async fn apply(
        &self,
        resolution: DisplayResolution,
        refresh: RefreshRate,
    ) -> VddResult<DisplaySlot> {
        let slot = self.resolve_slot().await?;
        let config = monitor_config_string(slot, resolution, refresh);

        let invocation = ToolInvocation::new(&self.config.monitor_tool_path)
            .arg("/SetMonitors")
            .arg(config)
            .timeout(self.config.tool_timeout);
        let output = self.runner.run(&invocation).await?;

        let text = output.text();
        if !text.trim().is_empty() {
            debug!("SetMonitors output: {}", text.trim());
        }
        info!("Set slot {} to {} @ {} Hz", slot, resolution, refresh.hz());
        Ok(slot)
    }

    /// Export the current display set into a private temp directory
    async fn export(&self) -> VddResult<MonitorExport> {
        let dir = tempfile::Builder::new().prefix("eclipse-monitors-").tempdir()?;
        let path = dir.path().join(EXPORT_FILE);

        let invocation = ToolInvocation::new(&self.config.monitor_tool_path)
            .arg("/scomma")
            .arg(path.display().to_string())
            .timeout(self.config.tool_timeout);
        self.runner.run(&invocation).await?;

        let text = read_export(&path).await?;
        Ok(MonitorExport::parse(&text))
    }
}

async fn read_export(path: &Path) -> VddResult<String> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(VddError::ToolInvocation(
                "monitor tool produced no export file".into(),
            ));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(decode_export(&bytes))
}

/// Exports are ANSI/UTF-8, or UTF-16LE with a BOM on some configurations
fn decode_export(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    String::from_utf8_lossy(bytes).into_owned()
}
