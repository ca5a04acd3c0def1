//! Driver settings file propagation

use std::path::PathBuf;

use tracing::{info, warn};
use vdd_types::{VddError, VddResult};

/// Where the driver settings file comes from and where it must land
#[derive(Debug, Clone)]
pub struct SettingsConfig {
    /// Bundled settings file
    pub source: PathBuf,
    /// System locations the driver reads its settings from
    pub targets: Vec<PathBuf>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("resources").join("vdd_settings.xml"),
            targets: vec![
                PathBuf::from(r"C:\VirtualDisplayDriver\vdd_settings.xml"),
                PathBuf::from(r"C:\IddSampleDriver\vdd_settings.xml"),
            ],
        }
    }
}

/// Per-target result of a propagation pass
#[derive(Debug, Clone, Default)]
pub struct PropagationReport {
    pub copied: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl PropagationReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Copies the static settings file to every configured target
#[derive(Debug, Clone)]
pub struct SettingsPropagator {
    config: SettingsConfig,
}

impl SettingsPropagator {
    pub fn new(config: SettingsConfig) -> Self {
        Self { config }
    }

    /// Copy the settings file; only a missing source is an error
    pub fn propagate(&self) -> VddResult<PropagationReport> {
        let source = &self.config.source;
        if !source.is_file() {
            return Err(VddError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("settings file not found: {}", source.display()),
            )));
        }

        let mut report = PropagationReport::default();
        for target in &self.config.targets {
            let result = target
                .parent()
                .map_or(Ok(()), std::fs::create_dir_all)
                .and_then(|_| std::fs::copy(source, target));

            match result {
                Ok(_) => {
                    info!("Copied driver settings to {}", target.display());
                    report.copied.push(target.clone());
                }
                Err(e) => {
                    warn!("Failed to copy driver settings to {}: {}", target.display(), e);
                    report.failed.push((target.clone(), e.to_string()));
                }
            }
        }

        Ok(report)
    }
}
