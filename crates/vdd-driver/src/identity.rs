//! Device identity store

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use vdd_types::DriverIdentity;

const APP_DIR: &str = "Eclipse";
const IDENTITY_FILE: &str = "vdd_identity.json";

/// Synchronous, best-effort persistence of the owned instance id
#[derive(Debug, Clone)]
pub struct IdentityStore {
    path: PathBuf,
}

impl IdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/Eclipse/vdd_identity.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::data_dir().map(|dir| dir.join(APP_DIR).join(IDENTITY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the identity; missing or unreadable files yield the null identity
    pub fn load(&self) -> DriverIdentity {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No identity file at {}", self.path.display());
                return DriverIdentity::default();
            }
            Err(e) => {
                warn!("Failed to read {}: {}", self.path.display(), e);
                return DriverIdentity::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Ignoring corrupt identity file {}: {}", self.path.display(), e);
                DriverIdentity::default()
            }
        }
    }

    /// Persist the identity; failures are logged, never returned
    pub fn save(&self, identity: &DriverIdentity) {
        if let Err(e) = self.try_save(identity) {
            warn!("Failed to save identity to {}: {}", self.path.display(), e);
            return;
        }
        info!(
            "Saved identity {:?} to {}",
            identity.instance_id,
            self.path.display()
        );
    }

    /// Reset to the null identity
    pub fn clear(&self) {
        self.save(&DriverIdentity::default());
    }

    fn try_save(&self, identity: &DriverIdentity) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(identity)?;
        std::fs::write(&self.path, json)
    }
}
