//! Driver lifecycle controller
//!
//! Create/enable/disable/status for the single instance this application
//! owns. Sibling instances of the same hardware id (created by other tools)
//! are never targeted: every state-changing command is `@<instance id>`.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tool_runner::{DEFAULT_TOOL_TIMEOUT_SECS, ToolInvocation, ToolOutput, ToolRunner};
use tracing::{debug, error, info, warn};
use vdd_types::{
    DeviceGuid, DriverIdentity, DriverStatus, InitializeOutcome, VDD_HARDWARE_ID, VddError,
    VddResult,
};

use crate::devcon::{self, StateChange};
use crate::{IdentityStore, SettingsPropagator};

/// Controller configuration
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Path to devcon.exe
    pub devcon_path: PathBuf,
    /// Driver package descriptor passed to `devcon install`
    pub driver_inf: PathBuf,
    /// Hardware id shared by the driver family
    pub hardware_id: String,
    /// Bound for ordinary devcon calls
    pub tool_timeout: Duration,
    /// Bound for `devcon install`
    pub install_timeout: Duration,
    /// How long to wait for the OS to register a freshly installed instance
    pub registration_timeout: Duration,
    pub registration_poll_interval: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            devcon_path: PathBuf::from("devcon.exe"),
            driver_inf: PathBuf::from("MttVDD.inf"),
            hardware_id: VDD_HARDWARE_ID.to_string(),
            tool_timeout: Duration::from_secs(DEFAULT_TOOL_TIMEOUT_SECS),
            install_timeout: Duration::from_secs(120),
            registration_timeout: Duration::from_secs(10),
            registration_poll_interval: Duration::from_millis(500),
        }
    }
}

/// Owns the lifecycle of one virtual display instance
///
/// All operations hold the identity lock for their whole duration, so
/// concurrent calls are serialized rather than interleaved.
pub struct DriverController {
    config: ControllerConfig,
    runner: Arc<dyn ToolRunner>,
    store: IdentityStore,
    settings: SettingsPropagator,
    identity: Mutex<DriverIdentity>,
}

impl DriverController {
    pub fn new(
        config: ControllerConfig,
        runner: Arc<dyn ToolRunner>,
        store: IdentityStore,
        settings: SettingsPropagator,
    ) -> Self {
        let identity = store.load();
        Self {
            config,
            runner,
            store,
            settings,
            identity: Mutex::new(identity),
        }
    }

    /// Currently recorded instance id
    pub async fn instance_id(&self) -> Option<String> {
        self.identity.lock().await.instance_id.clone()
    }

    /// Ensure our instance exists, installing it if needed
    ///
    /// Idempotent: a live recorded instance is reused. A fresh install only
    /// adopts an instance that did not exist before the install command ran.
    pub async fn initialize(&self) -> VddResult<InitializeOutcome> {
        let mut identity = self.identity.lock().await;

        match self.settings.propagate() {
            Ok(report) if !report.is_complete() => {
                warn!(
                    "Driver settings reached {} of {} targets",
                    report.copied.len(),
                    report.copied.len() + report.failed.len()
                );
            }
            Ok(_) => {}
            Err(e) => warn!("Driver settings not propagated: {}", e),
        }

        *identity = self.store.load();

        if let Some(instance_id) = identity.instance_id.clone() {
            if self.is_alive(&instance_id).await? {
                info!("Virtual display {} already installed", instance_id);
                return Ok(InitializeOutcome {
                    was_installed: false,
                    instance_id,
                });
            }
            warn!("Recorded instance {} no longer exists, reinstalling", instance_id);
            self.invalidate(&mut identity);
        }

        let instance_id = self.install().await?;
        *identity = DriverIdentity::owned(instance_id.clone());
        self.store.save(&identity);
        info!("Installed virtual display {}", instance_id);

        Ok(InitializeOutcome {
            was_installed: true,
            instance_id,
        })
    }

    /// Enable our instance
    pub async fn enable(&self) -> VddResult<()> {
        let mut identity = self.identity.lock().await;
        let instance_id = identity.instance_id.clone().ok_or(VddError::NotInstalled)?;

        if !self.is_alive(&instance_id).await? {
            self.invalidate(&mut identity);
            return Err(VddError::Removed(instance_id));
        }

        self.change_state("enable", &instance_id).await?;
        info!("Enabled virtual display {}", instance_id);
        Ok(())
    }

    /// Disable our instance; without one there is nothing to turn off
    pub async fn disable(&self) -> VddResult<()> {
        let mut identity = self.identity.lock().await;
        let Some(instance_id) = identity.instance_id.clone() else {
            debug!("Disable requested with no instance installed");
            return Ok(());
        };

        if !self.is_alive(&instance_id).await? {
            warn!("Instance {} is gone, nothing to disable", instance_id);
            self.invalidate(&mut identity);
            return Ok(());
        }

        self.change_state("disable", &instance_id).await?;
        info!("Disabled virtual display {}", instance_id);
        Ok(())
    }

    /// Remove our instance from the OS and forget it
    pub async fn uninstall(&self) -> VddResult<()> {
        let mut identity = self.identity.lock().await;
        let Some(instance_id) = identity.instance_id.clone() else {
            return Ok(());
        };

        if self.is_alive(&instance_id).await? {
            self.change_state("remove", &instance_id).await?;
            info!("Removed virtual display {}", instance_id);
        }

        self.invalidate(&mut identity);
        Ok(())
    }

    /// Instance status; any failure reads as disabled
    pub async fn status(&self) -> DriverStatus {
        let identity = self.identity.lock().await;
        self.query_status(&identity).await
    }

    /// GUID from the instance's hardware-id dump, only while enabled
    pub async fn device_guid(&self) -> Option<DeviceGuid> {
        let identity = self.identity.lock().await;
        if !self.query_status(&identity).await.is_enabled() {
            debug!("Device GUID requested while disabled");
            return None;
        }

        let instance_id = identity.instance_id.as_deref()?;
        let output = self
            .devcon(devcon::targeted_args("hwids", instance_id), self.config.tool_timeout)
            .await
            .map_err(|e| warn!("hwids query failed: {}", e))
            .ok()?;

        let guid = DeviceGuid::find_in(&output.text());
        if guid.is_none() {
            debug!("No GUID in hardware ids of {}", instance_id);
        }
        guid
    }

    async fn query_status(&self, identity: &DriverIdentity) -> DriverStatus {
        let Some(instance_id) = identity.instance_id.as_deref() else {
            return DriverStatus::Disabled;
        };

        match self
            .devcon(devcon::targeted_args("status", instance_id), self.config.tool_timeout)
            .await
        {
            Ok(output) if devcon::is_running(&output.text()) => DriverStatus::Enabled,
            Ok(_) => DriverStatus::Disabled,
            Err(e) => {
                warn!("Status query failed, assuming disabled: {}", e);
                DriverStatus::Disabled
            }
        }
    }

    /// Instance-qualified presence check; never a family-wide search
    async fn is_alive(&self, instance_id: &str) -> VddResult<bool> {
        let output = self
            .devcon(
                devcon::find_args(false, &format!("@{instance_id}")),
                self.config.tool_timeout,
            )
            .await?;
        let text = output.text();

        match devcon::matching_count(&text) {
            Some(count) => Ok(count > 0),
            None => Err(VddError::Parse(format!(
                "no device count in find output for {instance_id}"
            ))),
        }
    }

    /// Install a new instance and return the id that appeared
    async fn install(&self) -> VddResult<String> {
        let before = self.snapshot().await?;
        debug!("{} existing instances before install", before.len());

        let inf = self.config.driver_inf.display().to_string();
        let output = self
            .devcon(
                devcon::install_args(&inf, &self.config.hardware_id),
                self.config.install_timeout,
            )
            .await?;
        debug!("Install output: {}", output.text().trim());

        let deadline = Instant::now() + self.config.registration_timeout;
        loop {
            match self.snapshot().await {
                Ok(after) => {
                    let created: Vec<&String> = after.difference(&before).collect();
                    match created.as_slice() {
                        [id] => return Ok((*id).clone()),
                        [] => {}
                        many => {
                            error!("{} new instances appeared, refusing to guess", many.len());
                            return Err(VddError::InstallFailed);
                        }
                    }
                }
                Err(e) => warn!("Snapshot after install failed: {}", e),
            }

            if Instant::now() >= deadline {
                error!("No new instance registered within {:?}", self.config.registration_timeout);
                return Err(VddError::InstallFailed);
            }
            tokio::time::sleep(self.config.registration_poll_interval).await;
        }
    }

    /// All instances of the driver family, present or not
    async fn snapshot(&self) -> VddResult<BTreeSet<String>> {
        let output = self
            .devcon(
                devcon::find_args(true, &self.config.hardware_id),
                self.config.tool_timeout,
            )
            .await?;
        let text = output.text();
        if devcon::matching_count(&text).is_none() {
            return Err(VddError::Parse("no device count in findall output".into()));
        }
        Ok(devcon::instance_ids(&text))
    }

    async fn change_state(&self, verb: &str, instance_id: &str) -> VddResult<()> {
        let output = self
            .devcon(devcon::targeted_args(verb, instance_id), self.config.tool_timeout)
            .await?;
        let text = output.text();

        match devcon::state_change(&text) {
            StateChange::Changed => Ok(()),
            StateChange::RebootRequired => {
                warn!("{} {} requires a reboot", verb, instance_id);
                Ok(())
            }
            StateChange::Failed => Err(VddError::ToolInvocation(format!(
                "devcon {verb} failed: {}",
                text.trim()
            ))),
        }
    }

    fn invalidate(&self, identity: &mut DriverIdentity) {
        *identity = DriverIdentity::default();
        self.store.clear();
    }

    async fn devcon(&self, args: Vec<String>, timeout: Duration) -> VddResult<ToolOutput> {
        let invocation = ToolInvocation::new(&self.config.devcon_path)
            .args(args)
            .timeout(timeout);
        Ok(self.runner.run(&invocation).await?)
    }
}
