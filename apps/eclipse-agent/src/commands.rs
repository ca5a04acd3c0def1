//! Command handlers
//!
//! Every command resolves to a [`CommandResponse`], rendered as a single
//! JSON object: `{"success": true, ...}` or
//! `{"success": false, "error": "<code>", "message": "..."}`.

use clap::Subcommand;
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{debug, info};
use vdd_types::{DisplayResolution, RefreshRate, VddError};

use crate::state::AppState;

/// Error type for command arguments
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Resolution {0}x{1} is out of range")]
    InvalidResolution(u32, u32),
    #[error("Unsupported refresh rate: {0} Hz")]
    InvalidRefreshRate(u32),
}

impl CommandError {
    fn code(&self) -> &'static str {
        "invalidArgument"
    }
}

/// Uniform result object
#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl CommandResponse {
    pub fn ok(data: Value) -> Self {
        let data = match data {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            success: true,
            error: None,
            message: None,
            data,
        }
    }

    pub fn failed(code: &'static str, message: String) -> Self {
        Self {
            success: false,
            error: Some(code),
            message: Some(message),
            data: Map::new(),
        }
    }
}

impl From<VddError> for CommandResponse {
    fn from(err: VddError) -> Self {
        Self::failed(err.code(), err.to_string())
    }
}

impl From<CommandError> for CommandResponse {
    fn from(err: CommandError) -> Self {
        Self::failed(err.code(), err.to_string())
    }
}

/// Mode arguments shared by the resolution commands
#[derive(Debug, Clone, Copy, clap::Args)]
pub struct ModeArgs {
    #[arg(long)]
    pub width: u32,
    #[arg(long)]
    pub height: u32,
    #[arg(long, default_value_t = 60)]
    pub refresh: u32,
}

impl ModeArgs {
    fn validate(self) -> Result<(DisplayResolution, RefreshRate), CommandError> {
        let resolution = DisplayResolution::new(self.width, self.height)
            .ok_or(CommandError::InvalidResolution(self.width, self.height))?;
        let refresh =
            RefreshRate::new(self.refresh).ok_or(CommandError::InvalidRefreshRate(self.refresh))?;
        Ok((resolution, refresh))
    }
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Install the virtual display if needed (idempotent)
    Init,
    /// Enable the owned virtual display
    Enable,
    /// Disable the owned virtual display
    Disable,
    /// Report whether the virtual display is enabled
    Status,
    /// Print the OS device GUID of the enabled virtual display
    Guid,
    /// Print the display slot of the virtual display
    Slot,
    /// Change resolution and refresh rate (display must be enabled)
    SetResolution(ModeArgs),
    /// Change resolution and refresh rate without the enabled check
    UpdateConfig(ModeArgs),
    /// Print the current resolution and refresh rate
    Current,
    /// Discover the streaming server's id for the virtual display
    DetectDeviceId,
    /// Copy the driver settings file to its system locations
    PropagateSettings,
    /// Remove the owned virtual display instance
    Uninstall,
}

/// Run one command against the subsystem
pub async fn execute(state: &AppState, command: Command) -> CommandResponse {
    debug!("Executing {:?}", command);

    let result: Result<Value, CommandResponse> = match command {
        Command::Init => state
            .controller
            .initialize()
            .await
            .map(|outcome| json!(outcome))
            .map_err(Into::into),
        Command::Enable => state
            .controller
            .enable()
            .await
            .map(|_| Value::Null)
            .map_err(Into::into),
        Command::Disable => state
            .controller
            .disable()
            .await
            .map(|_| Value::Null)
            .map_err(Into::into),
        Command::Status => {
            let status = state.controller.status().await;
            Ok(json!({ "status": status }))
        }
        Command::Guid => {
            let guid = state.controller.device_guid().await;
            Ok(json!({ "guid": guid }))
        }
        Command::Slot => state
            .resolver
            .resolve_slot()
            .await
            .map(|slot| json!({ "slot": slot.to_string() }))
            .map_err(Into::into),
        Command::SetResolution(mode) => match mode.validate() {
            Ok((resolution, refresh)) => state
                .resolver
                .set_resolution(resolution, refresh)
                .await
                .map(|slot| json!({ "slot": slot.to_string() }))
                .map_err(Into::into),
            Err(e) => Err(e.into()),
        },
        Command::UpdateConfig(mode) => match mode.validate() {
            Ok((resolution, refresh)) => state
                .resolver
                .update_config(resolution, refresh)
                .await
                .map(|slot| json!({ "slot": slot.to_string() }))
                .map_err(Into::into),
            Err(e) => Err(e.into()),
        },
        Command::Current => {
            let settings = state.resolver.current_settings().await;
            Ok(json!({ "settings": settings }))
        }
        Command::DetectDeviceId => {
            let device_id = state.detector.detect().await;
            Ok(json!({ "deviceId": device_id }))
        }
        Command::PropagateSettings => state
            .settings
            .propagate()
            .map(|report| {
                let failed: Vec<Value> = report
                    .failed
                    .iter()
                    .map(|(path, reason)| json!({ "path": path, "reason": reason }))
                    .collect();
                json!({ "copied": report.copied, "failed": failed })
            })
            .map_err(Into::into),
        Command::Uninstall => state
            .controller
            .uninstall()
            .await
            .map(|_| Value::Null)
            .map_err(Into::into),
    };

    match result {
        Ok(data) => CommandResponse::ok(data),
        Err(response) => {
            info!(
                "Command failed: {}",
                response.message.as_deref().unwrap_or_default()
            );
            response
        }
    }
}
