//! Persisted identity of the owned virtual display instance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The one device instance this application owns
///
/// `instance_id == None` means no owned device exists yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverIdentity {
    pub instance_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl DriverIdentity {
    /// Identity for a freshly installed instance
    pub fn owned(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: Some(instance_id.into()),
            created_at: Some(Utc::now()),
        }
    }

    /// Check whether an instance has been recorded
    pub fn is_installed(&self) -> bool {
        self.instance_id.is_some()
    }

    /// Instance-qualified device console target (`@<instance id>`)
    pub fn target(&self) -> Option<String> {
        self.instance_id.as_ref().map(|id| format!("@{id}"))
    }
}

/// Driver status as reported by the device console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverStatus {
    Enabled,
    Disabled,
}

impl DriverStatus {
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

/// Outcome of `initialize()`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeOutcome {
    /// A new instance was created by this call
    pub was_installed: bool,
    pub instance_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_json_shape() {
        let identity = DriverIdentity::default();
        let json = serde_json::to_value(&identity).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "instanceId": null, "createdAt": null })
        );

        let parsed: DriverIdentity = serde_json::from_str(
            r#"{"instanceId":"ROOT\\DISPLAY\\0001","createdAt":"2025-03-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(parsed.instance_id.as_deref(), Some(r"ROOT\DISPLAY\0001"));
        assert!(parsed.created_at.is_some());
    }

    #[test]
    fn test_target_is_instance_qualified() {
        let identity = DriverIdentity::owned(r"ROOT\DISPLAY\0002");
        assert_eq!(identity.target().as_deref(), Some(r"@ROOT\DISPLAY\0002"));
        assert!(DriverIdentity::default().target().is_none());
    }
}
