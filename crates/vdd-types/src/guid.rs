//! Device GUID handed to the streaming server

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const GUID_PATTERN: &str =
    r"\{[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}\}";

static GUID_EXACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!("^{GUID_PATTERN}$")).expect("valid GUID regex"));

static GUID_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(GUID_PATTERN).expect("valid GUID regex"));

/// Bracketed GUID (`{xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx}`)
///
/// Opaque: validated on construction, never interpreted further.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceGuid(String);

impl DeviceGuid {
    /// Validate a complete GUID string
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        GUID_EXACT
            .is_match(trimmed)
            .then(|| Self(trimmed.to_string()))
    }

    /// First GUID token embedded anywhere in `text`
    pub fn find_in(text: &str) -> Option<Self> {
        GUID_TOKEN.find(text).map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DeviceGuid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceGuid {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid device GUID: {value}"))
    }
}

impl From<DeviceGuid> for String {
    fn from(guid: DeviceGuid) -> Self {
        guid.0
    }
}
