//! Display geometry, refresh rates and slot numbers

use serde::{Deserialize, Serialize};

use crate::DISPLAY_SLOT_PREFIX;

/// Allowed width range in pixels
pub const WIDTH_RANGE: std::ops::RangeInclusive<u32> = 640..=7680;

/// Allowed height range in pixels
pub const HEIGHT_RANGE: std::ops::RangeInclusive<u32> = 480..=4320;

/// Display resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayResolution {
    pub width: u32,
    pub height: u32,
}

impl DisplayResolution {
    /// Create a resolution, rejecting values outside the supported range
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (WIDTH_RANGE.contains(&width) && HEIGHT_RANGE.contains(&height))
            .then_some(Self { width, height })
    }
}

impl Default for DisplayResolution {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl std::fmt::Display for DisplayResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Refresh rate, restricted to the rates the virtual driver advertises
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RefreshRate(u32);

impl RefreshRate {
    pub const SUPPORTED_HZ: [u32; 10] = [30, 50, 60, 75, 90, 100, 120, 144, 165, 240];

    pub fn new(hz: u32) -> Option<Self> {
        Self::SUPPORTED_HZ.contains(&hz).then_some(Self(hz))
    }

    pub fn hz(self) -> u32 {
        self.0
    }
}

impl Default for RefreshRate {
    fn default() -> Self {
        Self(60)
    }
}

impl TryFrom<u32> for RefreshRate {
    type Error = String;

    fn try_from(hz: u32) -> Result<Self, Self::Error> {
        Self::new(hz).ok_or_else(|| format!("unsupported refresh rate: {hz} Hz"))
    }
}

impl From<RefreshRate> for u32 {
    fn from(rate: RefreshRate) -> Self {
        rate.0
    }
}

/// OS display slot number (the `n` in `\\.\DISPLAYn`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DisplaySlot(pub u32);

impl DisplaySlot {
    /// Slot path understood by the monitor configuration tool
    pub fn path(self) -> String {
        format!("{DISPLAY_SLOT_PREFIX}{}", self.0)
    }
}

impl std::fmt::Display for DisplaySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current mode of the virtual display as read back from the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySettings {
    pub width: u32,
    pub height: u32,
    pub refresh_rate: u32,
}

/// One output the streaming server listed in its log
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingDeviceRecord {
    pub device_id: String,
    pub display_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_bounds() {
        assert!(DisplayResolution::new(2560, 1440).is_some());
        assert!(DisplayResolution::new(320, 240).is_none());
        assert!(DisplayResolution::new(1920, 10_000).is_none());
    }

    #[test]
    fn test_refresh_rate_set() {
        assert_eq!(RefreshRate::new(120).map(RefreshRate::hz), Some(120));
        assert!(RefreshRate::new(59).is_none());
        assert!(serde_json::from_str::<RefreshRate>("61").is_err());
    }

    #[test]
    fn test_slot_path() {
        assert_eq!(DisplaySlot(3).path(), r"\\.\DISPLAY3");
    }
}
