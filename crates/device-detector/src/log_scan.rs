//! Streaming server log scanning
//!
//! After a restart the server dumps its display devices as JSON-ish blocks:
//!
//! ```text
//! {
//!   "device_id": "{64243705-4020-5895-b8dc-b2e5b0bbd9b1}",
//!   "display_name": "\\\\.\\DISPLAY1",
//!   "friendly_name": "...",
//! ```
//!
//! Pairs are matched within a small line window. The virtual display is
//! assumed to be the highest-numbered display; the log carries nothing that
//! ties an entry to the OS device, so this is positional inference.

use std::sync::LazyLock;

use regex::Regex;
use vdd_types::StreamingDeviceRecord;

static DEVICE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"?device_id"?\s*[:=]\s*"?(\{[^}"\s]+\})"#).expect("valid device_id regex")
});

static DISPLAY_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)"?display_name"?\s*[:=]\s*"?([^"\r\n]*)"#).expect("valid display_name regex")
});

static DISPLAY_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)DISPLAY(\d+)").expect("valid display number regex"));

/// Lines after a `device_id` searched for its `display_name`
pub const DEFAULT_PAIR_WINDOW: usize = 5;

/// All `device_id` / `display_name` pairs in the log, in log order
pub fn parse_records(log: &str, window: usize) -> Vec<StreamingDeviceRecord> {
    let lines: Vec<&str> = log.lines().collect();
    let mut records = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some(id_caps) = DEVICE_ID.captures(line) else {
            continue;
        };
        let id_match = id_caps.get(0).map_or(0, |m| m.end());
        let device_id = id_caps[1].to_string();

        let last = (i + window).min(lines.len().saturating_sub(1));
        for (j, candidate) in lines.iter().enumerate().take(last + 1).skip(i) {
            let haystack = if j == i {
                &candidate[id_match..]
            } else {
                if DEVICE_ID.is_match(candidate) {
                    break;
                }
                *candidate
            };

            if let Some(name_caps) = DISPLAY_NAME.captures(haystack) {
                records.push(StreamingDeviceRecord {
                    device_id,
                    display_name: name_caps[1].trim().to_string(),
                });
                break;
            }
        }
    }

    records
}

/// `DISPLAYn` key for a raw (possibly escaped) display name
pub fn normalize_display_name(name: &str) -> Option<String> {
    display_number(name).map(|n| format!("DISPLAY{n}"))
}

pub fn display_number(name: &str) -> Option<u32> {
    DISPLAY_NUMBER
        .captures(name)
        .and_then(|caps| caps[1].parse().ok())
}

/// Record with the highest display number; later entries win ties
pub fn select_highest(records: &[StreamingDeviceRecord]) -> Option<&StreamingDeviceRecord> {
    records
        .iter()
        .filter_map(|record| display_number(&record.display_name).map(|n| (n, record)))
        .max_by_key(|(n, _)| *n)
        .map(|(_, record)| record)
}
