//! Device console (`devcon`) command lines and output parsing
//!
//! devcon prints unstructured text and its exit code is unreliable, so the
//! controller only trusts what these parsers extract. Samples below are
//! captured from real runs.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static MATCHING_COUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s+matching\s+device\(s\)").expect("valid count regex")
});

static LISTING_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\S*\\\S*?)\s*:\s+(.*?)\s*$").expect("valid listing regex")
});

const RUNNING_MARKER: &str = "Driver is running";
const NO_MATCHES_MARKER: &str = "No matching devices found";

/// Outcome of an enable/disable/remove command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Changed,
    RebootRequired,
    Failed,
}

/// `find <pattern>` / `findall <pattern>`
pub fn find_args(all: bool, pattern: &str) -> Vec<String> {
    let verb = if all { "findall" } else { "find" };
    vec![verb.to_string(), pattern.to_string()]
}

/// `<verb> @<instance id>`; every targeted command goes through here
pub fn targeted_args(verb: &str, instance_id: &str) -> Vec<String> {
    vec![verb.to_string(), format!("@{instance_id}")]
}

/// `install <inf> <hardware id>`
pub fn install_args(inf: &str, hardware_id: &str) -> Vec<String> {
    vec!["install".to_string(), inf.to_string(), hardware_id.to_string()]
}

/// Number from the trailing "N matching device(s) found." line
pub fn matching_count(text: &str) -> Option<u32> {
    if let Some(caps) = MATCHING_COUNT.captures(text) {
        return caps[1].parse().ok();
    }
    text.contains(NO_MATCHES_MARKER).then_some(0)
}

/// Instance ids listed by `find` / `findall`
pub fn instance_ids(text: &str) -> BTreeSet<String> {
    text.lines()
        .filter_map(|line| LISTING_ROW.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Whether `status` reports the driver as running
pub fn is_running(text: &str) -> bool {
    text.contains(RUNNING_MARKER)
}

/// Classify enable/disable/remove output
pub fn state_change(text: &str) -> StateChange {
    let lower = text.to_ascii_lowercase();
    if lower.contains("failed") || lower.contains("no devices") {
        StateChange::Failed
    } else if lower.contains("reboot") || lower.contains("restart") {
        StateChange::RebootRequired
    } else if lower.contains("enabled") || lower.contains("disabled") || lower.contains("removed")
    {
        StateChange::Changed
    } else {
        StateChange::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINDALL_TWO: &str = "\
ROOT\\DISPLAY\\0000                                           : Virtual Display Driver
ROOT\\DISPLAY\\0001                                           : Virtual Display Driver
2 matching device(s) found.
";

    const STATUS_RUNNING: &str = "\
ROOT\\DISPLAY\\0001
    Name: Virtual Display Driver
    Driver is running.
1 matching device(s) found.
";

    const STATUS_DISABLED: &str = "\
ROOT\\DISPLAY\\0001
    Name: Virtual Display Driver
    Device is disabled.
1 matching device(s) found.
";

    #[test]
    fn test_matching_count() {
        assert_eq!(matching_count(FINDALL_TWO), Some(2));
        assert_eq!(matching_count("No matching devices found."), Some(0));
        assert_eq!(matching_count("devcon failed."), None);
    }

    #[test]
    fn test_instance_ids() {
        let ids = instance_ids(FINDALL_TWO);
        assert_eq!(
            ids.into_iter().collect::<Vec<_>>(),
            vec![r"ROOT\DISPLAY\0000", r"ROOT\DISPLAY\0001"]
        );
        assert!(instance_ids("No matching devices found.").is_empty());
        // Status dumps have "Name:" lines that are not listing rows
        assert!(instance_ids(STATUS_RUNNING).is_empty());
    }

    #[test]
    fn test_running_marker() {
        assert!(is_running(STATUS_RUNNING));
        assert!(!is_running(STATUS_DISABLED));
    }

    #[test]
    fn test_state_change() {
        assert_eq!(
            state_change("ROOT\\DISPLAY\\0001 : Enabled\n1 device(s) are enabled."),
            StateChange::Changed
        );
        assert_eq!(
            state_change("ROOT\\DISPLAY\\0001 : Disabled\n1 device(s) disabled."),
            StateChange::Changed
        );
        assert_eq!(
            state_change("ROOT\\DISPLAY\\0001 : Enable failed\nNo devices enabled."),
            StateChange::Failed
        );
        assert_eq!(
            state_change(
                "ROOT\\DISPLAY\\0001 : Disabled on reboot\nThe system needs to be rebooted."
            ),
            StateChange::RebootRequired
        );
    }

    #[test]
    fn test_targeted_args_are_instance_qualified() {
        assert_eq!(
            targeted_args("enable", r"ROOT\DISPLAY\0001"),
            vec!["enable".to_string(), r"@ROOT\DISPLAY\0001".to_string()]
        );
    }
}
