//! Monitor enumeration export (`/scomma`) parsing
//!
//! Rows are comma-separated, with fields containing commas (e.g. `"0, 0"`)
//! wrapped in double quotes. Nothing here is cached: every caller parses a
//! fresh export.

use std::sync::LazyLock;

use regex::Regex;
use vdd_types::{DisplaySettings, DisplaySlot};

use crate::FALLBACK_MIN_SLOT;

static SLOT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\\\\\.\\DISPLAY(\d+)").expect("valid slot regex")
});

static RESOLUTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d{3,5})\s*[xX]\s*(\d{3,5})\s*$").expect("valid resolution regex")
});

/// Refresh rates outside this range are not treated as refresh tokens
const REFRESH_RANGE: std::ops::RangeInclusive<u32> = 30..=300;

/// `/scomma` column order: ..., Colors, Frequency, Orientation,
/// Maximum Resolution, Name, ...
const FREQUENCY_BEFORE_NAME: usize = 3;
const DISCONNECTED_COLUMN: usize = 4;

/// One attached display from an enumeration export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorRow {
    pub fields: Vec<String>,
    pub slot: Option<DisplaySlot>,
    /// Index of the `\\.\DISPLAYn` field
    name_index: Option<usize>,
}

impl MonitorRow {
    /// Whether any field carries one of the virtual adapter markers
    pub fn is_virtual(&self, markers: &[String]) -> bool {
        self.fields.iter().any(|field| {
            let field = field.to_lowercase();
            markers
                .iter()
                .any(|marker| field.contains(&marker.to_lowercase()))
        })
    }

    /// First `WxH` field
    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.fields.iter().find_map(|field| {
            let caps = RESOLUTION.captures(field)?;
            Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
        })
    }

    /// Bare refresh token in 30..=300
    ///
    /// Without a header the columns are positional: frequency sits three
    /// fields before the slot name. An empty or out-of-range value there
    /// means no refresh rate, never a neighbouring column.
    pub fn refresh_rate(&self, frequency_column: Option<usize>) -> Option<u32> {
        let index = match frequency_column {
            Some(index) => index,
            None => self.name_index?.checked_sub(FREQUENCY_BEFORE_NAME)?,
        };
        self.fields.get(index).and_then(|f| bare_refresh(f))
    }

    /// `Disconnected` column reads `Yes`
    pub fn is_disconnected(&self) -> bool {
        self.fields
            .get(DISCONNECTED_COLUMN)
            .is_some_and(|f| f.eq_ignore_ascii_case("yes"))
    }

    /// Current mode, if both tokens are present
    pub fn settings(&self, frequency_column: Option<usize>) -> Option<DisplaySettings> {
        let (width, height) = self.resolution()?;
        let refresh_rate = self.refresh_rate(frequency_column)?;
        Some(DisplaySettings {
            width,
            height,
            refresh_rate,
        })
    }
}

/// Parsed export: rows plus the frequency column when a header was present
#[derive(Debug, Clone, Default)]
pub struct MonitorExport {
    pub rows: Vec<MonitorRow>,
    pub frequency_column: Option<usize>,
}

impl MonitorExport {
    pub fn parse(text: &str) -> Self {
        let mut export = Self::default();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim_start_matches('\u{feff}');
            if line.trim().is_empty() {
                continue;
            }
            let fields = split_fields(line);

            if index == 0 && is_header(&fields) {
                export.frequency_column = fields
                    .iter()
                    .position(|f| f.eq_ignore_ascii_case("Frequency"));
                continue;
            }

            let name_index = fields.iter().position(|f| SLOT_NAME.is_match(f));
            let slot = name_index
                .and_then(|i| SLOT_NAME.captures(&fields[i]))
                .and_then(|caps| caps[1].parse().ok())
                .map(DisplaySlot);

            export.rows.push(MonitorRow {
                fields,
                slot,
                name_index,
            });
        }

        export
    }

    /// Row of the virtual display
    ///
    /// Marker rows win (highest slot if several). With no marker, the
    /// highest slot at or above [`FALLBACK_MIN_SLOT`] is assumed to be the
    /// most recently attached, i.e. virtual, display. This is positional
    /// inference, not an identity match.
    pub fn virtual_row(&self, markers: &[String]) -> Option<&MonitorRow> {
        let with_slot = || self.rows.iter().filter(|row| row.slot.is_some());

        with_slot()
            .filter(|row| row.is_virtual(markers))
            .max_by_key(|row| row.slot)
            .or_else(|| {
                with_slot()
                    .filter(|row| row.slot.is_some_and(|s| s.0 >= FALLBACK_MIN_SLOT))
                    .max_by_key(|row| row.slot)
            })
    }

    pub fn virtual_slot(&self, markers: &[String]) -> Option<DisplaySlot> {
        self.virtual_row(markers).and_then(|row| row.slot)
    }

    /// Attached displays without a virtual adapter marker
    pub fn physical_count(&self, markers: &[String]) -> usize {
        self.rows
            .iter()
            .filter(|row| row.slot.is_some() && !row.is_disconnected())
            .filter(|row| !row.is_virtual(markers))
            .count()
    }
}

/// Split one CSV line, honoring double-quoted fields
pub fn split_fields(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn is_header(fields: &[String]) -> bool {
    fields.iter().any(|f| f.eq_ignore_ascii_case("Resolution"))
        && fields.iter().any(|f| f.eq_ignore_ascii_case("Name"))
}

fn bare_refresh(field: &str) -> Option<u32> {
    let field = field.trim();
    if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok().filter(|hz| REFRESH_RANGE.contains(hz))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Captured from MultiMonitorTool /scomma on a laptop with an external
    // monitor and the virtual display enabled
    const EXPORT: &str = "\
1920 X 1080,\"0, 0\",\"1920, 1080\",Yes,No,Yes,32,144,Default,1920 X 1080,\\\\.\\DISPLAY1,Intel(R) Iris(R) Xe Graphics,MONITOR\\BOE0A1C,,,,,
2560 X 1440,\"1920, 0\",\"4480, 1440\",Yes,No,No,32,60,Default,2560 X 1440,\\\\.\\DISPLAY2,NVIDIA GeForce RTX 3060 Laptop GPU,MONITOR\\DEL41A8,,,,,
2560 X 1600,\"4480, 0\",\"7040, 1600\",Yes,No,No,32,120,Default,3840 X 2160,\\\\.\\DISPLAY3,Mtt Virtual Display Adapter,MONITOR\\MTT1337,,,,,
";

    fn markers() -> Vec<String> {
        crate::DEFAULT_VIRTUAL_MARKERS
            .iter()
            .map(|m| m.to_string())
            .collect()
    }

    #[test]
    fn test_split_fields_respects_quotes() {
        let fields = split_fields("1920 X 1080,\"0, 0\",Yes,\"say \"\"hi\"\"\"");
        assert_eq!(fields, vec!["1920 X 1080", "0, 0", "Yes", "say \"hi\""]);
    }

    #[test]
    fn test_marker_row_slot() {
        let export = MonitorExport::parse(EXPORT);
        assert_eq!(export.rows.len(), 3);
        assert_eq!(export.virtual_slot(&markers()).map(|s| s.to_string()), Some("3".into()));
    }

    #[test]
    fn test_marker_beats_higher_slot() {
        let text = "\
1920 X 1080,\"0, 0\",\"1920, 1080\",Yes,No,Yes,32,60,Default,1920 X 1080,\\\\.\\DISPLAY1,Intel(R) UHD Graphics,,,
1920 X 1080,\"1920, 0\",\"3840, 1080\",Yes,No,No,32,60,Default,1920 X 1080,\\\\.\\DISPLAY2,Mtt Virtual Display Adapter,,,
1920 X 1080,\"3840, 0\",\"5760, 1080\",Yes,No,No,32,60,Default,1920 X 1080,\\\\.\\DISPLAY5,AMD Radeon RX 6600,,,
";
        let export = MonitorExport::parse(text);
        assert_eq!(export.virtual_slot(&markers()), Some(DisplaySlot(2)));
    }

    #[test]
    fn test_fallback_highest_slot_at_least_two() {
        let text = "\
1920 X 1080,\"0, 0\",\"1920, 1080\",Yes,No,Yes,32,60,Default,1920 X 1080,\\\\.\\DISPLAY1,Intel(R) UHD Graphics,,,
1920 X 1080,\"1920, 0\",\"3840, 1080\",Yes,No,No,32,60,Default,1920 X 1080,\\\\.\\DISPLAY4,Generic Adapter,,,
1920 X 1080,\"3840, 0\",\"5760, 1080\",Yes,No,No,32,60,Default,1920 X 1080,\\\\.\\DISPLAY2,Generic Adapter,,,
";
        let export = MonitorExport::parse(text);
        assert_eq!(export.virtual_slot(&markers()), Some(DisplaySlot(4)));

        let single = MonitorExport::parse(
            "1920 X 1080,\"0, 0\",\"1920, 1080\",Yes,No,Yes,32,60,Default,1920 X 1080,\\\\.\\DISPLAY1,Intel,,,\n",
        );
        assert_eq!(single.virtual_slot(&markers()), None);
    }

    #[test]
    fn test_virtual_row_settings() {
        let export = MonitorExport::parse(EXPORT);
        let row = export.virtual_row(&markers()).unwrap();
        assert_eq!(
            row.settings(export.frequency_column),
            Some(DisplaySettings {
                width: 2560,
                height: 1600,
                refresh_rate: 120
            })
        );
    }

    #[test]
    fn test_header_frequency_column() {
        let text = "\
Resolution,Left-Top,Right-Bottom,Active,Disconnected,Primary,Colors,Frequency,Orientation,Maximum Resolution,Name,Adapter
1920 X 1080,\"0, 0\",\"1920, 1080\",Yes,No,No,32,75,Default,1920 X 1080,\\\\.\\DISPLAY2,Mtt Virtual Display Adapter
";
        let export = MonitorExport::parse(text);
        assert_eq!(export.frequency_column, Some(7));
        assert_eq!(export.rows.len(), 1);
        let row = export.virtual_row(&markers()).unwrap();
        assert_eq!(row.refresh_rate(export.frequency_column), Some(75));
    }

    #[test]
    fn test_missing_tokens_yield_none() {
        let text = "Unknown,\"0, 0\",\"0, 0\",No,Yes,No,,,Default,,\\\\.\\DISPLAY3,Mtt Virtual Display Adapter\n";
        let export = MonitorExport::parse(text);
        let row = export.virtual_row(&markers()).unwrap();
        assert!(row.settings(None).is_none());
    }

    #[test]
    fn test_empty_or_zero_refresh_is_missing() {
        for refresh in ["", "0"] {
            let text = format!(
                "1920 X 1080,\"0, 0\",\"1920, 1080\",Yes,No,No,32,{refresh},Default,1920 X 1080,\\\\.\\DISPLAY3,Mtt Virtual Display Adapter\n"
            );
            let export = MonitorExport::parse(&text);
            let row = export.virtual_row(&markers()).unwrap();
            assert_eq!(row.refresh_rate(None), None, "refresh field {refresh:?}");
            assert!(row.settings(None).is_none());
        }
    }

    #[test]
    fn test_physical_count_skips_unattached_rows() {
        let text = "\
1920 X 1080,\"0, 0\",\"1920, 1080\",Yes,No,Yes,32,60,Default,1920 X 1080,\\\\.\\DISPLAY1,Intel(R) UHD Graphics,,,
0 X 0,\"0, 0\",\"0, 0\",No,Yes,No,,,Default,,\\\\.\\DISPLAY2,Intel(R) UHD Graphics,,,
Generic PnP Monitor,,,,,,,,,,,
1920 X 1080,\"1920, 0\",\"3840, 1080\",Yes,No,No,32,60,Default,1920 X 1080,\\\\.\\DISPLAY3,Mtt Virtual Display Adapter,,,
";
        let export = MonitorExport::parse(text);
        assert_eq!(export.physical_count(&markers()), 1);
    }

    #[test]
    fn test_physical_count() {
        let export = MonitorExport::parse(EXPORT);
        assert_eq!(export.physical_count(&markers()), 2);
    }
}
