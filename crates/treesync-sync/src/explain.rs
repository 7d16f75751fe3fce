//! Human-readable rendering of sync actions
//!
//! Every changed field is printed as `before → after`, where "before" is the
//! target value being overwritten and "after" is the source value.

use chrono::SecondsFormat;
use std::io::{self, Write};
use treesync_types::{ChangedField, FileRecord, SyncAction};

/// Header line opening every explanation
pub const HEADER: &str = "=== Differences ===";

/// Render actions as a multi-line report
pub fn explain(actions: &[SyncAction]) -> String {
    let mut buffer = Vec::new();
    // Writing into a Vec cannot fail
    let _ = write_explanation(&mut buffer, actions);
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Write the report for `actions` to `writer`
pub fn write_explanation<W: Write>(writer: &mut W, actions: &[SyncAction]) -> io::Result<()> {
    writeln!(writer, "{}", HEADER)?;

    for action in actions {
        writeln!(writer, "{}: {}", action.kind(), action.name().display())?;

        if let SyncAction::Modify { source, target } = action {
            for field in target.changed_fields(source) {
                writeln!(
                    writer,
                    "  - {} changed: {} → {}",
                    field_label(field),
                    field_value(field, target),
                    field_value(field, source)
                )?;
            }
        }
    }

    Ok(())
}

fn field_label(field: ChangedField) -> &'static str {
    match field {
        ChangedField::Checksum => "Checksum",
        ChangedField::Size => "Size",
        ChangedField::Modified => "Modified time",
        ChangedField::Permissions => "Permissions",
    }
}

fn field_value(field: ChangedField, record: &FileRecord) -> String {
    match field {
        ChangedField::Checksum => record.checksum.clone(),
        ChangedField::Size => record.size.to_string(),
        ChangedField::Modified => record
            .modified_utc()
            .to_rfc3339_opts(SecondsFormat::Nanos, true),
        ChangedField::Permissions => format_mode(record.permissions),
    }
}

/// Format permission bits the way `ls -l` prints them, e.g. `-rw-r--r--`
pub fn format_mode(mode: u32) -> String {
    const RWX: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];

    let mut chars: Vec<char> = std::iter::once('-')
        .chain(
            RWX.iter()
                .map(|&(bit, c)| if mode & bit != 0 { c } else { '-' }),
        )
        .collect();

    // Special bits replace the execute slot of their class
    for (bit, index, set_exec, set_plain) in [
        (0o4000, 3, 's', 'S'),
        (0o2000, 6, 's', 'S'),
        (0o1000, 9, 't', 'T'),
    ] {
        if mode & bit != 0 {
            chars[index] = if chars[index] == 'x' { set_exec } else { set_plain };
        }
    }

    chars.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::{Duration, SystemTime};

    fn record(checksum: &str, size: u64, secs: u64, mode: u32) -> FileRecord {
        FileRecord::new(
            "m.txt",
            checksum,
            size,
            SystemTime::UNIX_EPOCH + Duration::from_secs(secs),
            mode,
        )
    }

    #[rstest]
    #[case(0o644, "-rw-r--r--")]
    #[case(0o600, "-rw-------")]
    #[case(0o755, "-rwxr-xr-x")]
    #[case(0o000, "----------")]
    #[case(0o4755, "-rwsr-xr-x")]
    #[case(0o1777, "-rwxrwxrwt")]
    #[case(0o2644, "-rw-r-Sr--")]
    fn test_format_mode(#[case] mode: u32, #[case] expected: &str) {
        assert_eq!(format_mode(mode), expected);
    }

    #[test]
    fn test_explain_empty() {
        assert_eq!(explain(&[]), "=== Differences ===\n");
    }

    #[test]
    fn test_explain_add_and_missing() {
        let actions = vec![
            SyncAction::Add {
                source: FileRecord::new("f.txt", "x", 1, SystemTime::UNIX_EPOCH, 0o644),
            },
            SyncAction::Missing {
                target: FileRecord::new("g.txt", "y", 1, SystemTime::UNIX_EPOCH, 0o644),
            },
        ];

        assert_eq!(
            explain(&actions),
            "=== Differences ===\nAdd: f.txt\nMissing: g.txt\n"
        );
    }

    #[test]
    fn test_explain_modify_prints_target_then_source() {
        let action = SyncAction::Modify {
            source: record("new", 4, 1_700_000_000, 0o644),
            target: record("old", 3, 1_600_000_000, 0o600),
        };

        let text = explain(&[action]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![
                "=== Differences ===",
                "Modify: m.txt",
                "  - Checksum changed: old → new",
                "  - Size changed: 3 → 4",
                "  - Modified time changed: 2020-09-13T12:26:40.000000000Z → 2023-11-14T22:13:20.000000000Z",
                "  - Permissions changed: -rw------- → -rw-r--r--",
            ]
        );
    }

    #[test]
    fn test_explain_permission_only_change() {
        let action = SyncAction::Modify {
            source: record("same", 3, 10, 0o644),
            target: record("same", 3, 10, 0o600),
        };

        let text = explain(&[action]);
        assert_eq!(text.lines().count(), 3);
        assert!(text.contains("  - Permissions changed: -rw------- → -rw-r--r--"));
    }
}
