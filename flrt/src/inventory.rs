//! Saved FLRT inventory files
//!
//! One `key=value` assignment per line. Keys are either one of the
//! [`INVENTORY_OPTIONS`] or `p<N>.<attr>` (`p0` is the server, `p1..pn` are
//! LPARs). Unknown keys are ignored, blank lines are skipped and a line
//! without `=` is rejected.

use crate::error::InventoryError;
use crate::models::{MachineRecord, INVENTORY_OPTIONS};
use std::path::Path;
use tracing::{debug, info};

/// Reads and parses an inventory file into one machine record
pub async fn parse_file(path: impl AsRef<Path>) -> Result<MachineRecord, InventoryError> {
    let path = path.as_ref();
    debug!("Reading inventory file {}", path.display());

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let machine = parse_str(&content)?;
    info!("Parsed inventory {} ({} fields)", path.display(), machine.len());
    Ok(machine)
}

/// Parses inventory text; a repeated key keeps its first position and its last value
pub fn parse_str(content: &str) -> Result<MachineRecord, InventoryError> {
    let mut machine = MachineRecord::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| InventoryError::MissingSeparator {
                line_no: index + 1,
                line: line.to_string(),
            })?;

        if INVENTORY_OPTIONS.contains(&key) {
            machine.set_scalar(key, value);
        } else if let Some((partition, attr)) = split_partition_key(key) {
            machine.set_partition_attr(partition, attr, value);
        } else {
            debug!(line_no = index + 1, key, "Ignoring unknown inventory key");
        }
    }

    Ok(machine)
}

/// Splits `p<digits>.<attr>` into (`p<digits>`, `attr`)
fn split_partition_key(key: &str) -> Option<(&str, &str)> {
    let rest = key.strip_prefix('p')?;
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let attr = rest[digits..].strip_prefix('.')?;
    if attr.is_empty() {
        return None;
    }
    Some((&key[..1 + digits], attr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FieldValue;
    use flrt_devkit::TestHarness;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_split_partition_key() {
        assert_eq!(split_partition_key("p1.fw"), Some(("p1", "fw")));
        assert_eq!(split_partition_key("p12.parnm"), Some(("p12", "parnm")));
        assert_eq!(split_partition_key("p.fw"), Some(("p", "fw")));
        assert_eq!(split_partition_key("p1.a.b"), Some(("p1", "a.b")));
        assert_eq!(split_partition_key("p1."), None);
        assert_eq!(split_partition_key("p1fw"), None);
        assert_eq!(split_partition_key("plat"), None);
        assert_eq!(split_partition_key("x1.fw"), None);
    }

    #[test]
    fn test_known_options_last_write_wins() {
        let machine = parse_str(
            "reportname=first\nplat=power\nreportType=power\nformat=text\nreportname=second\n",
        )
        .unwrap();

        assert_eq!(machine.scalar("reportname"), Some("second"));
        assert_eq!(machine.scalar("plat"), Some("power"));
        assert_eq!(machine.scalar("reportType"), Some("power"));
        assert_eq!(machine.scalar("format"), Some("text"));
        assert_eq!(machine.len(), 4);
    }

    #[test]
    fn test_partition_lines() {
        let machine = parse_str("p1.fw=AL770\np1.mtm=9009-22A\n").unwrap();
        let p1 = machine.partition("p1").unwrap();

        assert_eq!(p1.get("fw"), Some("AL770"));
        assert_eq!(p1.get("mtm"), Some("9009-22A"));
        assert_eq!(p1.len(), 2);
    }

    #[test]
    fn test_whitespace_blank_and_unknown_lines() {
        let machine = parse_str("  plat=power  \n\n   \nunknown=value\np0.fw=SV860_180\n").unwrap();

        let keys: Vec<&str> = machine.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["plat", "p0"]);
        assert_eq!(machine.scalar("plat"), Some("power"));
    }

    #[test]
    fn test_value_split_on_first_separator() {
        let machine = parse_str("p1.parnm=a=b\n").unwrap();
        assert_eq!(machine.partition("p1").unwrap().get("parnm"), Some("a=b"));
    }

    #[test]
    fn test_missing_separator_is_rejected() {
        let err = parse_str("plat=power\nthis line is broken\n").unwrap_err();
        match err {
            InventoryError::MissingSeparator { line_no, line } => {
                assert_eq!(line_no, 2);
                assert_eq!(line, "this line is broken");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_file_order_is_kept() {
        let machine = parse_str(
            "reportname=ABC123\np0.fw=SV860_180\nplat=power\np1.os=aix\np0.mtm=8286-42A\n",
        )
        .unwrap();

        let keys: Vec<&str> = machine.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["reportname", "p0", "plat", "p1"]);
        match machine.get("p0") {
            Some(FieldValue::Partition(p0)) => {
                let attrs: Vec<(&str, &str)> = p0.iter().collect();
                assert_eq!(attrs, vec![("fw", "SV860_180"), ("mtm", "8286-42A")]);
            }
            other => panic!("p0 should be a partition, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parse_file() {
        let harness = TestHarness::new().unwrap();
        let path = harness
            .write_inventory("server.inv", &[("reportname", "ABC123"), ("p1.fw", "AL770")])
            .unwrap();

        let machine = parse_file(&path).await.unwrap();
        assert_eq!(machine.scalar("reportname"), Some("ABC123"));
        assert_eq!(machine.partition("p1").unwrap().get("fw"), Some("AL770"));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let harness = TestHarness::new().unwrap();
        let err = parse_file(harness.path().join("nope.inv")).await.unwrap_err();
        assert!(matches!(err, InventoryError::Io { .. }));
    }
}
