//! FLRT inventory records
//!
//! A [`MachineRecord`] maps FLRT option names to either a scalar value or a
//! nested [`PartitionRecord`] stored under a `p<N>` key (`p0` is the server,
//! `p1..pn` are LPARs). Every map keeps insertion order since the query URL is
//! rendered in that order.

use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;

/// Top-level options recognised in a saved FLRT inventory file
pub const INVENTORY_OPTIONS: [&str; 4] = ["reportname", "plat", "reportType", "format"];

/// Option that is parsed but never rendered into the query
pub const FORMAT_OPTION: &str = "format";

/// Value stored under one key of a [`MachineRecord`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Scalar(String),
    Partition(PartitionRecord),
}

/// Attributes of the server (`p0`) or of one LPAR
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PartitionRecord {
    attrs: IndexMap<String, String>,
}

impl PartitionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Server entry scraped from a snap
    pub fn server(firmware: &str, type_model: &str) -> Self {
        let mut record = Self::new();
        record.set("fw", firmware);
        record.set("mtm", type_model);
        record
    }

    /// VIOS partition entry scraped from a snap
    pub fn vios(hostname: &str, level: &str) -> Self {
        let mut record = Self::new();
        record.set("os", "vios");
        record.set("parnm", hostname);
        record.set("vios", level);
        record
    }

    /// AIX partition entry scraped from a snap
    pub fn aix(hostname: &str, level: &str) -> Self {
        let mut record = Self::new();
        record.set("os", "aix");
        record.set("parnm", hostname);
        record.set("aix", level);
        record
    }

    /// Last write wins; a re-assigned attribute keeps its first position
    pub fn set(&mut self, attr: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(attr.into(), value.into());
    }

    pub fn get(&self, attr: &str) -> Option<&str> {
        self.attrs.get(attr).map(String::as_str)
    }

    pub fn contains_value(&self, value: &str) -> bool {
        self.attrs.values().any(|v| v == value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

/// `p<N>` key of a partition entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartitionKey(pub u32);

impl PartitionKey {
    pub const SERVER: PartitionKey = PartitionKey(0);

    /// Parses a strict `p<digits>` key
    pub fn parse(key: &str) -> Option<Self> {
        let digits = key.strip_prefix('p')?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok().map(PartitionKey)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// One FLRT report: scalar options plus nested partition entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MachineRecord {
    fields: IndexMap<String, FieldValue>,
}

impl MachineRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skeleton record for a Power server discovered in a snap
    pub fn power_server(serial: &str, firmware: &str, type_model: &str) -> Self {
        let mut record = Self::new();
        record.set_scalar("plat", "power");
        record.set_scalar("reportname", serial);
        record.set_scalar("reportType", "power");
        record.insert_partition(PartitionKey::SERVER, PartitionRecord::server(firmware, type_model));
        record
    }

    pub fn set_scalar(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), FieldValue::Scalar(value.into()));
    }

    pub fn scalar(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(FieldValue::Scalar(value)) => Some(value),
            _ => None,
        }
    }

    pub fn partition(&self, key: &str) -> Option<&PartitionRecord> {
        match self.fields.get(key) {
            Some(FieldValue::Partition(partition)) => Some(partition),
            _ => None,
        }
    }

    /// Sets `key.attr`; a scalar already stored under `key` is replaced by a partition
    pub fn set_partition_attr(&mut self, key: &str, attr: &str, value: &str) {
        let slot = self
            .fields
            .entry(key.to_string())
            .or_insert_with(|| FieldValue::Partition(PartitionRecord::new()));
        if let FieldValue::Partition(partition) = slot {
            partition.set(attr, value);
            return;
        }

        let mut partition = PartitionRecord::new();
        partition.set(attr, value);
        *slot = FieldValue::Partition(partition);
    }

    pub fn insert_partition(&mut self, key: PartitionKey, partition: PartitionRecord) {
        self.fields.insert(key.to_string(), FieldValue::Partition(partition));
    }

    /// True when any partition attribute equals `value` (used to spot a known hostname)
    pub fn has_partition_value(&self, value: &str) -> bool {
        self.fields.values().any(|field| match field {
            FieldValue::Partition(partition) => partition.contains_value(value),
            FieldValue::Scalar(_) => false,
        })
    }

    /// One past the highest `p<N>` key present, 0 for a record without partitions
    pub fn next_partition_key(&self) -> PartitionKey {
        self.fields
            .iter()
            .filter(|(_, value)| matches!(value, FieldValue::Partition(_)))
            .filter_map(|(key, _)| PartitionKey::parse(key))
            .max()
            .map(|PartitionKey(n)| PartitionKey(n + 1))
            .unwrap_or(PartitionKey::SERVER)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Machines discovered in a snap directory, keyed by cabinet serial in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReportsCollection {
    machines: IndexMap<String, MachineRecord>,
}

impl ReportsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.machines.contains_key(serial)
    }

    pub fn get(&self, serial: &str) -> Option<&MachineRecord> {
        self.machines.get(serial)
    }

    /// Returns the machine for `serial`, building it with `init` on first sight
    pub fn machine_or_insert_with<F>(&mut self, serial: &str, init: F) -> &mut MachineRecord
    where
        F: FnOnce() -> MachineRecord,
    {
        self.machines.entry(serial.to_string()).or_insert_with(init)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MachineRecord)> {
        self.machines.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn records(&self) -> impl Iterator<Item = &MachineRecord> {
        self.machines.values()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_key_parsing() {
        assert_eq!(PartitionKey::parse("p0"), Some(PartitionKey(0)));
        assert_eq!(PartitionKey::parse("p12"), Some(PartitionKey(12)));
        assert_eq!(PartitionKey::parse("p"), None);
        assert_eq!(PartitionKey::parse("plat"), None);
        assert_eq!(PartitionKey(3).to_string(), "p3");
    }

    #[test]
    fn test_scalar_reassignment_keeps_position() {
        let mut record = MachineRecord::new();
        record.set_scalar("reportname", "A");
        record.set_scalar("plat", "power");
        record.set_scalar("reportname", "B");

        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["reportname", "plat"]);
        assert_eq!(record.scalar("reportname"), Some("B"));
    }

    #[test]
    fn test_next_partition_key() {
        let mut record = MachineRecord::new();
        assert_eq!(record.next_partition_key(), PartitionKey(0));

        record = MachineRecord::power_server("ABC123", "SV860_180", "8286-42A");
        assert_eq!(record.next_partition_key(), PartitionKey(1));

        record.insert_partition(PartitionKey(4), PartitionRecord::aix("lpar4", "7200-05-03-2148"));
        assert_eq!(record.next_partition_key(), PartitionKey(5));
    }

    #[test]
    fn test_has_partition_value() {
        let mut record = MachineRecord::power_server("ABC123", "SV860_180", "8286-42A");
        record.insert_partition(PartitionKey(1), PartitionRecord::vios("vios1", "3.1.2.10"));

        assert!(record.has_partition_value("vios1"));
        assert!(!record.has_partition_value("vios2"));
        // scalar values are not partition values
        assert!(!record.has_partition_value("ABC123"));
    }

    #[test]
    fn test_set_partition_attr() {
        let mut record = MachineRecord::new();
        record.set_partition_attr("p1", "os", "aix");
        record.set_partition_attr("p1", "parnm", "lpar01");
        assert_eq!(record.partition("p1").unwrap().len(), 2);

        // a scalar under the same key gives way to the partition
        record.set_scalar("p2", "oops");
        record.set_partition_attr("p2", "os", "vios");
        assert_eq!(record.scalar("p2"), None);
        assert_eq!(record.partition("p2").unwrap().get("os"), Some("vios"));

        let keys: Vec<&str> = record.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["p1", "p2"]);
    }

    #[test]
    fn test_power_server_layout() {
        let record = MachineRecord::power_server("ABC123", "SV860_180", "8286-42A");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "plat": "power",
                "reportname": "ABC123",
                "reportType": "power",
                "p0": {"fw": "SV860_180", "mtm": "8286-42A"}
            })
        );
    }
}
