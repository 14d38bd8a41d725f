//! FLRT query URL rendering
//!
//! Every field of a record becomes a `format=<fmt>&<key>=<value>` segment,
//! partition attributes are flattened to `<key>.<attr>=<value>`. Segments are
//! joined with `&` and appended to the service endpoint. Values are inserted
//! verbatim unless encoding is switched on.

use crate::models::{FieldValue, MachineRecord, ReportsCollection, FORMAT_OPTION};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// FLRT query service endpoint, including the trailing `?`
pub const DEFAULT_ENDPOINT: &str = "http://www14.software.ibm.com/webapp/set2/flrt/query?";

/// Report format requested from the FLRT service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Html,
    Text,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Html => "html",
            ReportFormat::Text => "text",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    endpoint: String,
    format: ReportFormat,
    encode: bool,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_ENDPOINT)
    }
}

impl QueryBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            format: ReportFormat::Html,
            encode: false,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Percent-encode keys and values
    pub fn with_encoding(mut self, encode: bool) -> Self {
        self.encode = encode;
        self
    }

    /// Renders one record into a query URL
    pub fn build(&self, machine: &MachineRecord) -> String {
        let mut segments = Vec::new();

        for (key, value) in machine.iter() {
            if key == FORMAT_OPTION {
                continue;
            }
            match value {
                FieldValue::Scalar(value) => segments.push(self.segment(key, value)),
                FieldValue::Partition(partition) => {
                    for (attr, value) in partition.iter() {
                        segments.push(self.segment(&format!("{key}.{attr}"), value));
                    }
                }
            }
        }

        format!("{}{}", self.endpoint, segments.join("&"))
    }

    /// One URL per machine, in discovery order
    pub fn build_all(&self, reports: &ReportsCollection) -> Vec<String> {
        reports.records().map(|machine| self.build(machine)).collect()
    }

    fn segment(&self, key: &str, value: &str) -> String {
        format!(
            "format={}&{}={}",
            self.format.as_str(),
            self.escape(key),
            self.escape(value)
        )
    }

    fn escape<'a>(&self, raw: &'a str) -> Cow<'a, str> {
        if self.encode {
            urlencoding::encode(raw)
        } else {
            Cow::Borrowed(raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory;
    use crate::models::{PartitionKey, PartitionRecord};
    use pretty_assertions::assert_eq;

    fn sample_machine() -> MachineRecord {
        let mut machine = MachineRecord::new();
        machine.set_scalar("reportname", "ABC123");
        machine.set_scalar("plat", "power");
        let mut p0 = PartitionRecord::new();
        p0.set("fw", "F1");
        p0.set("mtm", "M1");
        machine.insert_partition(PartitionKey::SERVER, p0);
        machine
    }

    #[test]
    fn test_fields_in_record_order() {
        let url = QueryBuilder::default().build(&sample_machine());
        assert_eq!(
            url,
            "http://www14.software.ibm.com/webapp/set2/flrt/query?\
             format=html&reportname=ABC123&format=html&plat=power&\
             format=html&p0.fw=F1&format=html&p0.mtm=M1"
        );
    }

    #[test]
    fn test_format_option_is_not_emitted() {
        let mut machine = sample_machine();
        machine.set_scalar("format", "text");

        let url = QueryBuilder::new("http://flrt.test/query?").build(&machine);
        assert!(!url.contains("format=text"));
        assert_eq!(url.matches("format=html").count(), 4);
    }

    #[test]
    fn test_text_format() {
        let url = QueryBuilder::new("q?")
            .with_format(ReportFormat::Text)
            .build(&sample_machine());
        assert!(url.starts_with("q?format=text&reportname=ABC123"));
        assert!(!url.contains("format=html"));
    }

    #[test]
    fn test_values_are_verbatim_by_default() {
        let mut machine = MachineRecord::new();
        machine.set_scalar("reportname", "lab box&co");

        let url = QueryBuilder::new("q?").build(&machine);
        assert_eq!(url, "q?format=html&reportname=lab box&co");
    }

    #[test]
    fn test_encoding_applies_to_keys_and_values() {
        let mut machine = MachineRecord::new();
        machine.set_scalar("reportname", "lab box&co");
        machine.set_partition_attr("p1", "par nm", "a=b");

        let url = QueryBuilder::new("q?").with_encoding(true).build(&machine);
        assert_eq!(
            url,
            "q?format=html&reportname=lab%20box%26co&format=html&p1.par%20nm=a%3Db"
        );
    }

    #[test]
    fn test_build_all_in_discovery_order() {
        let mut reports = ReportsCollection::new();
        for serial in ["ZZZ999", "AAA111"] {
            reports.machine_or_insert_with(serial, || {
                MachineRecord::power_server(serial, "SV860_180", "8286-42A")
            });
        }

        let urls = QueryBuilder::new("q?").build_all(&reports);
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("reportname=ZZZ999"));
        assert!(urls[1].contains("reportname=AAA111"));
    }

    #[test]
    fn test_empty_record() {
        assert_eq!(QueryBuilder::new("q?").build(&MachineRecord::new()), "q?");
    }

    #[test]
    fn test_inventory_round_trip() {
        let source = "reportname=ABC123\nplat=power\nreportType=power\n\
                      p0.fw=SV860_180\np0.mtm=8286-42A\np1.os=aix\np1.parnm=lpar1\np1.aix=7200-05-03-2148\n";
        let machine = inventory::parse_str(source).unwrap();
        let url = QueryBuilder::new("q?").build(&machine);

        let expected: Vec<String> = source
            .lines()
            .map(|line| format!("format=html&{line}"))
            .collect();
        assert_eq!(url, format!("q?{}", expected.join("&")));
    }
}
