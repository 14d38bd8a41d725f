//! Text patterns scraped from an extracted AIX/VIOS snap

use crate::error::ScrapeError;
use once_cell::sync::Lazy;
use regex::Regex;

static TYPE_MODEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"Machine Type and Model.{6}([\w\-]+)").expect("Invalid type/model regex")
});
static SERIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Cabinet Serial No.{3}(\w+)").expect("Invalid serial regex"));
static FIRMWARE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sys0!system:(\w+_\d+)").expect("Invalid firmware regex"));
static HOSTNAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"hostname\s+([-._\w]+)\s").expect("Invalid hostname regex"));
static VIOS_LEVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"VIOS Level is ([.\d]+)").expect("Invalid VIOS level regex"));
static AIX_LEVEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").expect("Invalid AIX level regex"));

const VPD_MARKER: &str = "System VPD";
const VPD_END: &str = "Physical";
const INET0_MARKER: &str = "lsattr -El inet0";
const INET0_END: &str = "lsattr";

/// Server and host identity found in `general/general.snap`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneralSnap {
    pub type_model: String,
    pub serial: String,
    pub firmware: String,
    pub hostname: String,
}

/// Scrapes the VPD section, the system firmware and the inet0 hostname
pub fn general_snap(text: &str, file: &str) -> Result<GeneralSnap, ScrapeError> {
    let vpd = section(text, VPD_MARKER, VPD_END).ok_or_else(|| missing("System VPD section", file))?;
    let type_model = first_capture(&TYPE_MODEL, vpd).ok_or_else(|| missing("machine type and model", file))?;
    let serial = first_capture(&SERIAL, vpd).ok_or_else(|| missing("cabinet serial number", file))?;
    let firmware = first_capture(&FIRMWARE, text).ok_or_else(|| missing("system firmware level", file))?;

    let inet0 = section(text, INET0_MARKER, INET0_END).ok_or_else(|| missing("inet0 attributes", file))?;
    let hostname = first_capture(&HOSTNAME, inet0).ok_or_else(|| missing("hostname", file))?;

    Ok(GeneralSnap {
        type_model,
        serial,
        firmware,
        hostname,
    })
}

/// `VIOS Level is 3.1.2.10` -> `3.1.2.10`
pub fn vios_level(text: &str, file: &str) -> Result<String, ScrapeError> {
    first_capture(&VIOS_LEVEL, text.trim()).ok_or_else(|| missing("VIOS level", file))
}

/// First `NNNN-NN-NN` group in oslevel.info (`7200-05-03-2148` -> `7200-05-03`)
pub fn aix_level(text: &str, file: &str) -> Result<String, ScrapeError> {
    first_capture(&AIX_LEVEL, text.trim()).ok_or_else(|| missing("AIX level", file))
}

/// Text from `marker` up to (not including) the next `end` after it
fn section<'a>(text: &'a str, marker: &str, end: &str) -> Option<&'a str> {
    let start = text.find(marker)?;
    let body = start + marker.len();
    let stop = body + text[body..].find(end)?;
    Some(&text[start..stop])
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn missing(what: &'static str, file: &str) -> ScrapeError {
    ScrapeError::PatternNotFound {
        what,
        file: file.to_string(),
    }
}
