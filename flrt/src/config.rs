//! Configuration management
//!
//! Handles:
//! - FLRT service settings (endpoint, report format, encoding)
//! - Snap scan settings (work directory, keep-going)
//! - Cross-platform config location, overridable with `FLRT_CONFIG`

use crate::error::ConfigError;
use crate::query::{QueryBuilder, ReportFormat, DEFAULT_ENDPOINT};
use crate::snapshot::SnapScanner;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "FLRT_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlrtConfig {
    pub service: ServiceConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Query endpoint, including its trailing `?`
    pub endpoint: String,
    pub format: ReportFormat,
    pub encode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub work_dir: Option<PathBuf>,
    pub keep_going: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            format: ReportFormat::Html,
            encode: false,
        }
    }
}

impl FlrtConfig {
    /// Load config from `FLRT_CONFIG` or the OS-specific location, defaults otherwise
    pub async fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::config_file_path().filter(|path| path.exists()),
        };

        match path {
            Some(path) => Self::load_from(path).await,
            None => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub async fn load_from(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;

        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// OS-specific config file path
    pub fn config_file_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("flrt");
        path.push("config.toml");
        Some(path)
    }

    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.service.endpoint.clone())
            .with_format(self.service.format)
            .with_encoding(self.service.encode)
    }

    pub fn snap_scanner(&self) -> SnapScanner {
        SnapScanner::new()
            .work_dir(self.scan.work_dir.clone())
            .keep_going(self.scan.keep_going)
    }
}
