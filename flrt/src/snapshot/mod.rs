//! Snap directory scanning
//!
//! Every compressed file of the directory is extracted into its own temporary
//! directory, scraped, and merged into a [`ReportsCollection`]:
//! - one machine per cabinet serial, with the server firmware/model as `p0`
//! - one partition per hostname, numbered per machine (`p1`, `p2`, ...)
//! - VIOS level when `svCollect/VIOS.level` exists, AIX level otherwise
//!
//! Extraction failures only skip the archive. Scrape failures abort the scan
//! unless `keep_going` is set.

pub mod archive;
pub mod scrape;

use crate::error::{ExtractError, ScanError, ScrapeError};
use crate::models::{MachineRecord, PartitionRecord, ReportsCollection};
use archive::{ArchiveExtractor, Compression, TarExtractor};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const GENERAL_SNAP: &str = "general/general.snap";
pub const VIOS_LEVEL: &str = "svCollect/VIOS.level";
pub const OSLEVEL_INFO: &str = "general/oslevel.info";

/// Content of one file of an extracted snap
#[derive(Debug)]
pub enum SnapFile {
    Text(String),
    Missing,
    Unreadable(std::io::Error),
}

impl SnapFile {
    /// Reads `relative` under the extraction root; invalid UTF-8 is replaced
    pub async fn read(root: &Path, relative: &str) -> Self {
        match tokio::fs::read(root.join(relative)).await {
            Ok(bytes) => SnapFile::Text(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => SnapFile::Missing,
            Err(err) => SnapFile::Unreadable(err),
        }
    }

    fn required(self, relative: &str) -> Result<String, ScrapeError> {
        match self {
            SnapFile::Text(text) => Ok(text),
            SnapFile::Missing => Err(ScrapeError::MissingFile(relative.to_string())),
            SnapFile::Unreadable(source) => Err(ScrapeError::Unreadable {
                file: relative.to_string(),
                source,
            }),
        }
    }

    fn optional(self, relative: &str) -> Option<String> {
        match self {
            SnapFile::Text(text) => Some(text),
            SnapFile::Missing => None,
            SnapFile::Unreadable(err) => {
                warn!("Ignoring unreadable {}: {}", relative, err);
                None
            }
        }
    }
}

/// Archive left out of the reports, with the reason
#[derive(Debug, Clone)]
pub struct SkippedArchive {
    pub archive: PathBuf,
    pub reason: String,
}

/// Result of a directory scan
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub reports: ReportsCollection,
    pub skipped: Vec<SkippedArchive>,
}

pub struct SnapScanner {
    extractor: Arc<dyn ArchiveExtractor>,
    work_dir: Option<PathBuf>,
    keep_going: bool,
}

impl Default for SnapScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapScanner {
    pub fn new() -> Self {
        Self::with_extractor(Arc::new(TarExtractor))
    }

    pub fn with_extractor(extractor: Arc<dyn ArchiveExtractor>) -> Self {
        Self {
            extractor,
            work_dir: None,
            keep_going: false,
        }
    }

    /// Parent of the per-archive temporary directories (system temp dir by default)
    pub fn work_dir(mut self, work_dir: Option<PathBuf>) -> Self {
        self.work_dir = work_dir;
        self
    }

    /// Skip archives whose contents cannot be scraped instead of failing
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// Scans every compressed file of `dir`, in file name order
    pub async fn scan(&self, dir: impl AsRef<Path>) -> Result<ScanOutcome, ScanError> {
        let dir = dir.as_ref();
        info!("Scanning snaps in {}", dir.display());

        let archives = list_archives(dir).await?;
        let mut outcome = ScanOutcome::default();

        for (archive, compression) in archives {
            info!("Processing snap {}", archive.display());

            // removed when dropped, whichever way this iteration ends
            let workdir = self.temp_dir()?;

            if let Err(err) = self.extract(&archive, compression, workdir.path()).await {
                warn!(archive = %archive.display(), error = %err, "Skipping snap: extraction failed");
                outcome.skipped.push(SkippedArchive {
                    archive,
                    reason: err.to_string(),
                });
                continue;
            }

            match merge_snap(workdir.path(), &mut outcome.reports).await {
                Ok(()) => {}
                Err(err) if self.keep_going => {
                    warn!(archive = %archive.display(), error = %err, "Skipping snap: unusable contents");
                    outcome.skipped.push(SkippedArchive {
                        archive,
                        reason: err.to_string(),
                    });
                }
                Err(source) => return Err(ScanError::Snapshot { archive, source }),
            }
        }

        info!(
            "Scan complete: {} machines, {} snaps skipped",
            outcome.reports.len(),
            outcome.skipped.len()
        );
        Ok(outcome)
    }

    fn temp_dir(&self) -> Result<tempfile::TempDir, ScanError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("flrt-snap-");
        let dir = match &self.work_dir {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        };
        dir.map_err(ScanError::WorkDir)
    }

    async fn extract(
        &self,
        archive: &Path,
        compression: Compression,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        let extractor = Arc::clone(&self.extractor);
        let archive = archive.to_path_buf();
        let destination = destination.to_path_buf();

        tokio::task::spawn_blocking(move || extractor.extract(&archive, compression, &destination))
            .await
            .map_err(|err| ExtractError::Join(err.to_string()))?
    }
}

/// Regular files of `dir` with a compression suffix, sorted by name
async fn list_archives(dir: &Path) -> Result<Vec<(PathBuf, Compression)>, ScanError> {
    let io_err = |source| ScanError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let metadata = tokio::fs::metadata(dir).await.map_err(io_err)?;
    if !metadata.is_dir() {
        return Err(ScanError::NotADirectory(dir.to_path_buf()));
    }

    let mut paths = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        // follows symlinks
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => paths.push(path),
            Ok(_) => debug!("Ignoring {} (not a regular file)", path.display()),
            Err(err) => debug!("Ignoring {}: {}", path.display(), err),
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .filter_map(|path| match Compression::detect(&path) {
            Some(compression) => Some((path, compression)),
            None => {
                debug!("Ignoring {} (not a compressed archive)", path.display());
                None
            }
        })
        .collect())
}

/// Scrapes one extracted snap and merges it into `reports`; nothing is merged on error
async fn merge_snap(root: &Path, reports: &mut ReportsCollection) -> Result<(), ScrapeError> {
    let general = SnapFile::read(root, GENERAL_SNAP).await.required(GENERAL_SNAP)?;
    let snap = scrape::general_snap(&general, GENERAL_SNAP)?;
    debug!(
        "Snap of {} on {} ({}, firmware {})",
        snap.hostname, snap.serial, snap.type_model, snap.firmware
    );

    let known_host = reports
        .get(&snap.serial)
        .is_some_and(|machine| machine.has_partition_value(&snap.hostname));
    let partition = if known_host {
        debug!("Partition {} already recorded for {}", snap.hostname, snap.serial);
        None
    } else {
        partition_entry(root, &snap.hostname).await?
    };

    let machine = reports.machine_or_insert_with(&snap.serial, || {
        info!("New machine {} ({})", snap.serial, snap.type_model);
        MachineRecord::power_server(&snap.serial, &snap.firmware, &snap.type_model)
    });

    if let Some(partition) = partition {
        let key = machine.next_partition_key();
        info!("Recorded partition {} as {} on {}", snap.hostname, key, snap.serial);
        machine.insert_partition(key, partition);
    } else if !known_host {
        warn!(
            "No {} or {} in snap of {}, partition not recorded",
            VIOS_LEVEL, OSLEVEL_INFO, snap.hostname
        );
    }

    Ok(())
}

/// VIOS entry when `VIOS.level` is readable, else AIX entry when `oslevel.info` is
async fn partition_entry(root: &Path, hostname: &str) -> Result<Option<PartitionRecord>, ScrapeError> {
    if let Some(text) = SnapFile::read(root, VIOS_LEVEL).await.optional(VIOS_LEVEL) {
        let level = scrape::vios_level(&text, VIOS_LEVEL)?;
        return Ok(Some(PartitionRecord::vios(hostname, &level)));
    }

    if let Some(text) = SnapFile::read(root, OSLEVEL_INFO).await.optional(OSLEVEL_INFO) {
        let level = scrape::aix_level(&text, OSLEVEL_INFO)?;
        return Ok(Some(PartitionRecord::aix(hostname, &level)));
    }

    Ok(None)
}
