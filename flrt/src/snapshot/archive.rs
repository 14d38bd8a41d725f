//! Snap archive detection and extraction
//!
//! Archives are recognised by the compression suffix of their file name, the
//! way MIME encodings are guessed. The decompressed stream must be a tar/pax
//! archive. gzip and zstd are decoded in-process; `.Z`, bzip2 and xz go
//! through the matching system tool.

use crate::error::ExtractError;
use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Compression encoding guessed from a file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Gzip,
    Compress,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Returns `None` for files that are not compressed archives
    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        let (_, suffix) = name.rsplit_once('.')?;

        // `.Z` is case sensitive (`.z` is pack, not compress)
        if suffix == "Z" || suffix == "taz" {
            return Some(Compression::Compress);
        }

        match suffix.to_ascii_lowercase().as_str() {
            "gz" | "tgz" => Some(Compression::Gzip),
            "bz2" | "tbz2" | "tbz" => Some(Compression::Bzip2),
            "xz" | "txz" => Some(Compression::Xz),
            "zst" | "tzst" => Some(Compression::Zstd),
            _ => None,
        }
    }

    /// System tool decoding this format with `-dc`, if not decoded in-process
    fn external_tool(&self) -> Option<&'static str> {
        match self {
            Compression::Compress => Some("gzip"),
            Compression::Bzip2 => Some("bzip2"),
            Compression::Xz => Some("xz"),
            Compression::Gzip | Compression::Zstd => None,
        }
    }
}

/// Unpacks one archive into a destination directory, fully or not at all
pub trait ArchiveExtractor: Send + Sync {
    fn extract(
        &self,
        archive: &Path,
        compression: Compression,
        destination: &Path,
    ) -> Result<(), ExtractError>;
}

/// Default extractor for compressed tar/pax snaps
#[derive(Debug, Default, Clone, Copy)]
pub struct TarExtractor;

impl ArchiveExtractor for TarExtractor {
    fn extract(
        &self,
        archive: &Path,
        compression: Compression,
        destination: &Path,
    ) -> Result<(), ExtractError> {
        debug!("Extracting {} ({:?}) into {}", archive.display(), compression, destination.display());

        if let Some(tool) = compression.external_tool() {
            return unpack_with_tool(tool, archive, destination);
        }

        let file = fs::File::open(archive)?;
        match compression {
            Compression::Gzip => unpack_tar(archive, flate2::read::GzDecoder::new(file), destination),
            Compression::Zstd => {
                let decoder = zstd::stream::read::Decoder::new(file)
                    .map_err(|err| corrupted(archive, err))?;
                unpack_tar(archive, decoder, destination)
            }
            _ => Err(ExtractError::UnsupportedFormat(archive.to_path_buf())),
        }
    }
}

/// Streams `<tool> -dc <archive>` straight into the tar reader
fn unpack_with_tool(tool: &str, archive: &Path, destination: &Path) -> Result<(), ExtractError> {
    let mut child = Command::new(tool)
        .arg("-dc")
        .arg(archive)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|err| tool_failed(tool, err.to_string()))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| tool_failed(tool, "stdout pipe unavailable".to_string()))?;

    // the pipe is closed when this returns, so the tool cannot block on a full pipe
    let unpacked = unpack_tar(archive, stdout, destination);

    let output = child
        .wait_with_output()
        .map_err(|err| tool_failed(tool, err.to_string()))?;
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    match unpacked {
        _ if !output.status.success() && !stderr.is_empty() => Err(tool_failed(tool, stderr)),
        Err(err) => Err(err),
        Ok(()) if !output.status.success() => Err(tool_failed(tool, output.status.to_string())),
        Ok(()) => Ok(()),
    }
}

fn unpack_tar<R: Read>(archive_path: &Path, reader: R, destination: &Path) -> Result<(), ExtractError> {
    let mut archive = tar::Archive::new(reader);
    let entries = archive.entries().map_err(|err| corrupted(archive_path, err))?;
    let mut unpacked = 0usize;

    for entry in entries {
        let mut entry = entry.map_err(|err| corrupted(archive_path, err))?;

        let entry_type = entry.header().entry_type();
        if !(entry_type.is_file() || entry_type.is_dir()) {
            continue;
        }

        // refuses `..` and anything resolving outside `destination`
        let inside = entry
            .unpack_in(destination)
            .map_err(|err| corrupted(archive_path, err))?;
        if !inside {
            let entry_path = entry.path().map(|p| p.display().to_string()).unwrap_or_default();
            warn!(entry = %entry_path, archive = %archive_path.display(), "Skipping unsafe snap entry");
            continue;
        }

        if entry_type.is_file() {
            unpacked += 1;
        }
    }

    if unpacked == 0 {
        return Err(ExtractError::Corrupted {
            path: archive_path.to_path_buf(),
            reason: "archive contains no files".to_string(),
        });
    }

    debug!("Unpacked {} files from {}", unpacked, archive_path.display());
    Ok(())
}

fn tool_failed(tool: &str, reason: String) -> ExtractError {
    ExtractError::ToolFailed {
        tool: tool.to_string(),
        reason,
    }
}

fn corrupted(path: &Path, err: std::io::Error) -> ExtractError {
    ExtractError::Corrupted {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}
