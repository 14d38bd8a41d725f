/*!
Test Harness pour flrt

Facilite l'écriture de tests avec:
- Un répertoire temporaire par test, supprimé au drop
- Écriture de fichiers d'inventaire, de fichiers quelconques et d'archives corrompues
*/

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Harness de test: un répertoire de travail isolé
pub struct TestHarness {
    root: TempDir,
}

impl TestHarness {
    /// Crée un nouveau harness de test
    pub fn new() -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let root = tempfile::Builder::new().prefix("flrt-test-").tempdir()?;
        log::debug!("🧪 Test harness in {}", root.path().display());
        Ok(Self { root })
    }

    /// Racine du répertoire temporaire
    pub fn path(&self) -> &Path {
        self.root.path()
    }

    /// Écrit un fichier texte sous la racine
    pub fn write_file(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.root.path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Écrit un inventaire FLRT (`key=value` par ligne, dans l'ordre donné)
    pub fn write_inventory(&self, name: &str, entries: &[(&str, &str)]) -> Result<PathBuf> {
        let content: String = entries
            .iter()
            .map(|(key, value)| format!("{key}={value}\n"))
            .collect();
        let path = self.write_file(name, &content)?;
        log::info!("📝 Wrote inventory {} ({} lines)", path.display(), entries.len());
        Ok(path)
    }

    /// Fichier qui porte un nom d'archive mais n'en est pas une
    pub fn write_garbage(&self, name: &str) -> Result<PathBuf> {
        let path = self.root.path().join(name);
        std::fs::write(&path, b"this is not a compressed snap \x00\x01\x02")?;
        log::info!("💥 Wrote corrupted archive {}", path.display());
        Ok(path)
    }

    /// Crée un sous-répertoire
    pub fn scratch_dir(&self, name: &str) -> Result<PathBuf> {
        let path = self.root.path().join(name);
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }
}
