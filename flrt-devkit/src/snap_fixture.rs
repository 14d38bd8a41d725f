/*!
Snaps synthétiques pour les tests du scanner

Produit le contenu minimal d'un `snap -ac` extrait:
- `general/general.snap` avec la section "System VPD", le firmware sys0 et le bloc inet0
- `svCollect/VIOS.level` (optionnel)
- `general/oslevel.info` (optionnel)
*/

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Builder d'un snap factice
#[derive(Debug, Clone)]
pub struct SnapFixture {
    pub serial: String,
    pub hostname: String,
    pub type_model: String,
    pub firmware: String,
    pub vios_level: Option<String>,
    pub aix_level: Option<String>,
    pub with_general: bool,
    pub unreadable: Vec<String>,
}

impl SnapFixture {
    /// Snap d'une LPAR sur un 8286-42A en SV860_180, sans niveau d'OS
    pub fn new(serial: &str, hostname: &str) -> Self {
        Self {
            serial: serial.to_string(),
            hostname: hostname.to_string(),
            type_model: "8286-42A".to_string(),
            firmware: "SV860_180".to_string(),
            vios_level: None,
            aix_level: None,
            with_general: true,
            unreadable: Vec::new(),
        }
    }

    pub fn with_type_model(mut self, type_model: &str) -> Self {
        self.type_model = type_model.to_string();
        self
    }

    pub fn with_firmware(mut self, firmware: &str) -> Self {
        self.firmware = firmware.to_string();
        self
    }

    /// Ajoute `svCollect/VIOS.level`
    pub fn with_vios_level(mut self, level: &str) -> Self {
        self.vios_level = Some(level.to_string());
        self
    }

    /// Ajoute `general/oslevel.info` (ex: "7200-05-03-2148")
    pub fn with_aix_level(mut self, level: &str) -> Self {
        self.aix_level = Some(level.to_string());
        self
    }

    /// Snap cassé: pas de `general/general.snap`
    pub fn without_general_snap(mut self) -> Self {
        self.with_general = false;
        self
    }

    /// Remplace le fichier `relative` par un répertoire du même nom (illisible)
    pub fn with_unreadable(mut self, relative: &str) -> Self {
        self.unreadable.push(relative.to_string());
        self
    }

    /// Contenu de `general/general.snap`
    pub fn general_snap_text(&self) -> String {
        format!(
            "\
.....    lscfg -vp
.....
INSTALLED RESOURCE LIST WITH VPD

  System VPD:
        Record Name.................VSYS
        Flag Field..................XXSV
        Brand.......................S0
        Hardware Location Code......U78C9.001.WZS0001
        Machine/Cabinet Serial No...{serial}
        Machine Type and Model......{type_model}
        System Unique ID (SUID).....0004AC0F1234
        Physical Location: U{type_model}.{serial}

.....    lsmcode -A
.....
sys0!system:{firmware} (t) {firmware} (p) {firmware} (t)

.....    lsattr -El inet0
.....
authm         65536            Authentication Methods                     True
bootup_option no               Use BSD-style Network Configuration        True
gateway                        Gateway                                    True
hostname      {hostname}       Host Name                                  True
rout6                          IPv6 Route                                 True
route         net,-hopcount,0,,0,10.0.0.1 Route                           True

.....    lsattr -El en0
.....
alias4                         IPv4 Alias including Subnet Mask           True
",
            serial = self.serial,
            type_model = self.type_model,
            firmware = self.firmware,
            hostname = self.hostname,
        )
    }

    /// Fichiers du snap: (chemin relatif, contenu)
    pub fn files(&self) -> Vec<(String, String)> {
        let mut files = Vec::new();
        if self.with_general {
            files.push(("general/general.snap".to_string(), self.general_snap_text()));
        }
        if let Some(level) = &self.vios_level {
            files.push((
                "svCollect/VIOS.level".to_string(),
                format!("\nVIOS Level is {level}\n"),
            ));
        }
        if let Some(level) = &self.aix_level {
            files.push(("general/oslevel.info".to_string(), format!("{level}\n")));
        }
        files.retain(|(relative, _)| !self.unreadable.contains(relative));
        files
    }

    /// Archive tar non compressée du snap
    pub fn tar_bytes(&self) -> Result<Vec<u8>> {
        let mut builder = tar::Builder::new(Vec::new());

        // répertoire general/ toujours présent, comme dans un vrai snap
        append_dir(&mut builder, "./general/")?;
        for relative in &self.unreadable {
            append_dir(&mut builder, &format!("./{relative}/"))?;
        }

        let mut count = 0;
        for (relative, content) in self.files() {
            append_file(&mut builder, &format!("./{relative}"), content.as_bytes())?;
            count += 1;
        }

        // placeholder pour garder l'archive non vide même sans fichiers snap
        if count == 0 {
            append_file(&mut builder, "./snap.readme", b"snap collected by flrt-devkit\n")?;
        }

        Ok(builder.into_inner()?)
    }

    /// Écrit le snap en `dir/name` au format tar.gz
    pub fn write_tar_gz(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        let mut encoder = GzEncoder::new(std::fs::File::create(&path)?, Compression::default());
        encoder.write_all(&self.tar_bytes()?)?;
        encoder.finish()?;
        log::info!("📦 Wrote snap fixture {} ({})", path.display(), self.hostname);
        Ok(path)
    }

    /// Écrit le snap en `dir/name`, compressé par l'outil système `tool -c` (bzip2, xz, gzip...)
    pub fn write_with_tool(&self, dir: &Path, name: &str, tool: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        let plain = dir.join(format!("{name}.plain"));
        std::fs::write(&plain, self.tar_bytes()?)?;

        let status = Command::new(tool)
            .arg("-c")
            .arg(&plain)
            .stdout(std::fs::File::create(&path)?)
            .status();
        std::fs::remove_file(&plain)?;

        let status = status.with_context(|| format!("Failed to run {tool}"))?;
        if !status.success() {
            anyhow::bail!("{tool} exited with {status}");
        }
        log::info!("📦 Wrote snap fixture {} with {} ({})", path.display(), tool, self.hostname);
        Ok(path)
    }
}

/// Vrai si l'outil système répond à `--version`
pub fn tool_available(tool: &str) -> bool {
    Command::new(tool)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn append_dir<W: Write>(builder: &mut tar::Builder<W>, path: &str) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Directory);
    header.set_mode(0o755);
    header.set_size(0);
    header.set_cksum();
    builder.append_data(&mut header, path, std::io::empty())?;
    Ok(())
}

fn append_file<W: Write>(builder: &mut tar::Builder<W>, path: &str, content: &[u8]) -> Result<()> {
    let mut header = tar::Header::new_gnu();
    header.set_entry_type(tar::EntryType::Regular);
    header.set_mode(0o644);
    header.set_size(content.len() as u64);
    header.set_cksum();
    builder.append_data(&mut header, path, content)?;
    Ok(())
}
