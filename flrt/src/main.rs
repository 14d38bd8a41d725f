//! FLRT - query URL generator for IBM Power inventories
//!
//! Prints one FLRT query URL per machine found in:
//! - a saved FLRT inventory file (`--file`)
//! - a directory of compressed AIX/VIOS snaps (`--dir`)
//!
//! URLs go to stdout, logs to stderr.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use flrt::{inventory, FlrtConfig, MachineRecord, ReportFormat};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// FLRT query URL generator
#[derive(Parser, Debug)]
#[command(
    name = "flrt",
    version,
    about = "FLRT query URL generator",
    long_about = "Builds IBM FLRT query URLs from a saved FLRT inventory file \
                  or from a directory of AIX/VIOS snap archives.",
    after_help = "EXAMPLES:\n    \
        flrt -f server.inv\n    \
        flrt -d /tmp/snaps\n    \
        flrt -d /tmp/snaps --keep-going --format text"
)]
struct Cli {
    /// Path to FLRT inventory file
    #[arg(short, long, value_name = "FILE")]
    file: Option<PathBuf>,

    /// Path to directory with snaps
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Report format requested from FLRT
    #[arg(short = 'm', long, value_enum, value_name = "FORMAT")]
    format: Option<ReportFormat>,

    /// Percent-encode query keys and values
    #[arg(long)]
    encode: bool,

    /// Skip snaps whose contents cannot be scraped
    #[arg(short, long)]
    keep_going: bool,

    /// Print records as JSON lines instead of URLs
    #[arg(short, long)]
    json: bool,

    /// Config file (default: $FLRT_CONFIG, then the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Flags override the config file
    fn apply(&self, config: &mut FlrtConfig) {
        if let Some(format) = self.format {
            config.service.format = format;
        }
        if self.encode {
            config.service.encode = true;
        }
        if self.keep_going {
            config.scan.keep_going = true;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose);

    if cli.file.is_none() && cli.dir.is_none() {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => FlrtConfig::load_from(path).await,
        None => FlrtConfig::load().await,
    }
    .context("Failed to load configuration")?;
    cli.apply(&mut config);

    let stdout = std::io::stdout();
    let emitted = run(&cli, &config, &mut stdout.lock()).await?;
    info!("Generated {} reports", emitted);
    Ok(())
}

/// Writes one line per report to `out`: the file report first, then the snap reports
async fn run(cli: &Cli, config: &FlrtConfig, out: &mut impl Write) -> Result<usize> {
    let builder = config.query_builder();
    let mut emitted = 0usize;

    if let Some(file) = &cli.file {
        let machine = inventory::parse_file(file)
            .await
            .with_context(|| format!("Failed to parse inventory file {}", file.display()))?;
        let line = if cli.json { to_json(&machine)? } else { builder.build(&machine) };
        writeln!(out, "{line}")?;
        emitted += 1;
    }

    if let Some(dir) = &cli.dir {
        let outcome = config
            .snap_scanner()
            .scan(dir)
            .await
            .with_context(|| format!("Failed to scan snaps in {}", dir.display()))?;

        let lines = if cli.json {
            outcome.reports.records().map(to_json).collect::<Result<Vec<_>>>()?
        } else {
            builder.build_all(&outcome.reports)
        };
        for line in &lines {
            writeln!(out, "{line}")?;
        }
        emitted += lines.len();

        if outcome.reports.is_empty() {
            warn!("No usable snap found in {}", dir.display());
        }
    }

    if emitted == 0 {
        anyhow::bail!("No FLRT report generated");
    }
    Ok(emitted)
}

fn to_json(machine: &MachineRecord) -> Result<String> {
    serde_json::to_string(machine).context("Failed to serialize record")
}

fn setup_logging(verbose: bool) {
    let default = if verbose { "flrt=debug,warn" } else { "flrt=info,warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use flrt::query::DEFAULT_ENDPOINT;
    use flrt_devkit::{SnapFixture, TestHarness};

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from(["flrt", "-f", "server.inv", "-d", "snaps", "-m", "text", "-k"]);
        assert_eq!(cli.file, Some(PathBuf::from("server.inv")));
        assert_eq!(cli.dir, Some(PathBuf::from("snaps")));

        let mut config = FlrtConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.service.format, ReportFormat::Text);
        assert!(config.scan.keep_going);
        assert!(!config.service.encode);
    }

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    fn lines(out: Vec<u8>) -> Vec<String> {
        String::from_utf8(out).unwrap().lines().map(str::to_string).collect()
    }

    #[tokio::test]
    async fn test_file_report_survives_empty_snap_dir() {
        let harness = TestHarness::new().unwrap();
        let inventory = harness
            .write_inventory("server.inv", &[("reportname", "ABC"), ("p0.fw", "F1")])
            .unwrap();
        let snaps = harness.scratch_dir("snaps").unwrap();
        let cli = Cli::parse_from([
            "flrt",
            "-f",
            inventory.to_str().unwrap(),
            "-d",
            snaps.to_str().unwrap(),
        ]);

        let mut out = Vec::new();
        let emitted = run(&cli, &FlrtConfig::default(), &mut out).await.unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(
            lines(out),
            vec![format!("{DEFAULT_ENDPOINT}format=html&reportname=ABC&format=html&p0.fw=F1")]
        );
    }

    #[tokio::test]
    async fn test_nothing_generated_is_an_error() {
        let harness = TestHarness::new().unwrap();
        let snaps = harness.scratch_dir("snaps").unwrap();
        let cli = Cli::parse_from(["flrt", "-d", snaps.to_str().unwrap()]);

        let mut out = Vec::new();
        assert!(run(&cli, &FlrtConfig::default(), &mut out).await.is_err());
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_file_then_snap_reports_as_json() {
        let harness = TestHarness::new().unwrap();
        let inventory = harness
            .write_inventory("server.inv", &[("reportname", "ABC")])
            .unwrap();
        let snaps = harness.scratch_dir("snaps").unwrap();
        SnapFixture::new("21ABCDE", "lpar01")
            .with_aix_level("7200-05-03-2148")
            .write_tar_gz(&snaps, "lpar01.tar.gz")
            .unwrap();
        let cli = Cli::parse_from([
            "flrt",
            "-j",
            "-f",
            inventory.to_str().unwrap(),
            "-d",
            snaps.to_str().unwrap(),
        ]);

        let mut out = Vec::new();
        assert_eq!(run(&cli, &FlrtConfig::default(), &mut out).await.unwrap(), 2);

        let records: Vec<serde_json::Value> = lines(out)
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records[0]["reportname"], "ABC");
        assert_eq!(records[1]["reportname"], "21ABCDE");
        assert_eq!(records[1]["p1"]["parnm"], "lpar01");
    }
}
