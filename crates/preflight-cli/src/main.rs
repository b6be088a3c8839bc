//! preflight CLI entrypoint
//! Parses command-line arguments and runs the preflight checks on one document.

// Internal imports (std, crate)
use std::ffi::OsString;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

// External imports (alphabetized)
use anyhow::Context;
use clap::Parser;
use preflight_core::{BaseStrategy, Preflight, PreflightConfig, ReportMode};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "preflight")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the OpenAPI document (JSON or YAML)
    document: PathBuf,

    /// Root directory when reading the OpenAPI document (default: working directory)
    ///
    /// Also accepted as `-rootDir`.
    #[arg(long = "rootDir", alias = "root-dir", value_name = "DIR")]
    root_dir: Option<PathBuf>,

    /// How relative $refs are anchored: explicit or working-dir
    #[arg(long, value_name = "STRATEGY")]
    base_strategy: Option<BaseStrategy>,

    /// What to print on success: summary, raw or none
    #[arg(long, value_name = "MODE")]
    report: Option<ReportMode>,

    /// Skip validation of the loaded document
    #[arg(long)]
    no_validate: bool,

    /// Do not report $ref keys found on path items
    #[arg(long)]
    no_ref_scan: bool,

    /// YAML configuration file; flags given on the command line take precedence
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl Cli {
    async fn preflight_config(&self) -> anyhow::Result<PreflightConfig> {
        let mut config = match &self.config {
            Some(path) => PreflightConfig::from_file(path)
                .await
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PreflightConfig::default(),
        };
        if let Some(root_dir) = &self.root_dir {
            config.root_dir = Some(root_dir.clone());
        }
        if let Some(strategy) = self.base_strategy {
            config.base_strategy = strategy;
        }
        if let Some(report) = self.report {
            config.report = report;
        }
        if self.no_validate {
            config.validate = false;
        }
        if self.no_ref_scan {
            config.scan_refs = false;
        }
        Ok(config)
    }
}

/// Accept the single-dash `-rootDir` spelling alongside `--rootDir`.
fn normalize_args<I: IntoIterator<Item = OsString>>(args: I) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some(s) if s == "-rootDir" || s.starts_with("-rootDir=") => format!("-{s}").into(),
            _ => arg,
        })
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            e.print()?;
            // --help and --version are not failures
            std::process::exit(if e.use_stderr() { 1 } else { 0 });
        }
    };

    let config = cli.preflight_config().await?;
    tracing::debug!(?config, "Running preflight");

    let preflight = Preflight::new(config);
    let outcome = preflight
        .check(&cli.document)
        .await
        .with_context(|| format!("Preflight of {} failed", cli.document.display()))?;

    let mut out = io::stdout().lock();
    outcome
        .write_report(&mut out, preflight.config().report)
        .context("Failed to write report")?;
    out.flush()?;

    for found in &outcome.ref_extensions {
        tracing::info!(
            path = %found.path,
            key = %found.key,
            value = %found.value,
            "path item carries a $ref key"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_single_dash_root_dir() {
        let args = normalize_args(
            ["preflight", "-rootDir", "/srv", "-rootDir=/x", "spec.yaml"]
                .into_iter()
                .map(OsString::from),
        );
        assert_eq!(
            args,
            vec!["preflight", "--rootDir", "/srv", "--rootDir=/x", "spec.yaml"]
                .into_iter()
                .map(OsString::from)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "preflight",
            "--root-dir",
            "/srv/api",
            "--base-strategy",
            "working-dir",
            "--report",
            "raw",
            "--no-validate",
            "spec.json",
        ])
        .unwrap();
        let config = cli.preflight_config().await.unwrap();
        assert_eq!(config.root_dir, Some(PathBuf::from("/srv/api")));
        assert_eq!(config.base_strategy, BaseStrategy::WorkingDirectory);
        assert_eq!(config.report, ReportMode::Raw);
        assert!(!config.validate);
        assert!(config.scan_refs);
    }

    #[test]
    fn test_document_is_required() {
        assert!(Cli::try_parse_from(["preflight"]).is_err());
        assert!(Cli::try_parse_from(["preflight", "a.json", "b.json"]).is_err());
    }
}
