//! Command-line interface

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::enumerator;
use crate::report::{DedupeOptions, MergeStrategy, RiskRating, SimilarityOptions};
use crate::scanner::{merge_findings, ScanConfig, ScanEngine, SourceFindings};
use crate::transport::TransportKind;
use crate::ui::OutputMode;

/// mcprecon - heuristic security assessment for MCP servers
#[derive(Parser)]
#[command(
    name = "mcprecon",
    version,
    about = "Heuristic security assessment for Model Context Protocol servers",
    long_about = "mcprecon enumerates a target MCP server's tools, resources and prompt \
                  templates in an isolated worker process, evaluates them against a bank of \
                  security heuristics, merges findings from other scanners, and emits a \
                  severity-scored risk report."
)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Suppress diagnostic findings (detector errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan one or more MCP servers
    Scan {
        /// Target URLs
        #[arg(required = true)]
        targets: Vec<String>,

        /// Transport selector (auto-detected from the URL when omitted)
        #[arg(short, long, value_parser = clap::value_parser!(TransportKind))]
        transport: Option<TransportKind>,

        /// Bearer token presented to the target
        #[arg(long)]
        bearer_token: Option<String>,

        /// Per-operation timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Finding files from other scanners to merge into the report
        #[arg(long = "merge", value_name = "FILE")]
        merge_files: Vec<PathBuf>,

        /// Enable similarity-based cross-source deduplication
        #[arg(long)]
        dedupe_similar: bool,

        /// Similarity threshold in (0, 1]
        #[arg(long, default_value_t = crate::report::DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f64,

        /// Merge strategy for similar findings
        #[arg(long, default_value = "keep-highest-severity")]
        strategy: String,

        /// Run enumeration in-process instead of an isolated worker
        #[arg(long)]
        no_isolation: bool,
    },

    /// Normalize and deduplicate finding files without scanning
    Merge {
        /// Finding files, one per source
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Enable similarity-based deduplication
        #[arg(long)]
        dedupe_similar: bool,

        /// Similarity threshold in (0, 1]
        #[arg(long, default_value_t = crate::report::DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f64,

        /// Merge strategy for similar findings
        #[arg(long, default_value = "keep-highest-severity")]
        strategy: String,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },

    /// Internal: isolated enumeration worker
    #[command(name = "enum-worker", hide = true)]
    EnumWorker,
}

/// Dispatch the parsed command. Returns the process exit code.
pub async fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::EnumWorker => {
            enumerator::run_worker().await?;
            Ok(0)
        }

        Commands::Scan {
            targets,
            transport,
            bearer_token,
            timeout,
            merge_files,
            dedupe_similar,
            threshold,
            strategy,
            no_isolation,
        } => {
            let config = ScanConfig {
                transport,
                bearer_token,
                timeout_secs: timeout,
                detector: crate::scanner::DetectorConfig {
                    quiet: cli.quiet,
                    ..Default::default()
                },
                dedupe: dedupe_options(dedupe_similar, threshold, &strategy)?,
                isolate: !no_isolation,
            };
            let engine = ScanEngine::new(config);
            let external = load_source_files(&merge_files)?;
            if !external.is_empty() && targets.len() > 1 {
                anyhow::bail!("--merge applies to single-target scans only");
            }

            let mode = OutputMode::detect();
            let mut worst = RiskRating::Clean;

            if targets.len() == 1 {
                let report = engine.scan(&targets[0], external).await;
                worst = worst.max(report.summary.risk_score);
                print_report(&report, cli.format, mode)?;
            } else {
                let spinner = scan_spinner(mode, targets.len());
                let reports = engine.scan_all(&targets).await;
                spinner.finish_and_clear();

                for report in &reports {
                    worst = worst.max(report.summary.risk_score);
                    print_report(report, cli.format, mode)?;
                }
            }

            // Non-zero exit for HIGH/CRITICAL, so CI can gate on it.
            Ok(if worst >= RiskRating::High { 2 } else { 0 })
        }

        Commands::Merge {
            files,
            dedupe_similar,
            threshold,
            strategy,
        } => {
            let options = dedupe_options(dedupe_similar, threshold, &strategy)?;
            let external = load_source_files(&files)?;
            let findings = merge_findings(external, &options);

            let (counts, rating) = crate::report::assess(&findings);
            let output = serde_json::json!({
                "findings": findings,
                "summary": {
                    "total_findings": findings.len(),
                    "by_severity": {
                        "CRITICAL": counts.critical,
                        "HIGH": counts.high,
                        "MEDIUM": counts.medium,
                        "LOW": counts.low,
                        "INFO": counts.info,
                    },
                    "risk_score": rating,
                }
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(0)
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(0)
        }
    }
}

fn dedupe_options(enabled: bool, threshold: f64, strategy: &str) -> Result<DedupeOptions> {
    if !enabled {
        return Ok(DedupeOptions::default());
    }
    let strategy: MergeStrategy = strategy.parse()?;
    let similarity = SimilarityOptions::new(threshold, strategy)?;
    Ok(DedupeOptions {
        similarity: Some(similarity),
    })
}

/// Load external finding files. Accepts either the tagged shape
/// `{"source": ..., "findings": [...]}` or a bare finding array, which gets
/// tagged with the file stem.
fn load_source_files(paths: &[PathBuf]) -> Result<Vec<SourceFindings>> {
    let mut sources = Vec::with_capacity(paths.len());

    for path in paths {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;

        let parsed = serde_json::from_str::<SourceFindings>(&text).or_else(|_| {
            serde_json::from_str::<Vec<crate::report::RawFinding>>(&text).map(|findings| {
                SourceFindings {
                    source: file_stem(path),
                    findings,
                }
            })
        });

        sources.push(
            parsed.with_context(|| format!("unrecognized finding format in {}", path.display()))?,
        );
    }

    Ok(sources)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "external".to_string())
}

fn print_report(
    report: &crate::report::RiskReport,
    format: OutputFormat,
    mode: OutputMode,
) -> Result<()> {
    match format {
        OutputFormat::Json => report.print_json(),
        OutputFormat::Text => {
            report.print_text(mode);
            Ok(())
        }
    }
}

fn scan_spinner(mode: OutputMode, count: usize) -> ProgressBar {
    if !matches!(mode, OutputMode::Interactive) {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} scanning {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("{} targets", count));
    spinner.enable_steady_tick(std::time::Duration::from_millis(120));
    spinner
}
