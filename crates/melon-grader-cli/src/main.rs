//! Melon Grader CLI
//!
//! The `melon-grade` command grades UberMelon submissions over HTTP.
//!
//! ## Commands
//!
//! - `run`: grade every candidate directory under a root
//! - `list`: show which directories would be graded
//! - `attach`: grade a server that is already running

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use melon_grader::{discover, CandidateDescriptor, GradeReport, Grader, GraderConfig};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "melon-grade")]
#[command(author = "UberMelon Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Grade UberMelon submissions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Grader configuration file (TOML)
    #[arg(short, long, global = true, env = "MELON_GRADER_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade every candidate under ROOT
    Run {
        /// Directory holding one subdirectory per candidate
        #[arg(default_value = ".")]
        root: PathBuf,

        /// Write the JSON report here
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// How to print the results
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// List the candidates a run would grade
    List {
        #[arg(default_value = ".")]
        root: PathBuf,
    },

    /// Grade a server that is already running
    Attach {
        /// Base URL of the server, e.g. http://127.0.0.1:5000/
        #[arg(long)]
        url: String,

        /// Submission directory, for the filesystem checks
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Write the JSON report here
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    melon_grader::init_tracing(cli.json, level);

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            root,
            report,
            format,
        } => cmd_run(config, &root, report.as_deref(), format).await,
        Commands::List { root } => cmd_list(&config, &root),
        Commands::Attach { url, dir, report } => {
            cmd_attach(config, &url, &dir, report.as_deref()).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GraderConfig> {
    match path {
        Some(path) => GraderConfig::from_toml_file(path)
            .with_context(|| format!("Failed to load grader config {:?}", path)),
        None => Ok(GraderConfig::default()),
    }
}

async fn cmd_run(
    config: GraderConfig,
    root: &Path,
    report_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    info!(root = %root.display(), "grading candidates");
    let report = Grader::new(config)
        .grade_root(root)
        .await
        .with_context(|| format!("Failed to grade {:?}", root))?;
    finish(&report, report_path, format)
}

fn cmd_list(config: &GraderConfig, root: &Path) -> Result<()> {
    let candidates = discover(root, config).with_context(|| format!("Failed to list {:?}", root))?;
    if candidates.is_empty() {
        println!("No candidates under {:?}", root);
        return Ok(());
    }

    for candidate in &candidates {
        let manifest = candidate.join(&config.manifest_file);
        let marker = if manifest.is_file() { "✓" } else { "✗" };
        println!("  {} {} ({})", marker, candidate.name, candidate.path.display());
    }
    println!();
    println!("{} candidate(s)", candidates.len());
    Ok(())
}

async fn cmd_attach(
    config: GraderConfig,
    url: &str,
    dir: &Path,
    report_path: Option<&Path>,
) -> Result<()> {
    let dir = dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {:?}", dir))?;
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| url.to_string());

    let report = Grader::new(config)
        .grade_attached(CandidateDescriptor::new(name, dir), url)
        .await
        .with_context(|| format!("Failed to attach to {}", url))?;
    finish(&report, report_path, OutputFormat::Text)
}

fn finish(report: &GradeReport, report_path: Option<&Path>, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }

    if let Some(path) = report_path {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report {:?}", path))?;
        info!(path = %path.display(), "report written");
    }

    if report.has_failures() {
        anyhow::bail!(
            "{} case(s) failed, {} candidate(s) skipped",
            report.summary.failed_cases,
            report.summary.skipped_candidates
        )
    }
    if format == OutputFormat::Text {
        println!("\n✓ All candidates passed!");
    }
    Ok(())
}
