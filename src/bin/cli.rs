// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Scanalyzer Contributors

//! Scanalyzer CLI

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args, Parser, Subcommand};
use log::LevelFilter;
use rayon::prelude::*;
use scanalyzer::cli::Reporter;
use scanalyzer::config::{ScanConfig, CONFIG_FILE};
use scanalyzer::geometry::{AnalysisOptions, MeshAnalysis, SimplificationLevel};
use scanalyzer::io::{self, AnalysisLog, MeshFormat, Report};
use scanalyzer::session::{analyze_or_fallback, Session};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "scanalyzer")]
#[command(about = "Analyze and simplify 3D scan meshes (PLY, OBJ, STL)", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./scanalyzer.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Args)]
struct InputArgs {
    /// Mesh file, or `-` to read an upload from stdin
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Input format; required for stdin, overrides the extension otherwise
    #[arg(short, long, value_enum)]
    format: Option<MeshFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a mesh and print its metrics
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Write the JSON report here
        #[arg(long, value_name = "FILE")]
        json: Option<PathBuf>,

        /// Do not append to the CSV logs
        #[arg(long)]
        no_log: bool,
    },

    /// Simplify a mesh at a fixed or suggested level
    #[command(group(ArgGroup::new("choice").required(true).args(["level", "suggest"])))]
    Simplify {
        #[command(flatten)]
        input: InputArgs,

        /// Simplification level
        #[arg(short, long, value_enum)]
        level: Option<SimplificationLevel>,

        /// Use the level suggested by the trained model
        #[arg(long)]
        suggest: bool,

        /// Export the simplified mesh (.stl, .gltf, .glb)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Write the JSON report here
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,

        /// Do not append to the CSV logs
        #[arg(long)]
        no_log: bool,
    },

    /// Print the model's suggested simplification level
    Suggest {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Export a display-capped preview of a mesh
    Preview {
        #[command(flatten)]
        input: InputArgs,

        /// Preview file (.glb, .gltf, .stl)
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Analyze every supported mesh under a directory
    Batch {
        /// Directory to scan recursively
        dir: PathBuf,

        /// Write all reports as a JSON array here
        #[arg(short, long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Destination (defaults to ./scanalyzer.toml)
        path: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        Reporter::report_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = ScanConfig::load(cli.config.as_deref())?;
    init_logging(&config, cli.verbose, cli.quiet)?;
    log::debug!("configuration: {:?}", config);

    match cli.command {
        Commands::Analyze {
            input,
            json,
            no_log,
        } => analyze_command(config, &input, json.as_deref(), no_log),
        Commands::Simplify {
            input,
            level,
            suggest: _,
            output,
            report,
            no_log,
        } => simplify_command(
            config,
            &input,
            level,
            output.as_deref(),
            report.as_deref(),
            no_log,
        ),
        Commands::Suggest { input } => suggest_command(config, &input),
        Commands::Preview { input, output } => preview_command(config, &input, &output),
        Commands::Batch { dir, out } => batch_command(config, &dir, out.as_deref()),
        Commands::InitConfig { path } => init_config_command(path.as_deref()),
        Commands::Version => {
            println!("scanalyzer v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn init_logging(config: &ScanConfig, verbose: u8, quiet: bool) -> Result<()> {
    let level = match (quiet, verbose) {
        (true, _) => LevelFilter::Error,
        (false, 0) => config.level_filter(),
        (false, 1) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialize logger")?;
    Ok(())
}

fn without_logs(mut config: ScanConfig, no_log: bool) -> ScanConfig {
    if no_log {
        config.log_analysis = false;
        config.log_simplification = false;
    }
    config
}

/// Load the input into the session, reading stdin for `-`
fn load_input(session: &mut Session, input: &InputArgs) -> Result<()> {
    if input.input.as_os_str() == "-" {
        let Some(format) = input.format else {
            bail!("reading from stdin requires --format");
        };
        let mut bytes = Vec::new();
        std::io::stdin()
            .read_to_end(&mut bytes)
            .context("Failed to read mesh from stdin")?;
        session.load_upload(&format!("stdin.{}", format.as_str()), &bytes, format)?;
        return Ok(());
    }

    if !input.input.exists() {
        bail!("input file not found: {}", input.input.display());
    }

    match input.format {
        Some(format) => {
            let bytes = std::fs::read(&input.input)
                .with_context(|| format!("Failed to read {}", input.input.display()))?;
            let name = input
                .input
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("mesh")
                .to_string();
            session.load_upload(&name, &bytes, format)?;
        }
        None => {
            session.load_path(&input.input)?;
        }
    }
    Ok(())
}

/// Analyze with timing and print the summary
fn analyze_and_report(session: &mut Session) -> Result<()> {
    let start = Instant::now();
    session.analyze()?;
    let elapsed = start.elapsed();

    if let (Some(name), Some(analysis)) = (session.mesh_name(), session.analysis()) {
        Reporter::report_analysis(name, analysis, elapsed);
    }
    Ok(())
}

fn analyze_command(
    config: ScanConfig,
    input: &InputArgs,
    json: Option<&Path>,
    no_log: bool,
) -> Result<()> {
    let mut session = Session::new(without_logs(config, no_log));
    load_input(&mut session, input)?;
    analyze_and_report(&mut session)?;

    let suggestion = session.suggest_level()?;
    Reporter::report_suggestion(suggestion, session.has_classifier());

    if let Some(path) = json {
        session.write_report(Some(path))?;
        Reporter::success(&format!("Report written to {}", path.display()));
    }
    Ok(())
}

fn simplify_command(
    config: ScanConfig,
    input: &InputArgs,
    level: Option<SimplificationLevel>,
    output: Option<&Path>,
    report: Option<&Path>,
    no_log: bool,
) -> Result<()> {
    let mut session = Session::new(without_logs(config, no_log));
    load_input(&mut session, input)?;
    analyze_and_report(&mut session)?;

    let suggestion = session.suggest_level()?;
    let level = match level.or(suggestion) {
        Some(level) => level,
        None if session.has_classifier() => bail!("the model gave no suggestion; pass --level"),
        None => bail!("no trained model at {}; pass --level", session.config().model_path.display()),
    };

    let start = Instant::now();
    let outcome = session.simplify(level)?;
    Reporter::report_simplification(&outcome, start.elapsed());

    if let (Some(name), Some(analysis)) = (session.mesh_name(), session.analysis()) {
        Reporter::report_analysis(name, analysis, start.elapsed());
    }

    if let Some(path) = output {
        session
            .export_mesh(path)
            .with_context(|| format!("Failed to export {}", path.display()))?;
        Reporter::success(&format!("Simplified mesh written to {}", path.display()));
    }
    if let Some(path) = report {
        session.write_report(Some(path))?;
        Reporter::success(&format!("Report written to {}", path.display()));
    }
    Ok(())
}

fn suggest_command(config: ScanConfig, input: &InputArgs) -> Result<()> {
    let mut session = Session::new(without_logs(config, true));
    load_input(&mut session, input)?;
    let suggestion = session.suggest_level()?;
    Reporter::report_suggestion(suggestion, session.has_classifier());
    Ok(())
}

fn preview_command(config: ScanConfig, input: &InputArgs, output: &Path) -> Result<()> {
    let cap = config.display_triangle_cap;
    let mut session = Session::new(without_logs(config, true));
    load_input(&mut session, input)?;

    let triangles = session
        .export_preview(output)
        .with_context(|| format!("Failed to export preview {}", output.display()))?;
    Reporter::success(&format!(
        "Preview with {} triangles (cap {}) written to {}",
        triangles,
        cap,
        output.display()
    ));
    Ok(())
}

fn batch_command(config: ScanConfig, dir: &Path, out: Option<&Path>) -> Result<()> {
    use indicatif::{ProgressBar, ProgressStyle};

    if !dir.is_dir() {
        bail!("not a directory: {}", dir.display());
    }

    let files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && io::is_supported(entry.path()))
        .map(|entry| entry.into_path())
        .collect();

    if files.is_empty() {
        bail!("no .ply, .obj or .stl files under {}", dir.display());
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .context("Invalid progress template")?
            .progress_chars("#>-"),
    );

    let options = AnalysisOptions {
        sharp_angle_degrees: config.sharp_angle_degrees,
    };
    let results: Vec<(PathBuf, Result<(MeshAnalysis, String)>)> = files
        .par_iter()
        .map(|path| {
            let result = (|| -> Result<(MeshAnalysis, String)> {
                let mesh = io::load_mesh(path)?;
                let digest = io::digest_bytes(&std::fs::read(path)?);
                Ok((analyze_or_fallback(&mesh, &options), digest))
            })();
            pb.inc(1);
            (path.clone(), result)
        })
        .collect();
    pb.finish_and_clear();

    let mut reports = Vec::new();
    let mut failed = 0;
    for (path, result) in results {
        let name = io::mesh_name(&path);
        match result {
            Ok((analysis, digest)) => {
                Reporter::report_batch_line(&name, &analysis);
                if config.log_analysis {
                    AnalysisLog::append(&config.analysis_log_path(), &name, &analysis)?;
                }
                let mut report = Report::new(name, analysis);
                report.source_sha256 = Some(digest);
                reports.push(report);
            }
            Err(e) => {
                failed += 1;
                Reporter::report_warning(&format!("{}: {:#}", path.display(), e));
            }
        }
    }

    if let Some(path) = out {
        let json = serde_json::to_string_pretty(&reports)?;
        std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Reporter::success(&format!("{} reports written to {}", reports.len(), path.display()));
    }

    Reporter::report_info(&format!(
        "{} analyzed, {} failed",
        reports.len(),
        failed
    ));
    Ok(())
}

fn init_config_command(path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(Path::new(CONFIG_FILE));
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    ScanConfig::default().save(path)?;
    Reporter::success(&format!("Default configuration written to {}", path.display()));
    Ok(())
}
