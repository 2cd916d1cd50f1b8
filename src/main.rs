use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use jest_to_vitest::config::{self, ConfigKind};
use jest_to_vitest::discover::{self, Patterns};
use jest_to_vitest::scripts::{self, ManifestRewrite};
use jest_to_vitest::{logging, transform_test_files, BatchReport, TransformOptions};

/// Migrate a Jest test suite to Vitest
///
/// Rewrites test files in place, writes a vitest.config.ts from a JSON Jest
/// config and points package.json scripts at vitest.
#[derive(Parser, Debug, Clone)]
#[command(name = "j2v", version)]
#[command(about, long_about = None)]
struct Cli {
    /// Project root
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Rely on Vitest's global APIs instead of importing them
    #[arg(long)]
    globals: bool,

    /// Report what would change without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Test file glob, relative to the root (replaces the defaults)
    #[arg(long = "include", value_name = "GLOB")]
    include: Vec<String>,

    /// Extra glob to exclude, relative to the root
    #[arg(long = "exclude", value_name = "GLOB")]
    exclude: Vec<String>,

    /// Do not convert the Jest configuration
    #[arg(long)]
    skip_config: bool,

    /// Do not rewrite package.json scripts
    #[arg(long)]
    skip_scripts: bool,

    /// Output format of the final report
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    report: ReportFormat,

    /// Debug logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

/// What the binary does, resolved from the command line.
#[derive(Debug, Clone)]
struct RunConfig {
    root: PathBuf,
    patterns: Patterns,
    options: TransformOptions,
    write: bool,
    config: bool,
    scripts: bool,
}

impl From<Cli> for RunConfig {
    fn from(cli: Cli) -> Self {
        Self {
            root: cli.root,
            patterns: Patterns::with_overrides(cli.include, cli.exclude),
            options: TransformOptions {
                globals: cli.globals,
            },
            write: !cli.dry_run,
            config: !cli.skip_config,
            scripts: !cli.skip_scripts,
        }
    }
}

#[derive(Debug, Default, Serialize)]
struct RunSummary {
    files: usize,
    changed: Vec<String>,
    diagnostics: Vec<jest_to_vitest::Diagnostic>,
    failures: Vec<jest_to_vitest::Failure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scripts: Option<ManifestRewrite>,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let format = cli.report;
    let run = RunConfig::from(cli);

    let summary = migrate(&run)?;
    match format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        ReportFormat::Text => info!(
            files = summary.files,
            changed = summary.changed.len(),
            diagnostics = summary.diagnostics.len(),
            failures = summary.failures.len(),
            "migration finished"
        ),
    }

    Ok(if summary.failures.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn migrate(run: &RunConfig) -> Result<RunSummary> {
    let files = discover::load_test_files(&run.root, &run.patterns)
        .with_context(|| format!("failed to collect test files under {}", run.root.display()))?;
    info!(count = files.len(), root = %run.root.display(), "discovered test files");

    let report = transform_test_files(files, &run.options);
    if run.write {
        write_changed(&run.root, &report)?;
    }
    for diagnostic in &report.diagnostics {
        warn!("{diagnostic}");
    }
    for failure in &report.failures {
        warn!(path = %failure.path, "not migrated: {}", failure.message);
    }

    let mut summary = RunSummary {
        files: report.files.len(),
        changed: report.changed,
        diagnostics: report.diagnostics,
        failures: report.failures,
        ..RunSummary::default()
    };
    if run.config {
        summary.config = migrate_config(run)?;
    }
    if run.scripts {
        summary.scripts = migrate_scripts(run)?;
    }
    Ok(summary)
}

fn write_changed(root: &Path, report: &BatchReport) -> Result<()> {
    for file in report
        .files
        .iter()
        .filter(|f| report.changed.contains(&f.path))
    {
        let path = root.join(&file.path);
        std::fs::write(&path, &file.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

/// Writes `vitest.config.ts` from a JSON Jest config. Returns the path
/// written (or that would be written on a dry run).
fn migrate_config(run: &RunConfig) -> Result<Option<String>> {
    let Some(located) = config::locate(&run.root).context("failed to read the Jest config")? else {
        info!("no Jest configuration found");
        return Ok(None);
    };
    let jest = match (&located.kind, located.value) {
        (ConfigKind::Script, _) | (_, None) => {
            warn!(
                path = %located.path.display(),
                "script config needs evaluating; convert it to vitest.config.ts by hand"
            );
            return Ok(None);
        }
        (_, Some(value)) => value,
    };

    let target = run.root.join("vitest.config.ts");
    if target.exists() {
        warn!(path = %target.display(), "already exists, leaving it alone");
        return Ok(None);
    }
    let rendered = config::render_vitest_config(&config::jest_to_vitest(&jest, run.options.globals));
    if run.write {
        std::fs::write(&target, rendered)
            .with_context(|| format!("failed to write {}", target.display()))?;
    }
    info!(from = %located.path.display(), to = %target.display(), "converted configuration");
    Ok(Some(target.display().to_string()))
}

fn migrate_scripts(run: &RunConfig) -> Result<Option<ManifestRewrite>> {
    let path = run.root.join("package.json");
    if !path.is_file() {
        return Ok(None);
    }
    let mut manifest = config::read_json(&path)?;
    let rewrite = scripts::rewrite_manifest(&mut manifest);
    for note in &rewrite.notes {
        warn!("dropped Jest flag without a Vitest counterpart in {note}");
    }
    if rewrite.coverage {
        info!("coverage flags carried over; add @vitest/coverage-v8 to devDependencies");
    }
    if run.write && !rewrite.modified.is_empty() {
        let mut text = serde_json::to_string_pretty(&manifest)?;
        text.push('\n');
        std::fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(Some(rewrite))
}
