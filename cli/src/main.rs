use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use questpack_core::{KindRegistry, Project, ValidationIssue, error_count};
use questpack_import::{ConflictPolicy, ImportConfig, ImportError, Importer, MergeSummary};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// CLI-specific conflict policy enum with clap argument parsing support.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliConflictPolicy {
    Skip,
    MergeById,
    Rename,
    NewIds,
}

impl From<CliConflictPolicy> for ConflictPolicy {
    fn from(policy: CliConflictPolicy) -> Self {
        match policy {
            CliConflictPolicy::Skip => Self::Skip,
            CliConflictPolicy::MergeById => Self::MergeById,
            CliConflictPolicy::Rename => Self::Rename,
            CliConflictPolicy::NewIds => Self::NewIds,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliOutputFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "questpack")]
#[command(about = "Validate, inspect and merge quest packs")]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate one or more pack JSON files.
    Validate(ValidateArgs),
    /// Print the typed view of a pack.
    Inspect(InspectArgs),
    /// Merge a pack into a project JSON file.
    Merge(MergeArgs),
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Pack JSON files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
    /// Fail on warnings as well as errors.
    #[arg(long)]
    strict: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    /// Pack JSON file.
    input: PathBuf,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: CliOutputFormat,
}

#[derive(Debug, Args)]
struct MergeArgs {
    /// Existing project JSON file.
    #[arg(long)]
    project: PathBuf,
    /// Pack JSON file to import.
    #[arg(long)]
    pack: PathBuf,
    /// Import configuration YAML file.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Override the chapter conflict policy.
    #[arg(long)]
    chapter_policy: Option<CliConflictPolicy>,
    /// Override the quest conflict policy.
    #[arg(long)]
    quest_policy: Option<CliConflictPolicy>,
    /// Group receiving newly added chapters.
    #[arg(long)]
    target_group: Option<String>,
    /// Merge even when validation reports errors.
    #[arg(long)]
    allow_errors: bool,
    /// Output path for the merged project (default: stdout).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Output path for the merge summary JSON.
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Inspect(args) => run_inspect(args),
        Command::Merge(args) => run_merge(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn importer(config: ImportConfig) -> Importer {
    Importer::new(KindRegistry::standard(), config)
}

fn read_text(path: &Path) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
}

fn print_issues(source: &Path, issues: &[ValidationIssue]) {
    for issue in issues {
        println!("{}: {issue}", source.display());
    }
}

/// Same as [`print_issues`] but on stderr, for commands whose stdout is data.
fn eprint_issues(source: &Path, issues: &[ValidationIssue]) {
    for issue in issues {
        eprintln!("{}: {issue}", source.display());
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let importer = importer(ImportConfig::default());
    let mut failed = 0usize;

    for input in &args.inputs {
        let text = read_text(input)?;
        let check = importer.check(&text);
        print_issues(input, &check.issues);

        let errors = error_count(&check.issues);
        let warnings = check.issues.len() - errors;
        debug!(file = %input.display(), errors, warnings, "validated pack");
        if errors > 0 || (args.strict && warnings > 0) {
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(format!(
            "{failed} of {} pack file(s) failed validation",
            args.inputs.len()
        ));
    }
    println!("Validated {} pack file(s).", args.inputs.len());
    Ok(())
}

fn run_inspect(args: InspectArgs) -> Result<(), String> {
    let text = read_text(&args.input)?;
    let check = importer(ImportConfig::default()).check(&text);
    let Some(pack) = check.pack else {
        print_issues(&args.input, &check.issues);
        return Err(format!("{} is not a readable pack", args.input.display()));
    };

    let rendered = match args.format {
        CliOutputFormat::Json => serde_json::to_string_pretty(&pack).map_err(|e| e.to_string())?,
        CliOutputFormat::Yaml => serde_yaml::to_string(&pack).map_err(|e| e.to_string())?,
    };
    println!("{rendered}");
    Ok(())
}

fn run_merge(args: MergeArgs) -> Result<(), String> {
    let mut config = match &args.config {
        Some(path) => ImportConfig::load(path)
            .map_err(|e| format!("failed to load config {}: {e}", path.display()))?,
        None => ImportConfig::default(),
    };
    if let Some(policy) = args.chapter_policy {
        config.chapter_policy = policy.into();
    }
    if let Some(policy) = args.quest_policy {
        config.quest_policy = policy.into();
    }
    if args.target_group.is_some() {
        config.target_group_id = args.target_group.clone();
    }
    config.allow_errors |= args.allow_errors;

    let project_text = read_text(&args.project)?;
    let project: Project = serde_json::from_str(&project_text)
        .map_err(|e| format!("invalid project {}: {e}", args.project.display()))?;
    let pack_text = read_text(&args.pack)?;

    let report = match importer(config).import(&pack_text, &project) {
        Ok(report) => report,
        Err(ImportError::Blocked { error_count, issues }) => {
            eprint_issues(&args.pack, &issues);
            return Err(format!(
                "{} has {error_count} validation error(s); rerun with --allow-errors to merge anyway",
                args.pack.display()
            ));
        }
        Err(e) => return Err(e.to_string()),
    };

    eprint_issues(&args.pack, &report.issues);
    for warning in &report.pack_warnings {
        eprintln!("warning: {warning}");
    }
    print_summary(&report.outcome.summary);

    let merged =
        serde_json::to_string_pretty(&report.outcome.project).map_err(|e| e.to_string())?;
    match &args.output {
        Some(path) => fs::write(path, merged)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?,
        None => println!("{merged}"),
    }

    if let Some(path) = &args.summary {
        let summary =
            serde_json::to_string_pretty(&report.outcome.summary).map_err(|e| e.to_string())?;
        fs::write(path, summary).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    }
    Ok(())
}

fn print_summary(summary: &MergeSummary) {
    eprintln!(
        "Chapters: {} added, {} merged, {} skipped",
        summary.added_chapters.len(),
        summary.merged_chapters.len(),
        summary.skipped_chapters.len()
    );
    eprintln!(
        "Quests: {} added, {} merged, {} skipped",
        summary.added_quests.len(),
        summary.merged_quests.len(),
        summary.skipped_quests.len()
    );
    for renamed in &summary.renamed_ids {
        eprintln!("renamed: {renamed}");
    }
    for warning in summary.warnings.iter().chain(&summary.asset_warnings) {
        eprintln!("warning: {warning}");
    }
}
