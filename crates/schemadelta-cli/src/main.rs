use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schemadelta_core::{Config, ObjectType, Report, Severity, Snapshot};
use schemadelta_engine::{CompareContext, Registry, SnapshotDiffer};

/// SchemaDelta - structural diffs between database schema snapshots
#[derive(Parser)]
#[command(name = "schemadelta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: $SCHEMADELTA_CONFIG or schemadelta.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a snapshot against a reference snapshot
    Diff {
        /// Reference (desired) snapshot JSON
        reference: PathBuf,

        /// Comparison (actual) snapshot JSON
        comparison: PathBuf,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Print the raw diff as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Show the bucketing hash of every object in a snapshot
    Hash {
        /// Snapshot JSON
        snapshot: PathBuf,
    },

    /// Show the comparator chain for an object type
    Chain {
        /// Object type, e.g. "unique_constraint"
        object_type: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    if cli.verbose {
        eprintln!("{} dialect: {}", "Using".cyan(), config.dialect.as_str());
    }

    let registry = Registry::standard_builder().max_depth(config.max_depth).build();
    let context = CompareContext::from_config(&config);

    match cli.command {
        Commands::Diff {
            reference,
            comparison,
            output,
            json,
        } => diff_command(&config, &registry, &context, &reference, &comparison, &output, json, cli.verbose),
        Commands::Hash { snapshot } => hash_command(&registry, &context, &snapshot),
        Commands::Chain { object_type } => chain_command(&registry, &object_type),
    }
}

/// Explicit path, then $SCHEMADELTA_CONFIG, then `fallback` if it exists
fn resolve_config_path(explicit: Option<&Path>, from_env: Option<PathBuf>, fallback: &Path) -> Option<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .or(from_env)
        .or_else(|| Some(fallback.to_path_buf()).filter(|p| p.exists()))
}

fn load_config(explicit: Option<&Path>, verbose: bool) -> Result<Config> {
    let from_env = std::env::var_os("SCHEMADELTA_CONFIG").map(PathBuf::from);
    let path = resolve_config_path(explicit, from_env, Path::new("schemadelta.toml"));

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            if verbose {
                eprintln!("{} {}", "Loading config from:".cyan(), path.display());
            }
            Config::from_file(&path).with_context(|| format!("Failed to load config {}", path.display()))
        }
        None => {
            tracing::debug!("no config file found, using defaults");
            if verbose {
                eprintln!("{}", "No config file found, using defaults".yellow());
            }
            Ok(Config::default())
        }
    }
}

fn load_snapshot(path: &Path, verbose: bool) -> Result<Snapshot> {
    if verbose {
        eprintln!("{} {}", "Loading snapshot from:".cyan(), path.display());
    }
    let snapshot = Snapshot::from_file(path).with_context(|| format!("Failed to load snapshot {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        label = %snapshot.label,
        objects = snapshot.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Diff command - compare two snapshots and write a report
#[allow(clippy::too_many_arguments)]
fn diff_command(
    config: &Config,
    registry: &Registry,
    context: &CompareContext,
    reference_path: &Path,
    comparison_path: &Path,
    output: &Path,
    json: bool,
    verbose: bool,
) -> Result<()> {
    let reference = load_snapshot(reference_path, verbose)?;
    let comparison = load_snapshot(comparison_path, verbose)?;

    if verbose {
        eprintln!(
            "{} {} ({} objects) against {} ({} objects)...",
            "Comparing".cyan(),
            comparison.label,
            comparison.len(),
            reference.label,
            reference.len()
        );
    }

    let diff = SnapshotDiffer::new(registry, context)
        .with_filters(config.filters.clone())
        .diff(&reference, &comparison);
    let report = diff.to_report(config, &reference, &comparison);

    report.save_to_file(output)?;
    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
    } else {
        print_summary(&report);
    }

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Print diff report summary
fn print_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Schema Diff Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    if let (Some(reference), Some(comparison)) = (&report.reference, &report.comparison) {
        println!("Reference:  {} ({} objects)", reference.label, reference.objects);
        println!("Comparison: {} ({} objects)", comparison.label, comparison.objects);
        println!();
    }

    println!("{}", "Summary:".bold());
    println!("  Objects matched: {}", report.summary.objects_matched);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:     {}", report.summary.info);
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ Snapshots match!".green().bold());
    } else {
        println!("{}", "Differences:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            for change in &diag.changes {
                println!(
                    "    {}: {} -> {}",
                    change.attribute,
                    change.reference.as_deref().unwrap_or("<none>"),
                    change.compared.as_deref().unwrap_or("<none>")
                );
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Hash command - show how objects would be bucketed
fn hash_command(registry: &Registry, context: &CompareContext, path: &Path) -> Result<()> {
    let snapshot = load_snapshot(path, false)?;

    for object in snapshot.iter() {
        let hash = registry.hash(object, context)?;
        let bucket = match hash.primary() {
            Some(key) => key.green(),
            None => "*".yellow(),
        };
        println!(
            "{:<18} {:<40} {} {}",
            object.object_type().to_string(),
            object.display_path(),
            bucket,
            hash.to_string().dimmed()
        );
    }

    Ok(())
}

/// Chain command - list comparators in the order they run
fn chain_command(registry: &Registry, object_type: &str) -> Result<()> {
    let object_type = ObjectType::parse(object_type);
    let names = registry.chain_names(&object_type)?;

    println!("{} {}", "Comparator chain for".bold(), object_type.to_string().green());
    for (i, name) in names.iter().enumerate() {
        println!("  {}. {}", i + 1, name);
    }

    Ok(())
}
