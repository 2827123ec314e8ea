// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity Validator CLI
//!
//! ```bash
//! # Structural checks only
//! entity-validator validate project.yml
//!
//! # Structural + data checks over pre-extracted samples (<dir>/<entity>.json)
//! entity-validator validate project.yml --samples samples/
//!
//! # Dependency graph, processing order and cycles
//! entity-validator graph project.yml
//!
//! # Preview, then apply, the automatic fixes
//! entity-validator fix project.yml --dry-run
//! entity-validator fix project.yml --apply
//!
//! # Backups taken before each apply
//! entity-validator backups project.yml
//! entity-validator restore project.yml project_20260101T120000.000000Z.yml
//! ```
//!
//! Settings come from `--settings <file.toml>` and `ENTITY_VALIDATOR_*`
//! environment variables; logging is controlled by `RUST_LOG`.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;

use entity_validator::core::config::{FlatConfig, ProjectConfig, PropertySource, ValidatorSettings};
use entity_validator::core::data::JsonFileSampler;
use entity_validator::core::error::{ValidatorError, ValidatorResult};
use entity_validator::core::fix::{suggest_fixes, AutoFixEngine};
use entity_validator::core::persistence::{ConfigStore, FileConfigStore};
use entity_validator::core::service::{ValidationOptions, ValidationService};
use entity_validator::core::validation::{format_cycle, ValidationIssue, ValidationResult};

#[derive(Parser)]
#[command(name = "entity-validator")]
#[command(version)]
#[command(about = "Validate entity configurations and apply safe automatic fixes")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "text", value_enum)]
    format: OutputFormat,

    /// TOML settings file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Backup directory, overriding settings and environment
    #[arg(long, global = true)]
    backup_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Args)]
struct DataArgs {
    /// Directory of `<entity>.json` samples; enables data checks
    #[arg(long)]
    samples: Option<PathBuf>,

    /// Restrict data checks to these entities
    #[arg(long = "entity")]
    entities: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run structural (and optionally data-aware) validation
    Validate {
        config: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },

    /// Show the dependency graph, processing order and cycles
    Graph { config: PathBuf },

    /// Preview or apply automatic fixes for the current issues
    Fix {
        config: PathBuf,

        /// Show the proposed changes without writing anything
        #[arg(long, conflicts_with = "apply", required_unless_present = "apply")]
        dry_run: bool,

        /// Back up the configuration and apply every automatic fix
        #[arg(long)]
        apply: bool,

        /// Only fix issues with these codes
        #[arg(long = "code")]
        codes: Vec<String>,

        #[command(flatten)]
        data: DataArgs,
    },

    /// List backups of a configuration
    Backups { config: PathBuf },

    /// Restore a configuration from a named backup
    Restore { config: PathBuf, backup: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    let format = cli.format;

    let outcome = match load_settings(cli.settings.as_deref(), cli.backup_dir.as_deref()) {
        Ok(settings) => run(cli.command, settings, format).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "error": e.to_string() }));
                }
                OutputFormat::Text => eprintln!("error: {}", e),
            }
            ExitCode::from(2)
        }
    }
}

fn load_settings(path: Option<&Path>, backup_dir: Option<&Path>) -> ValidatorResult<ValidatorSettings> {
    let mut flat = match path {
        Some(path) => FlatConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => FlatConfig::new(),
    };
    flat.apply_env(std::env::vars());
    if let Some(dir) = backup_dir {
        flat.set("fix.backup-dir", dir.display().to_string(), PropertySource::Override);
    }
    ValidatorSettings::from_flat_config(&flat)
}

async fn run(command: Commands, settings: ValidatorSettings, format: OutputFormat) -> ValidatorResult<ExitCode> {
    match command {
        Commands::Validate { config, data } => cmd_validate(&config, &data, settings, format).await,
        Commands::Graph { config } => cmd_graph(&config, settings, format),
        Commands::Fix {
            config,
            dry_run,
            apply: _,
            codes,
            data,
        } => cmd_fix(&config, dry_run, &codes, &data, settings, format).await,
        Commands::Backups { config } => cmd_backups(&config, settings, format),
        Commands::Restore { config, backup } => cmd_restore(&config, &backup, settings, format),
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn cmd_validate(
    path: &Path,
    data: &DataArgs,
    settings: ValidatorSettings,
    format: OutputFormat,
) -> ValidatorResult<ExitCode> {
    let config = ProjectConfig::from_path(path)?;
    let result = validate(&config, data, settings).await;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Text => print_result(&result),
    }
    Ok(if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_graph(path: &Path, settings: ValidatorSettings, format: OutputFormat) -> ValidatorResult<ExitCode> {
    let config = ProjectConfig::from_path(path)?;
    let report = ValidationService::new(settings).graph(&config);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => {
            println!("{} entities, {} dependencies", report.entities.len(), report.edges.len());
            for (from, to) in &report.edges {
                println!("  {} → {}", from, to);
            }
            match &report.order {
                Some(order) => println!("Processing order: {}", order.join(", ")),
                None => {
                    println!("Cycles:");
                    for cycle in &report.cycles {
                        println!("  {}", format_cycle(cycle));
                    }
                }
            }
        }
    }
    Ok(if report.cycles.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn cmd_fix(
    path: &Path,
    dry_run: bool,
    codes: &[String],
    data: &DataArgs,
    settings: ValidatorSettings,
    format: OutputFormat,
) -> ValidatorResult<ExitCode> {
    let config = ProjectConfig::from_path(path)?;
    let backup_dir = settings.backup_dir.clone();
    let result = validate(&config, data, settings).await;

    let issues: Vec<ValidationIssue> = result
        .issues()
        .filter(|issue| codes.is_empty() || codes.contains(&issue.code))
        .cloned()
        .collect();

    let (store, config_id) = FileConfigStore::for_file(path)?;
    let store: Arc<dyn ConfigStore> = Arc::new(store);
    let engine = AutoFixEngine::new(store, backup_dir);

    if dry_run {
        let preview = engine.preview(&config, &issues)?;
        match format {
            OutputFormat::Json => print_json(&preview)?,
            OutputFormat::Text => {
                println!(
                    "{} of {} suggestion(s) can be applied automatically",
                    preview.fixable_count, preview.total_suggestions
                );
                for change in &preview.changes {
                    let location = change.entity.as_deref().unwrap_or("-");
                    if change.auto_fixable {
                        for action in &change.actions {
                            println!("  [auto]   {} {}: {}", change.issue_code, location, action.description);
                        }
                        if let Some(warning) = &change.warning {
                            println!("           warning: {}", warning);
                        }
                    } else {
                        println!(
                            "  [manual] {} {}: {}",
                            change.issue_code,
                            location,
                            change.manual_explanation.as_deref().unwrap_or("")
                        );
                    }
                }
                for error in &preview.errors {
                    println!("  [error]  {}", error);
                }
                if !preview.diff.is_empty() {
                    println!("\n{}", preview.diff);
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (fixable, manual): (Vec<_>, Vec<_>) = suggest_fixes(&issues, &config)
        .into_iter()
        .partition(|suggestion| suggestion.auto_fixable);
    let skipped = manual.len();
    let fixable: Vec<ValidationIssue> = fixable.into_iter().map(|suggestion| suggestion.issue).collect();

    let applied = engine.apply(&config_id, &fixable)?;
    match format {
        OutputFormat::Json => print_json(&applied)?,
        OutputFormat::Text => {
            if applied.success {
                println!("Applied {} fix(es); {} issue(s) need manual work", applied.fixes_applied, skipped);
            } else {
                println!("No fixes applied ({:?})", applied.state);
                for error in &applied.errors {
                    println!("  {}", error);
                }
            }
            if let Some(backup) = &applied.backup_path {
                println!("Backup: {}", backup.display());
            }
        }
    }
    Ok(if applied.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn cmd_backups(path: &Path, settings: ValidatorSettings, format: OutputFormat) -> ValidatorResult<ExitCode> {
    let (store, config_id) = FileConfigStore::for_file(path)?;
    let engine = AutoFixEngine::new(Arc::new(store), settings.backup_dir);
    let backups = engine.list_backups(&config_id)?;

    match format {
        OutputFormat::Json => print_json(&backups)?,
        OutputFormat::Text => {
            if backups.is_empty() {
                println!("No backups for '{}'", config_id);
            }
            for backup in &backups {
                println!(
                    "{}  {}  {} bytes  sha256:{}",
                    backup.name,
                    backup.created_at.to_rfc3339(),
                    backup.size,
                    backup.checksum
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_restore(
    path: &Path,
    backup: &str,
    settings: ValidatorSettings,
    format: OutputFormat,
) -> ValidatorResult<ExitCode> {
    let (store, config_id) = FileConfigStore::for_file(path)?;
    let engine = AutoFixEngine::new(Arc::new(store), settings.backup_dir);
    let pre_restore = engine.restore(&config_id, backup)?;

    match format {
        OutputFormat::Json => print_json(&pre_restore)?,
        OutputFormat::Text => println!(
            "Restored '{}' from {}; previous version saved as {}",
            config_id, backup, pre_restore.name
        ),
    }
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// HELPERS
// =============================================================================

async fn validate(config: &ProjectConfig, data: &DataArgs, settings: ValidatorSettings) -> ValidationResult {
    let mut service = ValidationService::new(settings);
    let options = match &data.samples {
        Some(dir) => {
            service = service.with_sampler(Arc::new(JsonFileSampler::new(dir)));
            ValidationOptions {
                include_data: true,
                entities: (!data.entities.is_empty()).then(|| data.entities.clone()),
            }
        }
        None => ValidationOptions::structural_only(),
    };
    service.validate_with_options(config, &options).await
}

fn print_json<T: Serialize>(value: &T) -> ValidatorResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| ValidatorError::parse("JSON", e.to_string()))?;
    println!("{}", json);
    Ok(())
}

fn print_result(result: &ValidationResult) {
    for issue in result.issues() {
        println!("{}", issue);
        if let Some(suggestion) = &issue.suggestion {
            println!("    hint: {}", suggestion);
        }
    }
    let unavailable = result.unavailable_checks().count();
    println!(
        "{}: {} error(s), {} warning(s){}",
        if result.is_valid { "VALID" } else { "INVALID" },
        result.error_count,
        result.warning_count,
        if unavailable > 0 {
            format!(", {} check(s) could not run", unavailable)
        } else {
            String::new()
        }
    );
}
