//! TF-AVM - Terraform projects from Azure Verified Modules
//!
//! ## Commands
//!
//! - `modules`: list, search and describe catalog entries
//! - `resolve` / `recommend`: map services to modules with dependencies
//! - `generate`: write a project, optionally self-correcting it first
//! - `correct` / `score`: repair or score a project on disk
//! - `dataset`: export training examples as JSONL
//! - `rollout`: show the rollout assignment of a session
//! - `versions`: compare pinned module versions with the registry

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing::{info, Level};

use tf_avm_check::{CommandTextGenerator, TerraformFmt};
use tf_avm_core::obs::TaskSpan;
use tf_avm_core::project::ROOT_FILE;
use tf_avm_core::rollout::bucket;
use tf_avm_core::{
    read_project, write_project, Catalog, LogSink, ProjectGenerator, ProjectOutput,
    RegistryClient, Resolver, RolloutGate, SelfCorrector, Settings, TaskTracer, TrainingDataset,
};

#[derive(Parser)]
#[command(name = "tf-avm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate Terraform projects from Azure Verified Modules", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Settings file (TOML)
    #[arg(long, global = true, env = "TF_AVM_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the module catalog
    Modules {
        #[command(subcommand)]
        action: ModulesAction,
    },

    /// Resolve service names to modules, dependencies included
    Resolve {
        /// Service names or aliases
        #[arg(required = true)]
        services: Vec<String>,
    },

    /// Recommend modules for free-form service descriptions
    Recommend {
        /// Service descriptions
        #[arg(required = true)]
        descriptions: Vec<String>,
    },

    /// Generate a project for the given services
    Generate {
        /// Service names or aliases
        #[arg(required = true)]
        services: Vec<String>,

        /// Project name
        #[arg(short, long)]
        name: String,

        /// Azure region (default from settings)
        #[arg(short, long)]
        location: Option<String>,

        /// Output directory (prints to stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Replace existing files
        #[arg(long)]
        overwrite: bool,

        /// Command that answers correction prompts on stdin; enables
        /// self-correction before writing
        #[arg(long)]
        generator: Option<String>,
    },

    /// Self-correct the project in a directory
    Correct {
        /// Project directory
        dir: PathBuf,

        /// Command that answers correction prompts on stdin
        #[arg(long)]
        generator: String,

        /// Seconds to wait for each answer
        #[arg(long, default_value = "120")]
        timeout: u64,

        /// Write the corrected root file back
        #[arg(long)]
        write: bool,
    },

    /// Score the project in a directory
    Score {
        /// Project directory
        dir: PathBuf,

        /// External feedback value passed through to the reward
        #[arg(long)]
        feedback: Option<f64>,

        /// Skip the formatter check
        #[arg(long)]
        no_fmt: bool,
    },

    /// Export the training dataset as JSONL
    Dataset {
        /// Output file
        #[arg(default_value = "data/training.jsonl")]
        output: PathBuf,
    },

    /// Show the rollout assignment for a session
    Rollout {
        /// Session identifier
        session: Option<String>,
    },

    /// Compare pinned module versions with the registry
    Versions {
        /// Modules to check (all when omitted)
        modules: Vec<String>,

        /// Ignore cached versions
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Subcommand)]
enum ModulesAction {
    /// List modules, optionally for one category
    List {
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Search names, descriptions, categories and aliases
    Search { query: String },

    /// Show one module in detail
    Info { name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tf_avm_core::init_tracing(cli.json, level);

    let settings = Settings::load_or_default(cli.config.as_deref())
        .context("Failed to load settings")?;

    match cli.command {
        Commands::Modules { action } => {
            cmd_modules(action);
            Ok(())
        }
        Commands::Resolve { services } => cmd_resolve(&services),
        Commands::Recommend { descriptions } => {
            cmd_recommend(&descriptions);
            Ok(())
        }
        Commands::Generate {
            services,
            name,
            location,
            output,
            overwrite,
            generator,
        } => {
            cmd_generate(
                &settings,
                &services,
                &name,
                location.as_deref(),
                output.as_deref(),
                overwrite,
                generator.as_deref(),
            )
            .await
        }
        Commands::Correct {
            dir,
            generator,
            timeout,
            write,
        } => cmd_correct(&settings, &dir, &generator, timeout, write).await,
        Commands::Score {
            dir,
            feedback,
            no_fmt,
        } => cmd_score(&settings, &dir, feedback, no_fmt).await,
        Commands::Dataset { output } => cmd_dataset(&output),
        Commands::Rollout { session } => cmd_rollout(session.as_deref()),
        Commands::Versions { modules, refresh } => cmd_versions(&settings, &modules, refresh).await,
    }
}

fn cmd_modules(action: ModulesAction) {
    let catalog = Catalog::builtin();
    match action {
        ModulesAction::List { category } => println!("{}", catalog.render_listing(category.as_deref())),
        ModulesAction::Search { query } => {
            let hits = catalog.search(&query);
            if hits.is_empty() {
                println!("No modules match '{query}'.");
            }
            for entry in hits {
                println!("{:<28} {:<11} {}", entry.name, entry.category, entry.description);
            }
        }
        ModulesAction::Info { name } => println!("{}", catalog.render_info(&name)),
    }
}

fn cmd_resolve(services: &[String]) -> Result<()> {
    let resolution = Resolver::new(Catalog::builtin()).resolve(services);
    for entry in &resolution.resolved.entries {
        println!("{:<28} {} {}", entry.name, entry.source, entry.version_constraint());
    }
    if !resolution.unresolved.is_empty() {
        eprintln!("Unresolved: {}", resolution.unresolved.join(", "));
    }
    if resolution.resolved.is_empty() {
        anyhow::bail!("no requested service matched a catalog module");
    }
    Ok(())
}

fn cmd_recommend(descriptions: &[String]) {
    let recommendation = Resolver::new(Catalog::builtin()).recommend(descriptions);
    println!("{}", recommendation.render());
}

fn text_generator(command: &str, timeout_secs: u64) -> Result<Arc<CommandTextGenerator>> {
    if command.split_whitespace().next().is_none() {
        anyhow::bail!("generator command is empty");
    }
    Ok(Arc::new(CommandTextGenerator::from_command_line(command, timeout_secs)))
}

async fn self_correct(
    settings: &Settings,
    project: &ProjectOutput,
    generator: Arc<CommandTextGenerator>,
) -> ProjectOutput {
    let task_id = uuid::Uuid::new_v4().to_string();
    let _span = TaskSpan::enter(&task_id);
    let mut input = serde_json::Map::new();
    input.insert("summary".to_string(), json!(project.summary));
    input.insert("files".to_string(), json!(project.files.len()));
    let tracer = TaskTracer::start(Arc::new(LogSink), task_id, &input);

    let corrector = SelfCorrector::new(generator, settings.correction_policy());
    let outcome = corrector.run(project, &tracer).await;

    let fixes: Vec<&str> = outcome.fixes_applied.iter().map(|k| k.as_str()).collect();
    println!(
        "Self-correction: {:?} after {} iteration(s); fixes: {}",
        outcome.final_state,
        outcome.iterations,
        if fixes.is_empty() { "none".to_string() } else { fixes.join(", ") }
    );
    for issue in &outcome.issues {
        println!("  - [{}] {}: {}", issue.kind, issue.file, issue.message);
    }

    let best = outcome.best().clone();
    tracer.end(outcome.success, Some(&best.summary));
    best
}

async fn cmd_generate(
    settings: &Settings,
    services: &[String],
    name: &str,
    location: Option<&str>,
    output: Option<&Path>,
    overwrite: bool,
    generator: Option<&str>,
) -> Result<()> {
    let resolution = Resolver::new(Catalog::builtin()).resolve(services);
    if !resolution.unresolved.is_empty() {
        eprintln!("Unresolved: {}", resolution.unresolved.join(", "));
    }

    let mut project = ProjectGenerator::new(settings.generator.default_location.clone())
        .generate(&resolution.resolved, name, location);

    if let Some(command) = generator {
        let generator = text_generator(command, 120)?;
        project = self_correct(settings, &project, generator).await;
    }

    match output {
        Some(dir) => {
            let report = write_project(dir, &project, overwrite)
                .context(format!("Failed to write project to {}", dir.display()))?;
            for path in &report.written {
                println!("wrote   {}", path.display());
            }
            for path in &report.skipped {
                println!("skipped {} (exists; use --overwrite)", path.display());
            }
            println!();
            println!("{}", project.summary);
        }
        None => {
            for file in &project.files {
                println!("# --- {} ---", file.name);
                println!("{}", file.content);
            }
        }
    }
    Ok(())
}

async fn cmd_correct(
    settings: &Settings,
    dir: &Path,
    generator: &str,
    timeout: u64,
    write: bool,
) -> Result<()> {
    let project = read_project(dir).context(format!("Failed to read project in {}", dir.display()))?;
    let generator = text_generator(generator, timeout)?;
    let corrected = self_correct(settings, &project, generator).await;

    if corrected.root() == project.root() {
        println!("No changes to {ROOT_FILE}.");
        return Ok(());
    }
    if write {
        if let Some(root) = corrected.root() {
            let path = dir.join(ROOT_FILE);
            std::fs::write(&path, &root.content)
                .context(format!("Failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote corrected root file");
            println!("Updated {}", path.display());
        }
    } else if let Some(root) = corrected.root() {
        println!("{}", root.content);
    }
    Ok(())
}

async fn cmd_score(settings: &Settings, dir: &Path, feedback: Option<f64>, no_fmt: bool) -> Result<()> {
    let project = read_project(dir).context(format!("Failed to read project in {}", dir.display()))?;
    let mut calculator = settings.reward_calculator()?;
    if !no_fmt {
        calculator = calculator.with_format_checker(Arc::new(TerraformFmt::from_settings(&settings.checker)));
    }

    let breakdown = calculator.score(&project, feedback).await;
    println!("{}", serde_json::to_string_pretty(&breakdown)?);
    Ok(())
}

fn cmd_dataset(output: &Path) -> Result<()> {
    let count = TrainingDataset::new(Catalog::builtin())
        .write_jsonl(output)
        .context(format!("Failed to write dataset to {}", output.display()))?;
    println!("Wrote {count} examples to {}", output.display());
    Ok(())
}

fn cmd_rollout(session: Option<&str>) -> Result<()> {
    let gate = RolloutGate::from_env().context("Invalid rollout configuration")?;
    let assigned = gate.assign(session);
    let report = json!({
        "enabled": gate.enabled,
        "fraction": gate.fraction,
        "session": session,
        "bucket": session.map(bucket),
        "assigned": assigned,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_versions(settings: &Settings, modules: &[String], refresh: bool) -> Result<()> {
    let catalog = Catalog::builtin();
    let entries: Vec<_> = if modules.is_empty() {
        catalog.entries().iter().collect()
    } else {
        modules
            .iter()
            .map(|m| catalog.lookup(m).with_context(|| format!("Unknown module: {m}")))
            .collect::<Result<_>>()?
    };

    let client = RegistryClient::new(&settings.registry).context("Failed to build registry client")?;
    if refresh {
        for entry in &entries {
            client.cache().invalidate(&entry.source);
        }
    }

    let sources: Vec<&str> = entries.iter().map(|e| e.source.as_str()).collect();
    let latest = client.batch_latest(&sources).await;

    println!("{:<28} {:<10} {:<10}", "MODULE", "PINNED", "LATEST");
    for entry in entries {
        let newest = latest.get(&entry.source).cloned().flatten();
        let marker = match &newest {
            Some(v) if v != &entry.version => " *",
            _ => "",
        };
        println!(
            "{:<28} {:<10} {:<10}{}",
            entry.name,
            entry.version,
            newest.as_deref().unwrap_or("unknown"),
            marker
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_arguments_parse() {
        let cli = Cli::try_parse_from([
            "tf-avm", "generate", "vm", "storage", "--name", "demo", "--output", "out",
        ])
        .unwrap();
        match cli.command {
            Commands::Generate {
                services, name, output, generator, ..
            } => {
                assert_eq!(services, vec!["vm", "storage"]);
                assert_eq!(name, "demo");
                assert_eq!(output, Some(PathBuf::from("out")));
                assert!(generator.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_resolve_requires_a_service() {
        assert!(Cli::try_parse_from(["tf-avm", "resolve"]).is_err());
    }

    #[test]
    fn test_empty_generator_command_is_rejected() {
        assert!(text_generator("   ", 5).is_err());
    }

    #[tokio::test]
    async fn test_generate_writes_project() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("proj");
        cmd_generate(
            &Settings::default(),
            &["key_vault".to_string()],
            "demo",
            None,
            Some(&out),
            false,
            None,
        )
        .await
        .unwrap();

        let project = read_project(&out).unwrap();
        assert_eq!(project.files.len(), 2);
        assert!(project.root().unwrap().content.contains("module \"key_vault\""));
    }
}
