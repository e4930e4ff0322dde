use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use samples_flow::api::{discover_namespace, HttpResourceClient, InMemoryResourceClient, ResourceClient};
use samples_flow::config::Config;
use samples_flow::env_vars::env_vars_by_category;
use samples_flow::logging;
use samples_flow::samples::{self, answers, SamplesPlanner};
use samples_flow::submission::{ResourceSubmitter, SubmissionAdapter};
use samples_flow::wizard::{FieldKind, SubmissionOutcome};

#[derive(Parser)]
#[command(name = "samples-flow")]
#[command(about = "Create an application and component through the samples wizard")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the wizard steps and their fields
    Steps,

    /// Run the wizard from an answers file and submit the result
    Run {
        /// Answers file (.json, .yaml or .toml)
        #[arg(short, long)]
        answers: PathBuf,

        /// Submit against an in-memory backend instead of the cluster
        #[arg(long)]
        dry_run: bool,

        /// Namespace to create resources in (overrides config)
        #[arg(short, long)]
        namespace: Option<String>,
    },

    /// Show the namespace resources would be created in
    Namespace,

    /// List supported environment variables
    Env,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first (needed for logging setup)
    let config = Config::load(cli.config.as_deref())?;

    let logging_handle = logging::init_logging(&config, cli.debug)?;

    let result = match cli.command {
        Commands::Steps => cmd_steps(),
        Commands::Run {
            answers,
            dry_run,
            namespace,
        } => cmd_run(&config, answers, dry_run, namespace).await,
        Commands::Namespace => cmd_namespace(&config).await,
        Commands::Env => {
            cmd_env();
            Ok(())
        }
    };

    // Print log file path on exit if logs were written
    if let Some(log_path) = logging_handle.log_file_path {
        if log_path.metadata().map(|m| m.len() > 0).unwrap_or(false) {
            eprintln!("Session log: {}", log_path.display());
        }
    }

    result
}

fn cmd_steps() -> Result<()> {
    let session = samples::new_session()?;

    for (i, step) in session.steps().iter().enumerate() {
        let conditional = if step.is_conditional() {
            " (conditional)"
        } else {
            ""
        };
        println!("{}. {} [{}]{}", i + 1, step.title(), step.id(), conditional);
        if let Some(description) = step.description() {
            println!("   {}", description);
        }
        for field in step.fields() {
            let marker = if field.required { "*" } else { " " };
            println!("   {} {:<28} {}", marker, field.path, field.label);
            if field.kind == FieldKind::Choice {
                for option in &field.options {
                    let note = if option.is_disabled { " (unavailable)" } else { "" };
                    println!("       - {}: {}{}", option.value, option.label, note);
                }
            }
        }
    }

    Ok(())
}

fn backend(config: &Config, dry_run: bool) -> Result<Arc<dyn ResourceClient>> {
    if dry_run {
        return Ok(Arc::new(InMemoryResourceClient::new()));
    }
    let client = HttpResourceClient::from_config(&config.api)
        .context("Failed to create API client")?;
    Ok(Arc::new(client))
}

async fn cmd_run(
    config: &Config,
    answers_path: PathBuf,
    dry_run: bool,
    namespace: Option<String>,
) -> Result<()> {
    let answers = answers::load_answers(&answers_path)?;
    let mut session = samples::new_session()?;

    let report = answers::fill_and_advance(&mut session, &answers)
        .with_context(|| format!("Wizard stopped at step '{}'", session.current_step().id()))?;
    println!("Steps: {}", report.visited.join(" -> "));

    let client = backend(config, dry_run)?;
    let submitter = ResourceSubmitter::new(client, SamplesPlanner)
        .with_namespace(namespace.or_else(|| config.api.namespace.clone()));

    if dry_run {
        println!("Dry run: submitting to an in-memory backend");
    }

    let result = submitter.submit(&report.request).await;
    match session.finish_submission(&report.request, result) {
        SubmissionOutcome::Submitted(receipt) => {
            println!("Created:");
            for resource in &receipt.resources {
                println!("  {}", resource);
            }
            for orphan in &receipt.orphans {
                println!("  left behind: {}", orphan);
            }
            Ok(())
        }
        SubmissionOutcome::Failed(failure) => {
            for resource in failure.existing_resources() {
                println!("  exists: {}", resource);
            }
            if failure.requires_verification() {
                println!("The outcome of the last call is unknown; check the cluster before retrying.");
            }
            bail!("Submission failed: {}", failure)
        }
        SubmissionOutcome::Ignored => bail!("Submission result was not recorded"),
    }
}

async fn cmd_namespace(config: &Config) -> Result<()> {
    if let Some(ns) = &config.api.namespace {
        println!("{} (from config)", ns);
        return Ok(());
    }

    let client = HttpResourceClient::from_config(&config.api)
        .context("Failed to create API client")?;
    match discover_namespace(&client).await? {
        Some(ns) => println!("{} (first project)", ns),
        None => println!("No projects visible; resources would go to 'default'"),
    }
    Ok(())
}

fn cmd_env() {
    for (category, vars) in env_vars_by_category() {
        println!("{}", category.display_name());
        println!("{}", "─".repeat(60));
        for var in vars {
            println!("  {}", var.name);
            println!("      {}", var.description);
            if let Some(default) = var.default {
                println!("      default: {}", default);
            }
            if let Some(example) = var.example {
                println!("      example: {}", example);
            }
        }
        println!();
    }
}
