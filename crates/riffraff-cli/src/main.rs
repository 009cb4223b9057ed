//! riffraff-upload - Riff-Raff artifact uploader
//!
//! Usage:
//!   riffraff-upload                      # Reconcile, stage, upload, comment
//!   riffraff-upload --dry-run            # Stage and list files only
//!   riffraff-upload check -o json        # Print the resolved configuration
//!
//! Inputs are read from `--input NAME=VALUE`, then `--inputs-file`, then the
//! `INPUT_<NAME>` variables GitHub Actions sets for a step.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use riffraff_core::config::inputs;
use riffraff_core::fs::digest::short;
use riffraff_core::github::CommentOutcome;
use riffraff_core::github::annotate::error_command;
use riffraff_core::pipeline::StagedEntry;
use riffraff_core::prelude::*;

#[derive(Parser)]
#[command(name = "riffraff-upload")]
#[command(about = "Upload build artifacts to Riff-Raff", long_about = None)]
struct Cli {
    #[command(flatten)]
    inputs: InputArgs,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct InputArgs {
    /// Set an input (repeatable)
    #[arg(short = 'i', long = "input", value_name = "NAME=VALUE", global = true)]
    inputs: Vec<String>,

    /// YAML file mapping input names to values
    #[arg(long, value_name = "PATH", global = true)]
    inputs_file: Option<PathBuf>,

    /// Stage and list files without uploading (same as --input dryRun=true)
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile, stage, upload, and comment on the pull request (default)
    Upload,

    /// Resolve the configuration and print it
    Check,
}

#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Machine-readable JSON
    Json,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "riffraff=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let env = Environment::from_process();

    if let Err(err) = run(cli, &env).await {
        if env.is_github_actions() {
            println!("{}", error_command(&format!("{:#}", err)));
        }
        eprintln!("Error: {:?}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, env: &Environment) -> Result<()> {
    let source = input_source(&cli.inputs, env)?;
    let configuration = ConfigReconciler::new(&source, env).reconcile()?;

    match cli.command.unwrap_or(Commands::Upload) {
        Commands::Check => match cli.format {
            OutputFormat::Table => print_configuration(&configuration),
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&configuration)?)
            }
        },
        Commands::Upload => run_upload(&configuration, env, cli.format).await?,
    }

    Ok(())
}

fn input_source(args: &InputArgs, env: &Environment) -> Result<LayeredSource> {
    let mut cli_inputs = MapSource::from_assignments(&args.inputs)?;
    if args.dry_run {
        cli_inputs.insert(inputs::DRY_RUN, "true");
    }

    let mut source = LayeredSource::new().then(cli_inputs);
    if let Some(path) = &args.inputs_file {
        source = source.then(MapSource::from_yaml_file(path)?);
    }
    Ok(source.then(ActionInputs::new(env.clone())))
}

async fn run_upload(
    configuration: &Configuration,
    env: &Environment,
    format: OutputFormat,
) -> Result<()> {
    let context = GithubContext::from_env(env);
    let working_dir = std::env::current_dir().context("Failed to read working directory")?;
    tracing::debug!("Working directory: {}", working_dir.display());
    let role_arn = configuration.role_arn.clone();

    let outcome = Pipeline::new(configuration, &context, working_dir)
        .with_annotations(env.is_github_actions())
        .run(move || async move { Arc::new(S3Store::connect(role_arn.as_deref()).await) })
        .await?;

    match format {
        OutputFormat::Table => print_outcome(configuration, &outcome),
        OutputFormat::Json => print_outcome_json(configuration, &outcome)?,
    }
    Ok(())
}

fn print_configuration(configuration: &Configuration) {
    println!("Project:      {}", configuration.project_name);
    println!("Build:        {}", configuration.build_number);
    println!("Branch:       {}", configuration.branch_name);
    println!("VCS URL:      {}", configuration.vcs_url);
    println!("Revision:     {}", configuration.revision);
    println!("Dry run:      {}", configuration.dry_run);
    println!();

    if configuration.deployments.is_empty() {
        println!("No deployments configured.");
        return;
    }

    println!("Deployments ({}):", configuration.deployments.len());
    println!("  {:<24} Sources", "Name");
    println!("  {}", "-".repeat(70));
    for deployment in &configuration.deployments {
        let sources = if deployment.sources.is_empty() {
            "-".to_string()
        } else {
            deployment.sources.join(", ")
        };
        println!("  {:<24} {}", deployment.name, sources);
    }
}

fn print_files(files: &[StagedEntry]) {
    println!("  {:<14} Path", "Digest");
    println!("  {}", "-".repeat(70));
    for file in files {
        println!("  {:<14} {}", short(&file.digest), file.path);
    }
}

fn print_outcome(configuration: &Configuration, outcome: &RunOutcome) {
    match outcome {
        RunOutcome::DryRun { staging_dir, files } => {
            println!("Staged {} files in {}:", files.len(), staging_dir.display());
            print_files(files);
            println!();
            println!("• Dry run, nothing uploaded");
        }
        RunOutcome::Uploaded {
            report, comment, ..
        } => {
            println!(
                "✓ Uploaded {} artifacts for {} build {}",
                report.artifacts, configuration.project_name, configuration.build_number
            );
            println!("  Prefix:   {}", report.key_prefix);
            println!("  Manifest: {}", report.manifest_key);
            match comment {
                Some(CommentOutcome::Created { pull_request }) => {
                    println!("✓ Commented on PR #{}", pull_request)
                }
                Some(CommentOutcome::Updated { pull_request, .. }) => {
                    println!("✓ Updated comment on PR #{}", pull_request)
                }
                None => {}
            }
        }
    }
}

fn print_outcome_json(configuration: &Configuration, outcome: &RunOutcome) -> Result<()> {
    let output = match outcome {
        RunOutcome::DryRun { staging_dir, files } => serde_json::json!({
            "dryRun": true,
            "projectName": configuration.project_name,
            "buildNumber": configuration.build_number,
            "stagingDir": staging_dir,
            "files": files
                .iter()
                .map(|f| serde_json::json!({ "path": f.path, "blake3": f.digest }))
                .collect::<Vec<_>>(),
        }),
        RunOutcome::Uploaded {
            staging_dir,
            report,
            comment,
        } => serde_json::json!({
            "dryRun": false,
            "projectName": configuration.project_name,
            "buildNumber": configuration.build_number,
            "stagingDir": staging_dir,
            "keyPrefix": report.key_prefix,
            "artifacts": report.artifacts,
            "manifestKey": report.manifest_key,
            "pullRequest": comment.as_ref().map(|c| match c {
                CommentOutcome::Created { pull_request }
                | CommentOutcome::Updated { pull_request, .. } => *pull_request,
            }),
        }),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
