// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use cloudlive_client::commands::report_error;
use cloudlive_client::config::{self, Config};
use cloudlive_client::shell::PromptGate;
use cloudlive_client::{AutoAdvance, MenuCommand, WorkflowOutcome};
use std::path::PathBuf;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Live stream API example client", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "cloudlive.toml")]
    config: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the interactive menu (default)
    Shell,
    /// Run the guided create, start, watch and delete workflow
    Workflow {
        /// Continue through every step without asking
        #[arg(short, long)]
        yes: bool,
        /// Encoder preset to create (file stem under live_stream/encoder_types)
        #[arg(short, long)]
        preset: Option<String>,
    },
    /// Show the number of live streams in the account
    Count,
    /// List all live streams of the account
    List {
        /// Print only id and name of each stream
        #[arg(short, long)]
        simple: bool,
    },
    /// Create a live stream from a preset or a JSON/YAML file
    Create {
        /// Encoder preset (default: workflow.preset from the configuration)
        #[arg(short, long)]
        preset: Option<String>,
        /// Request body file, sent as is
        #[arg(short, long, conflicts_with = "preset")]
        body: Option<PathBuf>,
    },
    /// Show the details of a live stream
    Show { id: String },
    /// Update a live stream (default body: live_stream/update_example.json)
    Update {
        id: String,
        /// Request body file, sent as is
        #[arg(short, long)]
        body: Option<PathBuf>,
    },
    /// Start a stopped live stream
    Start { id: String },
    /// Reset a started live stream
    Reset { id: String },
    /// Stop a started live stream
    Stop { id: String },
    /// Show the current state of a live stream
    State { id: String },
    /// Show the thumbnail URL of a started live stream
    Thumbnail { id: String },
    /// Show the provisioning state of the player of a live stream
    PlayerState {
        /// Live stream id
        id: String,
    },
    /// Delete a live stream
    Delete { id: String },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the default configuration as TOML
    Default,
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<()> {
    if matches!(command, Commands::Shell) {
        return cloudlive_client::start_shell(config).await;
    }

    let app = cloudlive_client::connect(config)?;
    let (command, id) = match command {
        Commands::Workflow { yes, preset } => {
            let outcome = if yes {
                app.workflow(AutoAdvance, preset.as_deref()).await?
            } else {
                let mut editor = rustyline::DefaultEditor::new()?;
                app.workflow(PromptGate::new(&mut editor), preset.as_deref()).await?
            };
            return match outcome {
                WorkflowOutcome::CreateFailed { .. }
                | WorkflowOutcome::StartFailed { .. }
                | WorkflowOutcome::MissingPlayer { .. } => {
                    bail!("Workflow did not complete")
                },
                WorkflowOutcome::Completed { .. } | WorkflowOutcome::Abandoned { .. } => Ok(()),
            };
        },
        Commands::Count => {
            app.count().await?;
            return Ok(());
        },
        Commands::List { simple } => {
            app.list(simple).await?;
            return Ok(());
        },
        Commands::Create { preset, body } => {
            if let Some(path) = body {
                let body = cloudlive_client::presets::load_document(&path).await?;
                app.create(&body).await?;
            } else {
                app.create_preset(preset.as_deref().unwrap_or(&config.workflow.preset)).await?;
            }
            return Ok(());
        },
        Commands::Update { id, body } => {
            app.update(&id, body).await?;
            return Ok(());
        },
        Commands::Show { id } => (MenuCommand::Show, id),
        Commands::Start { id } => (MenuCommand::Start, id),
        Commands::Reset { id } => (MenuCommand::Reset, id),
        Commands::Stop { id } => (MenuCommand::Stop, id),
        Commands::State { id } => (MenuCommand::State, id),
        Commands::Thumbnail { id } => (MenuCommand::Thumbnail, id),
        Commands::PlayerState { id } => (MenuCommand::PlayerState, id),
        Commands::Delete { id } => (MenuCommand::Delete, id),
        Commands::Shell | Commands::Config { .. } => return Ok(()),
    };

    app.run_on_stream(command, &id)
        .await
        .with_context(|| format!("'{}' failed for live stream {id}", command.name()))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Shell);

    if let Commands::Config { command: ConfigCommands::Default } = command {
        match config::generate_default() {
            Ok(toml) => {
                println!("{toml}");
                return;
            },
            Err(e) => {
                eprintln!("Failed to generate default config: {e}");
                std::process::exit(1);
            },
        }
    }

    let config_result = match config::load(&cli.config) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    };
    let config = config_result.config;

    if let Err(e) = cloudlive_client::logging::init_logging(config.effective_log_level()) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    if let Some(path) = config_result.file_missing {
        warn!(path = %path, "Configuration file not found, using defaults and environment");
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("{e}");
        std::process::exit(1);
    }

    info!(base_url = %config.api.base_url, version = %config.api.version, "Starting live stream client");

    if let Err(e) = run(command, &config).await {
        error!(error = %e, "Command failed");
        report_error(&e);
        std::process::exit(1);
    }
}
