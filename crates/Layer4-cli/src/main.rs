//! Cadence CLI - Main entry point

mod cli;

use clap::{Args as ClapArgs, Parser, Subcommand};
use cadence_foundation::CadenceConfig;
use cadence_provider::GenerationMode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Cadence - submit and track music generation tasks
#[derive(Parser, Debug)]
#[command(name = "cadence")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// API key for the generation service (overrides env and config)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Base URL of the generation service (overrides env and config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Also print request/response/poll records
    #[arg(long, global = true)]
    api_log: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

/// Options shared by every generation command
#[derive(ClapArgs, Debug, Clone)]
pub struct GenerationArgs {
    /// Prompt (lyrics in custom mode)
    #[arg(short, long, default_value = "")]
    pub prompt: String,

    /// Model version (V3_5, V4, V4_5, V4_5PLUS, V5)
    #[arg(short, long, default_value = "V4")]
    pub model: String,

    /// Custom mode: title and style are supplied explicitly
    #[arg(long)]
    pub custom: bool,

    /// Title (custom mode)
    #[arg(long, default_value = "")]
    pub title: String,

    /// Style (custom mode)
    #[arg(long, default_value = "")]
    pub style: String,

    /// No vocals
    #[arg(long)]
    pub instrumental: bool,

    /// Styles to avoid
    #[arg(long)]
    pub negative_tags: Option<String>,

    /// Vocal gender (m or f)
    #[arg(long)]
    pub vocal_gender: Option<String>,

    /// Callback URL sent to the service
    #[arg(long)]
    pub callback_url: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new track from a prompt
    Generate(GenerationArgs),
    /// Cover an uploaded track
    Cover {
        /// URL of the source audio
        #[arg(long)]
        upload_url: String,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Extend an uploaded track
    Extend {
        /// URL of the source audio
        #[arg(long)]
        upload_url: String,
        /// Position in seconds to continue from
        #[arg(long)]
        continue_at: f64,
        #[command(flatten)]
        generation: GenerationArgs,
    },
    /// Follow an existing task until it finishes
    Track {
        /// Remote task id
        task_id: String,
    },
    /// Check the status of a task once
    Status {
        /// Remote task id
        task_id: String,
    },
    /// Show remaining credits
    Credits,
    /// Write the effective configuration to ./.cadence/config.json
    Init {
        /// Overwrite an existing project configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr; stdout carries events)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    // Load configuration
    let mut config = CadenceConfig::load()?;
    if let Some(base_url) = &args.base_url {
        config.api.base_url = Some(base_url.clone());
    }
    if let Some(api_key) = &args.api_key {
        config.api.api_key = Some(api_key.clone());
    }

    let options = cli::RunOptions {
        api_log: args.api_log,
    };

    match args.command {
        Command::Generate(generation) => {
            let request = cli::build_request(GenerationMode::Generate, &generation)?;
            cli::run_submit(&config, request, options).await
        }
        Command::Cover {
            upload_url,
            generation,
        } => {
            let request = cli::build_request(GenerationMode::Cover { upload_url }, &generation)?;
            cli::run_submit(&config, request, options).await
        }
        Command::Extend {
            upload_url,
            continue_at,
            generation,
        } => {
            let request = cli::build_request(
                GenerationMode::Extend {
                    upload_url,
                    continue_at,
                },
                &generation,
            )?;
            cli::run_submit(&config, request, options).await
        }
        Command::Track { task_id } => cli::run_track(&config, task_id, options).await,
        Command::Status { task_id } => cli::run_status(&config, task_id).await,
        Command::Credits => cli::run_credits(&config).await,
        Command::Init { force } => cli::run_init(&config, force),
    }
}
