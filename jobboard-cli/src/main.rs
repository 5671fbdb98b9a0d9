//! Main entry point for the Jobboard CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use shared::config::ClientConfig;

mod commands;
mod tracer;

use commands::{
    chat::ChatCommand, config::ConfigFormat, feed::FeedCommand, jobs::JobsCommand,
    profile::ProfileCommand, session::SessionCommand,
};

/// Jobboard CLI
#[derive(Parser)]
#[command(name = "jobboard")]
#[command(about = "Command-line client for the job board and professional network", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the configuration file (yaml, json, or toml)
    #[arg(
        long,
        short,
        global = true,
        help = "Path to the configuration file (e.g., jobboard.yaml). If not provided, defaults and JOBBOARD_* variables are used."
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the Jobboard CLI
#[derive(Subcommand)]
enum Commands {
    /// Sign in, sign out, or show the saved session
    #[command(subcommand)]
    Session(SessionCommand),

    /// Direct messages with other members
    #[command(subcommand)]
    Chat(ChatCommand),

    /// Browse and interact with the posts feed
    #[command(subcommand)]
    Feed(FeedCommand),

    /// Browse job offers and apply to them
    #[command(subcommand)]
    Jobs(JobsCommand),

    /// Show the signed-in member's profile
    #[command(subcommand)]
    Profile(ProfileCommand),

    /// Print a configuration template with every default filled in
    Config {
        /// Format of the generated configuration
        #[arg(
            long,
            short,
            value_enum,
            default_value_t = ConfigFormat::Yaml,
            help = "Format of the configuration to generate (yaml, json, or toml). Defaults to yaml."
        )]
        format: ConfigFormat,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)
        #[arg(long, short, value_enum)]
        shell: clap_complete::Shell,
    },
}

fn main() -> Result<()> {
    dotenv().ok();
    let Cli { config, command } = Cli::parse();

    match command {
        Commands::Completion { shell } => {
            commands::completion::generate_completion(shell);
            Ok(())
        }
        Commands::Config { format, output } => {
            commands::config::generate_config(format, output.as_deref())
        }
        command => {
            let config = ClientConfig::load_config(config.as_deref())
                .context("failed to load configuration")?;
            tracer::initialize_tracing(&config.logging);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .context("failed to start the async runtime")?;
            runtime.block_on(run(command, &config))
        }
    }
}

async fn run(command: Commands, config: &ClientConfig) -> Result<()> {
    match command {
        Commands::Session(command) => commands::session::run(command, config).await,
        Commands::Chat(command) => commands::chat::run(command, config).await,
        Commands::Feed(command) => commands::feed::run(command, config).await,
        Commands::Jobs(command) => commands::jobs::run(command, config).await,
        Commands::Profile(command) => commands::profile::run(command, config).await,
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}
