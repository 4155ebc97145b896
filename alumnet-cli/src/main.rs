//! Main entry point for the AlumNet CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use dotenv::dotenv;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use commands::{
    admin::AdminCommand,
    applications::ApplicationsCommand,
    opportunities::{ApplyArgs, OpportunitiesCommand},
    profile::ProfileCommand,
    session::SessionCommand,
};

mod commands;

/// AlumNet CLI
#[derive(Parser)]
#[command(name = "alumnet")]
#[command(about = "Command-line client for the AlumNet mentorship platform", long_about = None)]
pub struct Cli {
    /// Path to the configuration file (yaml, yml, json or toml)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Print raw JSON instead of a summary
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the AlumNet CLI
#[derive(Subcommand)]
enum Commands {
    /// Sign in, register, inspect or end the current session
    Session {
        #[command(subcommand)]
        action: SessionCommand,
    },

    /// Show or edit an alumni or student profile
    Profile {
        #[command(subcommand)]
        action: ProfileCommand,
    },

    /// Browse postings (students) or manage your own (alumni)
    Opportunities {
        #[command(subcommand)]
        action: OpportunitiesCommand,
    },

    /// Apply to an opportunity, optionally attaching a resume
    Apply(ApplyArgs),

    /// Track submitted or received applications
    Applications {
        #[command(subcommand)]
        action: ApplicationsCommand,
    },

    /// Administrative user management
    Admin {
        #[command(subcommand)]
        action: AdminCommand,
    },

    /// Generate shell completion scripts for the CLI
    Completion {
        /// The shell type for which to generate the completion script (e.g., bash, zsh, fish, powershell)
        #[arg(long, short, value_enum)]
        shell: Shell,
    },

    /// Generate a configuration file
    Config {
        /// Format of the configuration file to generate (yaml, json or toml). Defaults to yaml.
        #[arg(long, short, default_value = "yaml")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    let options = commands::GlobalOptions {
        config: cli.config,
        json: cli.json,
    };

    match cli.command {
        Commands::Completion { shell } => {
            commands::completion::generate_completion(shell);
            Ok(())
        }
        Commands::Config { format } => commands::config::generate_config(&format),
        command => dispatch(command, &options).await,
    }
}

/// Run a command that talks to the backend.
async fn dispatch(command: Commands, options: &commands::GlobalOptions) -> Result<()> {
    let config = commands::load_config(options.config.clone())?;
    init_tracing(&config.log_level);

    match command {
        Commands::Session { action } => commands::session::run(action, config, options).await,
        Commands::Profile { action } => commands::profile::run(action, config, options).await,
        Commands::Opportunities { action } => {
            commands::opportunities::run(action, config, options).await
        }
        Commands::Apply(args) => commands::opportunities::apply(args, config, options).await,
        Commands::Applications { action } => {
            commands::applications::run(action, config, options).await
        }
        Commands::Admin { action } => commands::admin::run(action, config, options).await,
        Commands::Completion { .. } | Commands::Config { .. } => Ok(()),
    }
}

/// Logs go to stderr so command output stays pipeable.
fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}
