use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "tutor")]
#[command(version, about = "Phase-aware conversation context compaction for tutoring dialogues")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Session to operate on (stored in .tutor/sessions/<name>.json)
    #[arg(long, default_value = "default", global = true)]
    pub session: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new tutor project
    Init,
    /// Append a message to the session log
    Say {
        /// Who is speaking: participant or agent
        role: String,
        /// Message text
        text: String,
    },
    /// Record a transition to another dialogue phase
    Advance {
        /// Destination phase code (e.g. APK, CI, SIM_CC)
        phase: String,
    },
    /// Show the phase-aligned segments of the session log
    Segments,
    /// Build and print the bounded context for the next turn
    Context {
        /// Show digest coverage without calling the digestion backend
        #[arg(long)]
        status: bool,
    },
    /// Discard the cached digest of the session
    Reset,
    /// List stored sessions
    Sessions,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default tutor.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = tutor::tutor_config::TutorConfig::with_cli_args(project_dir, cli.verbose)?;
    let _log_guard =
        tutor::logging::init(config.verbose, &config.toml.logging, &config.log_dir())?;

    match &cli.command {
        Commands::Init => cmd::cmd_init(&config)?,
        Commands::Say { role, text } => cmd::cmd_say(&config, &cli.session, role, text)?,
        Commands::Advance { phase } => cmd::cmd_advance(&config, &cli.session, phase)?,
        Commands::Segments => cmd::cmd_segments(&config, &cli.session)?,
        Commands::Context { status } => {
            cmd::cmd_context(&config, &cli.session, *status).await?
        }
        Commands::Reset => cmd::cmd_reset(&config, &cli.session)?,
        Commands::Sessions => cmd::cmd_sessions(&config)?,
        Commands::Config { command } => cmd::cmd_config(&config, command.clone())?,
    }

    Ok(())
}
