use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use aurora_genesis::config::Config;
use aurora_genesis::logging::{self, LogFormat};

mod cmd;

#[derive(Parser)]
#[command(name = "aurora")]
#[command(version, about = "Aurora Genesis Engine: persona runtime and controlled burns")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to aurora.toml. Defaults to ./aurora.toml when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Console log format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// Also write JSON logs to a daily-rolling file in this directory
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        /// Directory for burn artifacts (overrides AURORA_SAVE_PATH)
        #[arg(long)]
        save_path: Option<PathBuf>,
    },
    /// Rehydrate a persona and run a controlled burn against it
    Burn {
        persona_id: String,

        /// Concept to burn (defaults to a self-analysis of the persona)
        #[arg(long)]
        concept: Option<String>,

        /// Checkpoint label; repeat to set several (replaces the configured list)
        #[arg(long = "checkpoint")]
        checkpoints: Vec<String>,

        /// Directory for burn artifacts (overrides AURORA_SAVE_PATH)
        #[arg(long)]
        save_path: Option<PathBuf>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rehydrate a persona and send it one message
    Chat { persona_id: String, message: String },
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
    /// Initialize a default aurora.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = logging::init(cli.verbose, cli.log_format, cli.log_dir.as_deref())?;

    match &cli.command {
        Commands::Serve {
            host,
            port,
            save_path,
        } => {
            let config = Config::load(cli.config.as_deref())?.with_cli_args(
                cli.verbose,
                host.clone(),
                *port,
                save_path.clone(),
            );
            cmd::cmd_serve(&config).await?;
        }
        Commands::Burn {
            persona_id,
            concept,
            checkpoints,
            save_path,
            json,
        } => {
            let config = Config::load(cli.config.as_deref())?.with_cli_args(
                cli.verbose,
                None,
                None,
                save_path.clone(),
            );
            let opts = cmd::BurnArgs {
                concept: concept.clone(),
                checkpoints: checkpoints.clone(),
                json: *json,
            };
            cmd::cmd_burn(&config, persona_id, opts).await?;
        }
        Commands::Chat {
            persona_id,
            message,
        } => {
            let config =
                Config::load(cli.config.as_deref())?.with_cli_args(cli.verbose, None, None, None);
            cmd::cmd_chat(&config, persona_id, message).await?;
        }
        Commands::Config { command } => cmd::cmd_config(cli.config.as_deref(), command.clone())?,
    }

    Ok(())
}
