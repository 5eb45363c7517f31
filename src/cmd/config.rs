//! Configuration view and validation commands: `aurora config`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use aurora_genesis::config::{AuroraToml, CONFIG_FILE_NAME, Config};

use super::super::ConfigCommands;

fn print_toml(toml: &AuroraToml) {
    println!("[server]");
    println!("  host = \"{}\"", toml.server.host);
    println!("  port = {}", toml.server.port);
    println!("  request_timeout_secs = {}", toml.server.request_timeout_secs);
    println!("  cors_permissive = {}", toml.server.cors_permissive);
    println!();

    println!("[artifacts]");
    println!("  save_path = \"{}\"", toml.artifacts.save_path.display());
    println!();

    if let Some(dir) = &toml.personas.blueprint_dir {
        println!("[personas]");
        println!("  blueprint_dir = \"{}\"", dir.display());
        println!();
    }

    println!("[model]");
    println!("  temperature = {}", toml.model.temperature);
    println!("  max_tokens = {}", toml.model.max_tokens);
    println!("  selection = {:?}", toml.model.selection);
    for backend in toml.model.effective_backends() {
        println!(
            "  backend: {:?} {}",
            backend.kind,
            backend.name.as_deref().unwrap_or("")
        );
    }
    println!();

    println!("[burn]");
    println!("  project_token = \"{}\"", toml.burn.project_token);
    println!("  context_hint = \"{}\"", toml.burn.context_hint);
    println!("  checkpoints = {:?}", toml.burn.checkpoints);
    println!("  compression_phrase = \"{}\"", toml.burn.compression_phrase);
    println!("  glyph = \"{}\"", toml.burn.glyph);
    println!("  entropy = {}", toml.burn.entropy);
    println!("  overclock = {}", toml.burn.overclock);
    println!("  cycle_timeout_secs = {}", toml.burn.cycle_timeout_secs);
    println!();
}

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    let config_path: PathBuf = match config_path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir()
            .context("Failed to get current directory")?
            .join(CONFIG_FILE_NAME),
    };

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Aurora Configuration");
            println!("====================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                let config = Config::load(Some(&config_path))?;
                print_toml(&config.toml);

                println!("Effective values (with env overrides):");
                println!("  bind = {}", config.bind_addr());
                println!("  save_path = \"{}\"", config.save_path().display());
                println!();
            } else {
                println!("No aurora.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                print_toml(&AuroraToml::default());
                println!("Run 'aurora config init' to create an aurora.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No aurora.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = AuroraToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("aurora.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            AuroraToml::default().save(&config_path)?;

            println!("Created aurora.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, cors_permissive");
            println!("  - [model] temperature and [[model.backends]] chain");
            println!("  - [burn] checkpoints, entropy, cycle_timeout_secs");
            println!();
        }
    }

    Ok(())
}
