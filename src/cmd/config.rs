//! Configuration view and validation commands — `tutor config`.

use anyhow::Result;
use tutor::tutor_config::{TutorConfig, TutorToml};

use super::super::ConfigCommands;

fn print_toml(toml: &TutorToml) {
    println!("[compaction]");
    println!(
        "  full_history_max_messages = {}",
        toml.compaction.full_history_max_messages
    );
    println!("  summary_label = \"{}\"", toml.compaction.summary_label);
    println!();
    println!("[digest]");
    println!("  endpoint = \"{}\"", toml.digest.endpoint);
    println!("  model = \"{}\"", toml.digest.model);
    println!("  api_key_env = \"{}\"", toml.digest.api_key_env);
    println!("  timeout_secs = {}", toml.digest.timeout_secs);
    println!("  temperature = {}", toml.digest.temperature);
    println!();
    println!("[logging]");
    println!("  json = {}", toml.logging.json);
    println!("  file = {}", toml.logging.file);
    println!();
}

pub fn cmd_config(config: &TutorConfig, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Tutor Configuration");
            println!("===================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                print_toml(&TutorToml::load(&config_path)?);
            } else {
                println!("No tutor.toml found at {}", config_path.display());
                println!();
                println!("Using configuration:");
                print_toml(&config.toml);
                println!("Run 'tutor config init' to create a tutor.toml file.");
                println!();
            }

            // Effective values (including env overrides)
            let digest = config.digest_settings();
            println!("Effective digest settings (with env overrides):");
            println!("  endpoint = \"{}\"", digest.endpoint);
            println!("  model = \"{}\"", digest.model);
            println!(
                "  api_key = {}",
                if digest.api_key.is_some() { "set" } else { "not set" }
            );
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No tutor.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = TutorToml::load(&config_path)?;
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
                println!("tutor.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            if !config.tutor_dir.exists() {
                std::fs::create_dir_all(&config.tutor_dir)?;
            }

            TutorToml::default().save(&config_path)?;

            println!("Created tutor.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [compaction] full_history_max_messages, summary_label");
            println!("  - [digest] endpoint, model, api_key_env, timeout_secs");
            println!("  - [logging] json, file");
            println!();
        }
    }

    Ok(())
}
