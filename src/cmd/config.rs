//! Configuration view and validation commands — `leadboard config`.

use std::path::Path;

use anyhow::Result;

use leadboard::config::LeadboardConfig;

use super::super::ConfigCommands;

pub fn cmd_config(
    config_path: &Path,
    effective: &LeadboardConfig,
    command: Option<ConfigCommands>,
) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Leadboard Configuration");
            println!("=======================");
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No config file at {} (using defaults)", config_path.display());
            }
            println!();
            println!("Effective values (with env overrides):");
            println!();
            print!("{}", effective.redacted().to_toml()?);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No leadboard.toml found. Using defaults (valid).");
                return Ok(());
            }

            let file = LeadboardConfig::load(config_path)?;
            let warnings = file.validate();

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
        Some(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                println!("{} already exists.", config_path.display());
                println!("Pass --force to overwrite it.");
                return Ok(());
            }

            LeadboardConfig::default().save(config_path)?;

            println!("Created {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, db_path, dev_mode");
            println!("  - [mail] to, from, api_url (api_key via RESEND_API_KEY)");
            println!("  - [logging] filter, json, dir");
            println!();
        }
    }

    Ok(())
}
