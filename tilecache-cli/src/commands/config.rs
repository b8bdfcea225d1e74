//! Configuration management CLI commands.

use clap::Subcommand;
use tilecache::config::{config_file_path, ConfigFile};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the configuration file path
    Path,

    /// Print the effective configuration
    Show,

    /// Write the effective configuration to the config file
    Init,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands, config: &ConfigFile) -> Result<(), CliError> {
    match command {
        ConfigCommands::Path => {
            println!("{}", config_file_path().display());
            Ok(())
        }
        ConfigCommands::Show => {
            run_show(config);
            Ok(())
        }
        ConfigCommands::Init => run_init(config),
    }
}

fn run_show(config: &ConfigFile) {
    println!("[cache]");
    println!("directory = {}", config.cache.directory.display());
    println!("tag = {}", config.cache.tag);
    println!();
    println!("[logging]");
    match &config.logging.directory {
        Some(dir) => println!("directory = {}", dir.display()),
        None => println!("directory ="),
    }
    println!("level = {}", config.logging.level);
}

fn run_init(config: &ConfigFile) -> Result<(), CliError> {
    let path = config_file_path();
    if path.exists() {
        return Err(CliError::Config(format!(
            "{} already exists",
            path.display()
        )));
    }
    config.save_to(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
