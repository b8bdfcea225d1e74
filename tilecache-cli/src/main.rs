//! tilecache CLI - Command-line interface
//!
//! Fetches and prewarms tiles through the persistent cache using a built-in
//! pattern generator, and inspects or clears the disk cache.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tilecache::config::ConfigFile;
use tilecache::logging::init_logging;
use tilecache::tile::TileRequest;

use commands::config::ConfigCommands;
use commands::prewarm::TileRange;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "tilecache")]
#[command(version, about = "Persistent tile cache", long_about = None)]
struct Cli {
    /// Cache directory (overrides config.ini)
    #[arg(long, global = true, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Enable debug logging for tilecache
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch one tile through the cache
    #[command(allow_negative_numbers = true)]
    Get {
        /// Tile column
        x: i32,
        /// Tile row
        y: i32,
        /// Zoom level
        zoom: i32,
        /// Namespace tag (overrides config.ini)
        #[arg(long)]
        tag: Option<String>,
        /// Write the tile payload to this file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Generate and cache a rectangle of tiles
    Prewarm {
        /// Zoom level
        zoom: i32,
        /// First column
        x0: i32,
        /// First row
        y0: i32,
        /// Last column (inclusive)
        x1: i32,
        /// Last row (inclusive)
        y1: i32,
        /// Namespace tag (overrides config.ini)
        #[arg(long)]
        tag: Option<String>,
    },

    /// Show disk cache statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove all cached tiles
    Clear,

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ConfigFile::load()?;
    if let Some(dir) = cli.cache_dir {
        config.cache.directory = dir;
    }

    let _logging = init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Get {
            x,
            y,
            zoom,
            tag,
            output,
        } => commands::get::run(
            &config,
            TileRequest::new(x, y, zoom),
            tag.as_deref(),
            output.as_deref(),
        ),
        Commands::Prewarm {
            zoom,
            x0,
            y0,
            x1,
            y1,
            tag,
        } => commands::prewarm::run(
            &config,
            TileRange {
                zoom,
                x0,
                y0,
                x1,
                y1,
            },
            tag.as_deref(),
        ),
        Commands::Stats { json } => commands::cache::run_stats(&config.cache.directory, json),
        Commands::Clear => commands::cache::run_clear(&config.cache.directory),
        Commands::Config { command } => commands::config::run(command, &config),
    }
}
