// SPDX-FileCopyrightText: 2026 Feedbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Feedbot - a Telegram RSS subscription bot.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use feedbot_config::{ConfigError, FeedbotConfig};

/// Feedbot - a Telegram RSS subscription bot.
#[derive(Parser, Debug)]
#[command(name = "feedbot", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the standard locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Connect to Telegram and serve subscription commands.
    Serve,
    /// Validate the configuration and exit.
    CheckConfig,
}

fn load_config(path: Option<&std::path::Path>) -> Result<FeedbotConfig, Vec<ConfigError>> {
    match path {
        Some(path) => feedbot_config::load_and_validate_path(path),
        None => feedbot_config::load_and_validate(),
    }
}

fn exit_with(errors: &[ConfigError]) -> ! {
    feedbot_config::render_errors(errors);
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(errors) => exit_with(&errors),
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(errors) = feedbot_config::validate_for_serve(&config) {
                exit_with(&errors);
            }
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("feedbot: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::CheckConfig) => {
            println!(
                "feedbot: config is valid (bot.name={}, storage.database_path={})",
                config.bot.name, config.storage.database_path
            );
        }
        None => {
            println!("feedbot: use --help for available commands");
        }
    }
}
