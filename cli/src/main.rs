// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Marathon Stack CLI
//!
//! The `mstack` binary prepares Marathon stack templates for deployment.
//!
//! ## Commands
//!
//! - `mstack apply <FILE>` - Transform a template and write the deployable JSON
//! - `mstack plan <FILE>` - Show the machines a template would produce
//! - `mstack config show|validate|generate` - Configuration management

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use marathon_stack::commands::{self, ApplyCommand, ConfigCommand, PlanCommand};
use marathon_stack::logging::LogSettings;

/// Marathon Stack - Inject per-instance agent bootstrap into Marathon apps
#[derive(Parser)]
#[command(name = "mstack")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "MSTACK_CONFIG_PATH",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error) [default: config, then warn]
    #[arg(long, global = true, env = "MSTACK_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Transform a stack template for deployment
    #[command(name = "apply")]
    Apply {
        #[command(flatten)]
        command: ApplyCommand,
    },

    /// Show the machine plan of a stack template
    #[command(name = "plan")]
    Plan {
        #[command(flatten)]
        command: PlanCommand,
    },

    /// Configuration management
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    LogSettings::discover(cli.log_level.as_deref(), cli.config.clone()).init()?;

    match cli.command {
        Some(Commands::Apply { command }) => commands::apply::execute(command, cli.config).await,
        Some(Commands::Plan { command }) => commands::plan::execute(command, cli.config).await,
        Some(Commands::Config { command }) => {
            commands::config::handle_command(command, cli.config).await
        }
        None => {
            // No command provided - show help
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(1);
        }
    }
}
