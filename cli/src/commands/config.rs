// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use marathon_stack_core::domain::stack_config::StackConfigManifest;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,

        /// Print the effective configuration as YAML
        #[arg(long)]
        yaml: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./marathon-stack.yaml)
        #[arg(short, long, default_value = "./marathon-stack.yaml")]
        output: PathBuf,

        /// Include examples and comments
        #[arg(long)]
        examples: bool,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths, yaml } => show(config_override, paths, yaml).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output, examples } => generate(output, examples).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool, as_yaml: bool) -> Result<()> {
    let config = StackConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        if let Some(path) = &config_override {
            println!("  1. --config flag: {}", path.display());
        } else {
            println!("  1. --config flag: {}", "(not set)".dimmed());
        }
        println!(
            "  2. MSTACK_CONFIG_PATH: {}",
            std::env::var("MSTACK_CONFIG_PATH")
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./marathon-stack.yaml");
        println!("  4. ~/.marathon-stack/config.yaml");
        println!("  5. /etc/marathon-stack/config.yaml");
        println!();
    }

    if as_yaml {
        print!("{}", serde_yaml::to_string(&config).context("Failed to encode configuration")?);
        return Ok(());
    }

    println!("{}", "Current configuration:".bold());
    println!();

    println!("{}", "Metadata:".bold());
    println!("  Name: {}", config.metadata.name);
    if let Some(version) = &config.metadata.version {
        println!("  Version: {}", version);
    }
    println!();

    let endpoints = config.deployment_endpoints();
    println!("{}", "Endpoints:".bold());
    println!("  Kontrol: {}", endpoints.kontrol_url);
    println!("  Kloud: {}", endpoints.kloud_url);
    println!("  Tunnel: {}", endpoints.tunnel_url);
    println!("  Debug: {}", endpoints.debug);
    println!();

    println!("{}", "Agent:".bold());
    println!("  Klient URL: {}", endpoints.klient_url);
    println!("  Entrypoint base URL: {}", endpoints.entrypoint_base_url);
    println!();

    let kite_key = &config.spec.kite_key;
    println!("{}", "Kite keys:".bold());
    println!("  Issuer: {}", kite_key.issuer);
    println!("  Audience: {}", kite_key.audience);
    let signing = match (&kite_key.private_key_path, &kite_key.secret) {
        (Some(path), _) => format!("RS256 ({})", path.display()),
        (None, Some(_)) => "HS256 (shared secret)".to_string(),
        (None, None) => "(not configured)".red().to_string(),
    };
    println!("  Signing: {}", signing);
    println!("  TTL: {:?}", kite_key.ttl);
    println!();

    println!("{}", "Deadlines:".bold());
    println!("  Verify: {:?}", config.spec.deadlines.verify);
    println!("  Issue: {:?}", config.spec.deadlines.issue);
    println!();

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = StackConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    if config.spec.kite_key.secret.is_none() && config.spec.kite_key.private_key_path.is_none() {
        println!(
            "{}",
            "⚠ No kite key signing material configured; apply will fail".yellow()
        );
    }

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: PathBuf, with_examples: bool) -> Result<()> {
    let sample = if with_examples {
        include_str!("../../templates/config-with-examples.yaml")
    } else {
        include_str!("../../templates/config-minimal.yaml")
    };

    std::fs::write(&output, sample)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}
