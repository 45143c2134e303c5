// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Apply command
//!
//! Runs a template through the engine and writes the deployable document.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use marathon_stack_core::application::StackProvider;
use marathon_stack_core::domain::credential::MarathonCredential;

use super::{build_stack, plan::render_plan, TemplateArgs};

#[derive(Args, Debug)]
pub struct ApplyCommand {
    #[command(flatten)]
    pub template: TemplateArgs,

    /// Ping Marathon with the given credentials before transforming
    #[arg(long)]
    pub verify: bool,

    /// Marathon base URL used by --verify
    #[arg(long, env = "MARATHON_URL")]
    pub marathon_url: Option<String>,

    #[arg(long, env = "MARATHON_BASIC_AUTH_USER")]
    pub basic_auth_user: Option<String>,

    #[arg(long, env = "MARATHON_BASIC_AUTH_PASSWORD", hide_env_values = true)]
    pub basic_auth_password: Option<String>,

    /// Write the document here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Also print the machine plan (to stderr when the document goes to stdout)
    #[arg(long)]
    pub plan: bool,
}

impl ApplyCommand {
    pub fn credential(&self) -> Result<MarathonCredential> {
        let url = self
            .marathon_url
            .clone()
            .context("--verify requires --marathon-url or MARATHON_URL")?;

        let mut credential = MarathonCredential::new(url);
        if let Some(user) = &self.basic_auth_user {
            credential = credential.with_basic_auth(user, self.basic_auth_password.clone().unwrap_or_default());
        }
        Ok(credential)
    }
}

pub async fn execute(command: ApplyCommand, config_override: Option<PathBuf>) -> Result<()> {
    let stack = build_stack(config_override)?;
    let template = command.template.read_template()?;
    let ctx = command.template.request_context();

    if command.verify {
        let credential = command.credential()?;
        stack
            .verify_credential(&credential, &ctx)
            .await
            .context("Marathon credential verification failed")?;
        eprintln!("{}", format!("✓ Marathon reachable at {}", credential.url).green());
    }

    let applied = stack
        .apply_template(template, &ctx)
        .await
        .with_context(|| format!("Failed to apply template {:?}", command.template.file))?;

    match &command.output {
        Some(path) => {
            std::fs::write(path, &applied.template.content)
                .with_context(|| format!("Failed to write document to {:?}", path))?;
            info!(path = %path.display(), "wrote stack document");
            eprintln!(
                "{}",
                format!(
                    "✓ {} instance(s) prepared: {}",
                    applied.state.labels.len(),
                    path.display()
                )
                .green()
            );
        }
        None => println!("{}", applied.template.content),
    }

    if command.plan {
        let table = render_plan(&stack.plan(&applied.state));
        if command.output.is_some() {
            print!("{}", table);
        } else {
            eprint!("{}", table);
        }
    }

    Ok(())
}
