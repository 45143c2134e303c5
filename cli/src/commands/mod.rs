// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Marathon stack CLI

pub mod apply;
pub mod config;
pub mod plan;

pub use self::apply::ApplyCommand;
pub use self::config::ConfigCommand;
pub use self::plan::PlanCommand;

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use marathon_stack_core::application::{MarathonStack, RequestContext};
use marathon_stack_core::domain::stack_config::StackConfigManifest;
use marathon_stack_core::infrastructure::{JwtKiteKeyIssuer, MarathonClient, Template};

/// Arguments shared by every command that runs a template through the engine.
#[derive(Args, Debug, Clone)]
pub struct TemplateArgs {
    /// Stack template (JSON or YAML)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Operator the kite keys are issued for
    #[arg(short, long, env = "MSTACK_USERNAME")]
    pub username: String,

    /// Per-call deadline in seconds (overrides configured deadlines)
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

impl TemplateArgs {
    pub fn read_template(&self) -> Result<Template> {
        read_template(&self.file)
    }

    /// Request context that is cancelled on Ctrl-C.
    pub fn request_context(&self) -> RequestContext {
        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling request");
                on_signal.cancel();
            }
        });

        let mut ctx = RequestContext::new(self.username.clone()).with_cancellation(cancel);
        if let Some(secs) = self.timeout {
            ctx = ctx.with_deadline(Duration::from_secs(secs));
        }
        ctx
    }
}

pub fn read_template(path: &Path) -> Result<Template> {
    Template::parse_file(path).with_context(|| format!("Failed to read template {:?}", path))
}

/// Loads and validates configuration, then wires the stack service.
pub fn build_stack(config_override: Option<PathBuf>) -> Result<MarathonStack> {
    let config = StackConfigManifest::load_or_default(config_override)
        .context("Failed to load configuration")?;

    config.validate().context("Configuration validation failed")?;

    let issuer = JwtKiteKeyIssuer::from_config(&config.spec.kite_key, &config.spec.endpoints.kontrol_url)
        .context("Failed to initialize kite key issuer")?;

    Ok(MarathonStack::from_config(
        &config,
        Arc::new(MarathonClient::new()),
        Arc::new(issuer),
    ))
}
