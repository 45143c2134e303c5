// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Plan command
//!
//! Shows one machine per instance label without writing the document.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use marathon_stack_core::application::StackProvider;
use marathon_stack_core::domain::machine::{Machines, ATTR_APP_COUNT, ATTR_APP_ID};

use super::{build_stack, TemplateArgs};

#[derive(Args, Debug)]
pub struct PlanCommand {
    #[command(flatten)]
    pub template: TemplateArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(command: PlanCommand, config_override: Option<PathBuf>) -> Result<()> {
    let stack = build_stack(config_override)?;
    let template = command.template.read_template()?;
    let ctx = command.template.request_context();

    let applied = stack
        .apply_template(template, &ctx)
        .await
        .with_context(|| format!("Failed to plan template {:?}", command.template.file))?;

    let machines = stack.plan(&applied.state);

    if command.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&machines).context("Failed to encode plan")?
        );
    } else {
        print!("{}", render_plan(&machines));
    }

    Ok(())
}

/// Human-readable plan table, one line per machine.
pub fn render_plan(machines: &Machines) -> String {
    let mut out = format!("{}\n", format!("Machines ({}):", machines.len()).bold());
    for (label, machine) in machines {
        out.push_str(&format!(
            "  {}  {}={}  {}={}  [{}]\n",
            label.bold(),
            ATTR_APP_ID,
            machine.attributes.get(ATTR_APP_ID).map(String::as_str).unwrap_or("-"),
            ATTR_APP_COUNT,
            machine.attributes.get(ATTR_APP_COUNT).map(String::as_str).unwrap_or("-"),
            machine.provider.dimmed()
        ));
    }
    out
}
