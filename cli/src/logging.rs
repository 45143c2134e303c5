// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Tracing subscriber setup for the `mstack` binary
//!
//! Precedence for the level: `RUST_LOG`, then `--log-level` /
//! `MSTACK_LOG_LEVEL`, then `observability.logging.level`, then `warn`.

use anyhow::{Context, Result};
use std::path::PathBuf;

use marathon_stack_core::domain::stack_config::{LoggingConfig, StackConfigManifest};

pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
}

impl LogSettings {
    pub fn resolve(cli_level: Option<&str>, logging: Option<&LoggingConfig>) -> Self {
        let level = cli_level
            .map(str::to_string)
            .or_else(|| logging.map(|l| l.level.clone()))
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let format = logging
            .map(|l| l.format.clone())
            .unwrap_or_else(|| "text".to_string());

        Self { level, format }
    }

    /// Reads the observability section of the discovered configuration. A
    /// configuration that fails to load is reported later by the command
    /// itself, so it only falls back to defaults here.
    pub fn discover(cli_level: Option<&str>, config_path: Option<PathBuf>) -> Self {
        let logging = StackConfigManifest::load_or_default(config_path)
            .ok()
            .and_then(|config| config.spec.observability)
            .and_then(|observability| observability.logging);

        Self::resolve(cli_level, logging.as_ref())
    }

    /// Initialize tracing subscriber for logging
    pub fn init(&self) -> Result<()> {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .or_else(|_| tracing_subscriber::EnvFilter::try_new(&self.level))
            .context("Failed to create log filter")?;

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false);

        if self.format == "json" {
            builder.json().init();
        } else {
            builder.compact().init();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn logging(level: &str, format: &str) -> LoggingConfig {
        LoggingConfig {
            level: level.to_string(),
            format: format.to_string(),
        }
    }

    #[test]
    fn test_defaults_without_config() {
        let settings = LogSettings::resolve(None, None);
        assert_eq!(settings.level, "warn");
        assert_eq!(settings.format, "text");
    }

    #[test]
    fn test_config_level_is_the_fallback() {
        let config = logging("debug", "json");

        let settings = LogSettings::resolve(None, Some(&config));
        assert_eq!(settings, LogSettings { level: "debug".into(), format: "json".into() });

        let settings = LogSettings::resolve(Some("error"), Some(&config));
        assert_eq!(settings.level, "error");
        assert_eq!(settings.format, "json");
    }

    #[test]
    fn test_discover_reads_config_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("marathon-stack.yaml");
        std::fs::write(
            &path,
            "apiVersion: marathon-stack/v1\nkind: StackConfig\nmetadata:\n  name: test\nspec:\n  observability:\n    logging:\n      level: trace\n",
        )
        .unwrap();

        let settings = LogSettings::discover(None, Some(path));
        assert_eq!(settings.level, "trace");
        assert_eq!(settings.format, "text");
    }
}
