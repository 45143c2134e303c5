// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Stack Template Codec
//!
//! Decodes a user's stack template (Terraform-style JSON, or the same tree
//! written as YAML) into configuration values, hands the `marathon_app`
//! resources to the engine and re-encodes the mutated document.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Parse external template text → configuration tree → JSON
//! - **Anti-Corruption:** The engine only ever sees `AppDefinition`s
//!
//! # Template Format
//!
//! ```yaml
//! variable:
//!   marathon_basic_auth_user: {}
//! resource:
//!   marathon_app:
//!     web:
//!       cmd: ./server
//!       count: 2
//!       container:
//!         docker:
//!           image: nginx
//! ```

use crate::domain::app_definition::AppDefinition;
use crate::domain::error::StackError;
use crate::domain::protocol::RESOURCE_TYPE;
use crate::domain::value::ConfigObject;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Sections that may hold interpolated variable references. The `variable`
/// section itself declares them and is left alone.
const SHADOWED_SECTIONS: [&str; 4] = ["resource", "output", "data", "module"];

/// Final document produced for a deployment request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackTemplate {
    pub content: String,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("IO error reading {path}: {error}")]
    IoError { path: String, error: String },

    #[error("JSON parse error: {0}")]
    JsonError(String),

    #[error("YAML parse error: {0}")]
    YamlError(String),

    #[error("template root must be an object")]
    NotAnObject,

    #[error("invalid {section} section: {reason}")]
    InvalidSection { section: String, reason: String },
}

impl From<TemplateError> for StackError {
    fn from(e: TemplateError) -> Self {
        StackError::Decode(e.to_string())
    }
}

/// A decoded stack template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    document: ConfigObject,
}

impl Template {
    pub fn from_value(value: Value) -> Result<Self, TemplateError> {
        match value {
            Value::Object(document) => Ok(Self { document }),
            _ => Err(TemplateError::NotAnObject),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, TemplateError> {
        let value: Value = serde_json::from_str(text).map_err(|e| TemplateError::JsonError(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn from_yaml(text: &str) -> Result<Self, TemplateError> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| TemplateError::YamlError(e.to_string()))?;
        Self::from_value(value)
    }

    /// JSON when the text starts with `{`, YAML otherwise.
    pub fn parse(text: &str) -> Result<Self, TemplateError> {
        if text.trim_start().starts_with('{') {
            Self::from_json(text)
        } else {
            Self::from_yaml(text)
        }
    }

    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| TemplateError::IoError {
            path: path.as_ref().display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&text)
    }

    pub fn document(&self) -> &ConfigObject {
        &self.document
    }

    /// Application definitions of the `marathon_app` resource, keyed and
    /// ordered by name. A template without any yields an empty map.
    pub fn decode_resource(&self) -> Result<BTreeMap<String, AppDefinition>, TemplateError> {
        let Some(apps) = self.resources()?.and_then(|r| r.get(RESOURCE_TYPE)) else {
            return Ok(BTreeMap::new());
        };

        let apps = match apps {
            Value::Null => return Ok(BTreeMap::new()),
            Value::Object(apps) => apps,
            _ => {
                return Err(TemplateError::InvalidSection {
                    section: format!("resource.{}", RESOURCE_TYPE),
                    reason: "expected an object keyed by application name".to_string(),
                })
            }
        };

        apps.iter()
            .map(|(name, app)| match app {
                Value::Object(app) => Ok((name.clone(), app.clone())),
                _ => Err(TemplateError::InvalidSection {
                    section: format!("resource.{}.{}", RESOURCE_TYPE, name),
                    reason: "expected an object".to_string(),
                }),
            })
            .collect()
    }

    /// Replaces the `marathon_app` resource with `apps`.
    pub fn set_applications(&mut self, apps: BTreeMap<String, AppDefinition>) -> Result<(), TemplateError> {
        let resource = self
            .document
            .entry("resource".to_string())
            .or_insert_with(|| Value::Object(Map::new()));

        let Value::Object(resource) = resource else {
            return Err(TemplateError::InvalidSection {
                section: "resource".to_string(),
                reason: "expected an object".to_string(),
            });
        };

        let apps: ConfigObject = apps.into_iter().map(|(name, app)| (name, Value::Object(app))).collect();
        resource.insert(RESOURCE_TYPE.to_string(), Value::Object(apps));
        Ok(())
    }

    /// Replaces every `${...}` interpolation referencing one of `vars` with
    /// `placeholder`, so user resources cannot read them.
    pub fn shadow_variables(&mut self, placeholder: &str, vars: &[&str]) -> Result<usize, TemplateError> {
        let mut replaced = 0;
        for section in SHADOWED_SECTIONS {
            if let Some(value) = self.document.get_mut(section) {
                replaced += shadow_value(value, placeholder, vars);
            }
        }
        Ok(replaced)
    }

    /// Compact JSON encoding of the document.
    pub fn json_output(&self) -> Result<String, TemplateError> {
        serde_json::to_string(&self.document).map_err(|e| TemplateError::JsonError(e.to_string()))
    }

    fn resources(&self) -> Result<Option<&ConfigObject>, TemplateError> {
        match self.document.get("resource") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(resource)) => Ok(Some(resource)),
            Some(_) => Err(TemplateError::InvalidSection {
                section: "resource".to_string(),
                reason: "expected an object".to_string(),
            }),
        }
    }
}

fn shadow_value(value: &mut Value, placeholder: &str, vars: &[&str]) -> usize {
    match value {
        Value::String(s) => {
            let (shadowed, count) = shadow_str(s, placeholder, vars);
            if count > 0 {
                *s = shadowed;
            }
            count
        }
        Value::Array(items) => items.iter_mut().map(|v| shadow_value(v, placeholder, vars)).sum(),
        Value::Object(map) => map.values_mut().map(|v| shadow_value(v, placeholder, vars)).sum(),
        _ => 0,
    }
}

fn shadow_str(s: &str, placeholder: &str, vars: &[&str]) -> (String, usize) {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    let mut count = 0;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        let expr = &rest[start + 2..start + len];

        out.push_str(&rest[..start]);
        if vars.iter().any(|v| references_var(expr, v)) {
            out.push_str(placeholder);
            count += 1;
        } else {
            out.push_str(&rest[start..=start + len]);
        }
        rest = &rest[start + len + 1..];
    }

    out.push_str(rest);
    (out, count)
}

fn references_var(expr: &str, name: &str) -> bool {
    let needle = format!("var.{}", name);
    let is_ident = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';

    expr.match_indices(&needle).any(|(pos, _)| {
        let before_ok = expr[..pos].chars().next_back().map_or(true, |c| !is_ident(c) && c != '.');
        let after_ok = expr[pos + needle.len()..].chars().next().map_or(true, |c| !is_ident(c));
        before_ok && after_ok
    })
}
