// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Marathon Stack Use Case
//!
//! Application service that prepares a user's Marathon stack template so
//! that every instance boots a Koding agent with its own identity.
//!
//! # DDD Pattern: Application Service
//!
//! - **Layer:** Application
//! - **Responsibility:** Orchestrate the transformation stages over every
//!   `marathon_app` definition of a template
//! - **Collaborators:**
//!   - Domain: AppDefinition, Expansion, StackState, DeploymentEndpoints
//!   - Infrastructure: Template codec, CredentialVerifier, KiteKeyIssuer
//!
//! # Flow
//!
//! 1. Decode `resource.marathon_app` from the template
//! 2. Validate the whole set (non-empty, no `args`) before touching anything
//! 3. For each definition, sorted by name:
//!    scale → entrypoint → fetch → health/ports
//! 4. Reject labels produced by more than one definition
//! 5. Issue kite keys and inject metadata, definition by definition
//! 6. Write the definitions back and shadow the Marathon credentials
//! 7. Serialize the document and aggregate the expansion records
//!
//! # Error Handling
//!
//! Every stage returns `StackError`. The first failure discards the
//! document; callers never observe a partially transformed template.

use crate::application::bounded;
use crate::application::entrypoint::{check_compatible, inject_entrypoint};
use crate::application::fetch::inject_fetch_entrypoints;
use crate::application::health::inject_health_checks;
use crate::application::metadata::{inject_metadata, MetadataContext};
use crate::application::plan::build_plan;
use crate::application::scale::convert_instances_to_group;
use crate::domain::app_definition::AppDefinition;
use crate::domain::credential::{CredentialVerifier, KiteKeyIssuer, MarathonCredential};
use crate::domain::error::StackError;
use crate::domain::expansion::{check_unique_labels, Expansion, StackState};
use crate::domain::machine::Machines;
use crate::domain::protocol::{SHADOWED_VARIABLES, SHADOW_PLACEHOLDER};
use crate::domain::stack_config::{DeadlineConfig, DeploymentEndpoints, StackConfigManifest};
use crate::infrastructure::template::{StackTemplate, Template};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Per-request inputs that do not belong to the template itself.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Operator the kite keys are issued for.
    pub username: String,

    /// Bound for each external call. Falls back to the configured
    /// deadlines when `None`.
    pub deadline: Option<Duration>,

    pub cancel: CancellationToken,
}

impl RequestContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Result of a successful `apply_template`.
#[derive(Debug, Clone)]
pub struct AppliedStack {
    pub template: StackTemplate,
    pub state: StackState,
}

/// Stack provider operations exposed to the outer layers.
#[async_trait]
pub trait StackProvider: Send + Sync {
    /// Checks the Marathon credential against the live endpoint.
    async fn verify_credential(
        &self,
        credential: &MarathonCredential,
        ctx: &RequestContext,
    ) -> Result<(), StackError>;

    /// Default templates this provider ships for a credential.
    async fn bootstrap_templates(&self, credential: &MarathonCredential) -> Result<Vec<StackTemplate>, StackError>;

    /// Transforms the template for deployment.
    ///
    /// # Errors
    ///
    /// - `EmptyApplications`: the template declares no `marathon_app`
    /// - `IncompatibleEntrypoint`: a definition sets `args`
    /// - `Issuance`, `DeadlineExceeded`, `Cancelled`: kite key issuance failed
    /// - `Decode`, `Shadow`, `Serialization`: the document could not be processed
    async fn apply_template(&self, template: Template, ctx: &RequestContext) -> Result<AppliedStack, StackError>;

    /// One machine record per label of an applied stack.
    fn plan(&self, state: &StackState) -> Machines;
}

/// Standard implementation of StackProvider for Marathon
pub struct MarathonStack {
    endpoints: DeploymentEndpoints,
    deadlines: DeadlineConfig,
    verifier: Arc<dyn CredentialVerifier>,
    issuer: Arc<dyn KiteKeyIssuer>,
}

impl MarathonStack {
    pub fn new(
        endpoints: DeploymentEndpoints,
        deadlines: DeadlineConfig,
        verifier: Arc<dyn CredentialVerifier>,
        issuer: Arc<dyn KiteKeyIssuer>,
    ) -> Self {
        Self {
            endpoints,
            deadlines,
            verifier,
            issuer,
        }
    }

    pub fn from_config(
        config: &StackConfigManifest,
        verifier: Arc<dyn CredentialVerifier>,
        issuer: Arc<dyn KiteKeyIssuer>,
    ) -> Self {
        Self::new(
            config.deployment_endpoints(),
            config.spec.deadlines.clone(),
            verifier,
            issuer,
        )
    }

    pub fn endpoints(&self) -> &DeploymentEndpoints {
        &self.endpoints
    }

    /// Runs the structural stages over one definition. No external call is
    /// made here.
    fn expand(&self, name: &str, app: &mut AppDefinition) -> Result<Expansion, StackError> {
        let scaled = convert_instances_to_group(name, app)?;

        let entrypoint = inject_entrypoint(name, app, &scaled.original_app_id, scaled.count)?;

        inject_fetch_entrypoints(app, &self.endpoints.entrypoint_base_url, entrypoint.labels.len());

        inject_health_checks(app, scaled.count);

        info!(
            app = name,
            app_id = %scaled.original_app_id,
            count = scaled.count,
            strategy = ?entrypoint.strategy,
            labels = entrypoint.labels.len(),
            "prepared application"
        );

        let mut expansion = Expansion::new(name, scaled.original_app_id, scaled.app_or_group_name, scaled.count);
        expansion.container_count = entrypoint.container_count;
        expansion.strategy = Some(entrypoint.strategy);
        expansion.labels = entrypoint.labels;

        Ok(expansion)
    }

    /// Issues one kite key per label of an expanded definition.
    async fn attach_metadata(
        &self,
        app: &mut AppDefinition,
        expansion: &Expansion,
        ctx: &RequestContext,
    ) -> Result<(), StackError> {
        let metadata_ctx = MetadataContext {
            issuer: self.issuer.as_ref(),
            endpoints: &self.endpoints,
            username: &ctx.username,
            deadline: ctx.deadline.unwrap_or(self.deadlines.issue),
            cancel: &ctx.cancel,
        };
        inject_metadata(app, &expansion.labels, &metadata_ctx).await?;

        debug!(app = %expansion.name, keys = expansion.labels.len(), "attached instance metadata");
        Ok(())
    }
}

#[async_trait]
impl StackProvider for MarathonStack {
    async fn verify_credential(
        &self,
        credential: &MarathonCredential,
        ctx: &RequestContext,
    ) -> Result<(), StackError> {
        let deadline = ctx.deadline.unwrap_or(self.deadlines.verify);

        bounded(
            "credential verification",
            deadline,
            &ctx.cancel,
            self.verifier.verify(credential),
        )
        .await??;

        info!(url = %credential.url, "marathon credential verified");
        Ok(())
    }

    async fn bootstrap_templates(&self, _credential: &MarathonCredential) -> Result<Vec<StackTemplate>, StackError> {
        Ok(Vec::new())
    }

    async fn apply_template(&self, mut template: Template, ctx: &RequestContext) -> Result<AppliedStack, StackError> {
        let mut apps = template.decode_resource()?;

        if apps.is_empty() {
            return Err(StackError::EmptyApplications);
        }

        for (name, app) in &apps {
            check_compatible(name, app)?;
        }

        info!(applications = apps.len(), username = %ctx.username, "applying marathon template");

        let mut expansions = Vec::with_capacity(apps.len());
        for (name, app) in apps.iter_mut() {
            expansions.push(self.expand(name, app)?);
        }

        check_unique_labels(&expansions)?;

        for (app, expansion) in apps.values_mut().zip(&expansions) {
            self.attach_metadata(app, expansion, ctx).await?;
        }

        template.set_applications(apps)?;

        let shadowed = template
            .shadow_variables(SHADOW_PLACEHOLDER, &SHADOWED_VARIABLES)
            .map_err(|e| StackError::Shadow(e.to_string()))?;
        debug!(shadowed, "shadowed marathon credential variables");

        let content = template
            .json_output()
            .map_err(|e| StackError::Serialization(e.to_string()))?;

        let state = StackState::from_expansions(expansions);
        info!(labels = state.labels.len(), "marathon template applied");

        Ok(AppliedStack {
            template: StackTemplate { content },
            state,
        })
    }

    fn plan(&self, state: &StackState) -> Machines {
        build_plan(state)
    }
}
