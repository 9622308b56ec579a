//! Policy Enforcement Point (`PEP`) object.
//!
//! [`PlanEnforcer`] encapsulates the full PEP flow:
//! build plan request → call PDP → compile the access plan to a `FilterTree`.
//!
//! Constructed once during service initialisation with the query plan
//! client. The resource kind and action are supplied per call, so a single
//! enforcer can serve all resource kinds in a service.

use std::collections::HashMap;
use std::sync::Arc;

use modkit_filter::FilterTree;

use crate::api::QueryPlanClient;
use crate::error::QueryPlanError;
use crate::models::{PlanRequest, PlanResource, Principal};
use crate::pep::compiler::{PlanCompileError, PlanCompiler};
use crate::resolver::FieldNameResolver;

/// Error from the PEP enforcement flow.
///
/// Unifies both failure modes: the PDP call itself can fail
/// ([`QueryPlanError`]) or the plan compilation can fail
/// ([`PlanCompileError`]).
#[derive(Debug, thiserror::Error)]
pub enum EnforcerError {
    /// The query plan RPC failed.
    #[error("query plan request failed: {0}")]
    PlanFailed(#[from] QueryPlanError),

    /// Plan compilation failed (denied, missing condition, unsupported, resolver).
    #[error("query plan compilation failed: {0}")]
    CompileFailed(#[from] PlanCompileError),
}

/// Policy Enforcement Point.
///
/// Holds the query plan client and the compiler. Cloneable and cheap to
/// pass around (`Arc` inside).
///
/// # Example
///
/// ```ignore
/// use query_plan_sdk::pep::PlanEnforcer;
/// use query_plan_sdk::FieldMap;
///
/// let enforcer = PlanEnforcer::new(client.clone()).with_policy_version("default");
/// let fields = FieldMap::new().with("request.resource.attr.ownerId", "ownerId");
///
/// let access = enforcer.filter_for(&principal, "contact", "read", &fields).await?;
/// let where_clause = access.and(existing_where);
/// ```
#[derive(Clone)]
pub struct PlanEnforcer {
    client: Arc<dyn QueryPlanClient>,
    compiler: PlanCompiler,
    policy_version: Option<String>,
}

impl PlanEnforcer {
    /// Create a new enforcer with the default (permissive) compiler.
    #[must_use]
    pub fn new(client: Arc<dyn QueryPlanClient>) -> Self {
        Self {
            client,
            compiler: PlanCompiler::default(),
            policy_version: None,
        }
    }

    /// Use a specific compiler (e.g. [`PlanCompiler::fail_closed`]).
    #[must_use]
    pub fn with_compiler(mut self, compiler: PlanCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// Policy version requested for every resource kind.
    #[must_use]
    pub fn with_policy_version(mut self, version: impl Into<String>) -> Self {
        self.policy_version = Some(version.into());
        self
    }

    // ── Low-level: build request only ────────────────────────────────

    /// Build a plan request for `action` on resources of `resource_kind`.
    ///
    /// The configured policy version applies to the resource and, unless the
    /// principal already pins one, to the principal.
    #[must_use]
    pub fn build_request(
        &self,
        principal: &Principal,
        resource_kind: &str,
        action: &str,
    ) -> PlanRequest {
        let mut principal = principal.clone();
        if principal.policy_version.is_none() {
            principal.policy_version.clone_from(&self.policy_version);
        }
        PlanRequest {
            request_id: None,
            principal,
            resource: PlanResource {
                kind: resource_kind.to_owned(),
                attr: HashMap::new(),
                policy_version: self.policy_version.clone(),
            },
            action: action.to_owned(),
        }
    }

    // ── High-level: full PEP flow ────────────────────────────────────

    /// Execute the full PEP flow: build request → plan → compile.
    ///
    /// # Errors
    ///
    /// - [`EnforcerError::PlanFailed`] if the PDP call fails
    /// - [`EnforcerError::CompileFailed`] if the plan is denied or cannot be compiled
    pub async fn filter_for(
        &self,
        principal: &Principal,
        resource_kind: &str,
        action: &str,
        resolver: &(dyn FieldNameResolver + Sync),
    ) -> Result<FilterTree, EnforcerError> {
        let request = self.build_request(principal, resource_kind, action);
        self.filter_for_request(request, resolver).await
    }

    /// Execute the PEP flow for a prepared request.
    ///
    /// # Errors
    ///
    /// - [`EnforcerError::PlanFailed`] if the PDP call fails
    /// - [`EnforcerError::CompileFailed`] if the plan is denied or cannot be compiled
    #[tracing::instrument(
        skip_all,
        fields(action = %request.action, resource_kind = %request.resource.kind)
    )]
    pub async fn filter_for_request(
        &self,
        request: PlanRequest,
        resolver: &(dyn FieldNameResolver + Sync),
    ) -> Result<FilterTree, EnforcerError> {
        let response = self
            .client
            .plan_resources(request)
            .await
            .map_err(|e| log_and_convert("plan_resources", e))?;
        Ok(self.compiler.compile_response(&response, resolver)?)
    }
}

fn log_and_convert(op: &str, e: QueryPlanError) -> EnforcerError {
    tracing::error!(operation = op, error = %e, "query plan call failed");
    e.into()
}

impl std::fmt::Debug for PlanEnforcer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanEnforcer")
            .field("compiler", &self.compiler)
            .field("policy_version", &self.policy_version)
            .finish_non_exhaustive()
    }
}
