#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Query Plan SDK
//!
//! This crate turns the access plans returned by a policy decision point
//! into data-store filters:
//!
//! - [`QueryPlanClient`] - Public API trait for fetching plans
//! - [`QueryPlanResponse`], [`Operand`], [`Operator`] - Access plan models
//! - [`FieldNameResolver`], [`FieldMap`], [`RecordingResolver`] - Field-name resolution
//! - [`FilterTree`] - Compiled filter (re-exported from `modkit-filter`)
//! - [`CompilerConfig`] - Compiler configuration
//! - [`pep`] - PEP helpers (compiler, enforcer)
//!
//! ## Usage
//!
//! ```ignore
//! use query_plan_sdk::{CompilerConfig, pep};
//!
//! let config: CompilerConfig = serde_saphyr::from_str(yaml)?;
//! let fields = config.field_map();
//!
//! // Ask the PDP under which conditions the principal may read contacts
//! let plan = client.plan_resources(request).await?;
//!
//! // Compile to a FilterTree and merge with the caller's own constraints
//! let access = config.compiler().compile_response(&plan, &fields)?;
//! let where_clause = access.and(existing_where);
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod pep;
pub mod resolver;

// Re-export main types at crate root
pub use api::QueryPlanClient;
pub use config::{CompilerConfig, UnknownOperatorPolicy};
pub use error::QueryPlanError;
pub use models::{
    Expression, Operand, Operator, PlanKind, PlanRequest, PlanResource, Principal,
    QueryPlanResponse,
};
pub use modkit_filter::{FieldCondition, FilterTree};
pub use pep::{EnforcerError, PlanCompileError, PlanCompiler, PlanEnforcer, compile};
pub use resolver::{FieldMap, FieldNameResolver, Identity, RecordingResolver, ResolveError};
