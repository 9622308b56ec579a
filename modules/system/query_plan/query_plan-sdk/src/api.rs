//! Public API trait for fetching query plans from the PDP.

use async_trait::async_trait;

use crate::error::QueryPlanError;
use crate::models::{PlanRequest, QueryPlanResponse};

/// Client for the policy decision point's query planning endpoint.
///
/// The transport (gRPC, HTTP, in-process) is up to the implementation:
///
/// ```ignore
/// let plan = client.plan_resources(request).await?;
/// let filter = compiler.compile_response(&plan, &field_map)?;
/// ```
#[async_trait]
pub trait QueryPlanClient: Send + Sync {
    /// Ask the PDP under which conditions the principal may perform the
    /// action on resources of the requested kind.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` if the PDP rejects the request
    /// - `ServiceUnavailable` if the PDP cannot be reached
    /// - `Internal` for unexpected errors
    async fn plan_resources(
        &self,
        request: PlanRequest,
    ) -> Result<QueryPlanResponse, QueryPlanError>;
}
