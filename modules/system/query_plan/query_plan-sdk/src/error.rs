//! Error types for the query plan client API.

/// Errors returned by a [`QueryPlanClient`](crate::QueryPlanClient).
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueryPlanError {
    /// The PDP rejected the request as invalid.
    #[error("invalid query plan request: {0}")]
    InvalidRequest(String),

    /// The PDP could not be reached or is not ready.
    #[error("policy decision point unavailable: {0}")]
    ServiceUnavailable(String),

    /// Unexpected failure.
    #[error("internal error: {0}")]
    Internal(String),
}
