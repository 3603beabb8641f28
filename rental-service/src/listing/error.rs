//! Outcomes of a failed listing query

use crate::error::DatabaseError;

/// Why a planner call produced no result
///
/// "Not found" is not an error: [`QueryPlanner::get`](super::QueryPlanner::get)
/// returns `Ok(None)` for a missing id.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// The filter was rejected before any storage access
    #[error("invalid filter: {0}")]
    Validation(String),

    /// The store failed or the query timed out
    #[error(transparent)]
    Internal(#[from] DatabaseError),

    /// The caller's cancellation token fired before the store answered
    #[error("query canceled")]
    Canceled,
}

impl QueryError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
