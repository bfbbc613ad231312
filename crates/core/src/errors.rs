use thiserror::Error;

use crate::decisions::DecisionError;

/// Error taxonomy surfaced by every approval operation.
///
/// All variants propagate to the caller unmodified; the only non-fatal
/// failure path in the system is the activity notifier, which never
/// produces one of these.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("no authenticated caller identity available")]
    Unauthorized,
    #[error("{resource} `{id}` not found")]
    NotFound { resource: &'static str, id: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(String),
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ApprovalError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { resource, id: id.into() }
    }
}

impl From<DecisionError> for ApprovalError {
    fn from(error: DecisionError) -> Self {
        Self::InvalidStateTransition(error.to_string())
    }
}
