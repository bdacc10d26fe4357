//! Engine error taxonomy.

use thiserror::Error;

use crate::models::{ChangeRequestId, ChangeRequestStatus, LifecycleError, TransitionAction};
use crate::routing::RoutingError;
use crate::store::StoreError;
use crate::validation::{ValidationErrorKind, ValidationResult};

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by [`ChangeRequestService`](crate::service::ChangeRequestService).
///
/// A failed operation persists nothing.
#[derive(Debug, Error)]
pub enum EngineError {
    /// One or more structural checks failed. Carries every error found.
    #[error("validation failed: {}", .0.summary())]
    Validation(ValidationResult),

    /// No approval queue could be determined.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Approve/reject on a request that is no longer PENDING.
    #[error("cannot {action} change request {id}: it is already {from}")]
    InvalidStateTransition {
        id: ChangeRequestId,
        from: ChangeRequestStatus,
        action: TransitionAction,
    },

    /// A referenced entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(String),
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether retrying the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Store(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// The validation outcome, if this is a validation failure.
    pub fn validation(&self) -> Option<&ValidationResult> {
        match self {
            EngineError::Validation(result) => Some(result),
            _ => None,
        }
    }
}

impl From<LifecycleError> for EngineError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::InvalidStateTransition { id, from, action } => {
                EngineError::InvalidStateTransition { id, from, action }
            }
            LifecycleError::MissingResolutionReason => EngineError::Validation(
                ValidationResult::failure(ValidationErrorKind::MissingResolutionReason, e.to_string()),
            ),
        }
    }
}
