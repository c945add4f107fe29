//! Error taxonomy for the synchronization engine.
//!
//! Every remote-call failure is caught at the component boundary and
//! converted into a [`SyncError`]; no raw transport fault ever reaches
//! the UI layer. The [`ErrorClass`] of an error decides what happens to
//! optimistic state: Precondition failures are rejected before any
//! remote call, Transient failures keep the optimistic value, and
//! Authoritative rejects are surfaced for the caller to reconcile.

use std::time::Duration;

use taskdeck_model::ValidationError;

use crate::remote::AuthorityError;

/// Coarse classification driving the keep-vs-rollback decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rejected locally, no remote call was issued.
    Precondition,
    /// Timeout or network failure; the terminal outcome is unknown, so
    /// optimistic state is kept rather than flickered back.
    Transient,
    /// The remote authority answered and said no.
    AuthoritativeReject,
}

/// Failure of a synchronization operation.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No bearer credential is available; the call was never issued.
    #[error("no credential available")]
    MissingCredential,

    /// Local validation rejected the request before any remote call.
    #[error("invalid request: {0}")]
    Invalid(#[from] ValidationError),

    /// The remote call did not complete within its budget.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The remote call failed at the transport level.
    #[error("network failure: {0}")]
    Network(String),

    /// The authority does not know the entity.
    #[error("not found")]
    NotFound,

    /// The authority refused the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The authority rejected the payload as invalid.
    #[error("rejected by server: {0}")]
    Rejected(String),
}

impl SyncError {
    /// Which class this error falls into.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::MissingCredential | Self::Invalid(_) => ErrorClass::Precondition,
            Self::Timeout(_) | Self::Network(_) => ErrorClass::Transient,
            Self::NotFound | Self::Forbidden(_) | Self::Rejected(_) => {
                ErrorClass::AuthoritativeReject
            }
        }
    }

    /// Human-readable message for the error observable. Never exposes
    /// transport internals.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingCredential => "You are signed out. Sign in and try again.".to_string(),
            Self::Invalid(v) => v.to_string(),
            Self::Timeout(_) => {
                "The server took too long to respond. Your change is kept locally.".to_string()
            }
            Self::Network(_) => {
                "Network problem while contacting the server. Your change is kept locally."
                    .to_string()
            }
            Self::NotFound => "That task no longer exists on the server.".to_string(),
            Self::Forbidden(_) => "You don't have permission to do that.".to_string(),
            Self::Rejected(reason) => format!("The server rejected the change: {reason}"),
        }
    }
}

impl From<AuthorityError> for SyncError {
    fn from(error: AuthorityError) -> Self {
        match error {
            AuthorityError::NotFound => Self::NotFound,
            AuthorityError::Forbidden(reason) => Self::Forbidden(reason),
            AuthorityError::Rejected(reason) => Self::Rejected(reason),
            AuthorityError::Network(detail) => Self::Network(detail),
        }
    }
}
