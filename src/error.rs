//! Error taxonomy of the access layer.
//!
//! Every boundary call is normalized into [`AccessError`] before it leaves a
//! service; [`crate::envelope::Outcome`] turns it into a tagged failure with a
//! stable code.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

use crate::domain::RoleRequestId;
use crate::policy::DenyReason;

/// Errors surfaced by the session, policy and workflow services.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("Not signed in")]
    Unauthenticated,

    #[error("Account is deactivated. Please contact an administrator.")]
    AccountDeactivated,

    /// The principal is signed in but its profile could not be read.
    #[error("Profile unavailable: {0}")]
    ProfileUnavailable(String),

    #[error("Profile creation failed: {0}")]
    ProfileCreationFailed(String),

    #[error("Access denied: {0}")]
    Denied(DenyReason),

    #[error("You already have a pending role request. Please wait for admin review.")]
    RequestAlreadyPending,

    #[error("Role request {0} not found")]
    RequestNotFound(RoleRequestId),

    #[error("Role request {0} has already been reviewed")]
    RequestAlreadyReviewed(RoleRequestId),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AccessError {
    /// Stable machine-readable code carried in failure envelopes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::AccountDeactivated => "account_deactivated",
            Self::ProfileUnavailable(_) => "profile_unavailable",
            Self::ProfileCreationFailed(_) => "profile_creation_failed",
            Self::Denied(reason) => reason.code(),
            Self::RequestAlreadyPending => "request_already_pending",
            Self::RequestNotFound(_) => "request_not_found",
            Self::RequestAlreadyReviewed(_) => "request_already_reviewed",
            Self::InvalidCredentials => "invalid_credentials",
            Self::EmailTaken => "email_taken",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Database(_) => "database",
            Self::Internal(_) => "internal",
        }
    }

    /// True for backend-availability failures where the UI should offer a retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProfileUnavailable(_) | Self::ProfileCreationFailed(_) | Self::Database(_)
        )
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id}"))
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl From<DenyReason> for AccessError {
    fn from(reason: DenyReason) -> Self {
        Self::Denied(reason)
    }
}

impl From<DbErr> for AccessError {
    fn from(err: DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AccessError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) | StoreError::Database(msg) => Self::Database(msg),
            StoreError::NotFound(what) => Self::NotFound(what),
        }
    }
}

/// Failures reported by the backing tables.
///
/// `Conflict` is distinct so callers can implement insert-or-fetch on top of
/// a uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Row already exists: {0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
        || err.to_string().contains("UNIQUE constraint failed")
}

impl From<DbErr> for StoreError {
    fn from(err: DbErr) -> Self {
        if is_unique_violation(&err) {
            Self::Conflict(err.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        if let Some(db_err) = err.downcast_ref::<DbErr>()
            && is_unique_violation(db_err)
        {
            return Self::Conflict(format!("{err:#}"));
        }
        Self::Database(format!("{err:#}"))
    }
}
