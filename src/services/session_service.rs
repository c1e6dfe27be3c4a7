//! Domain service for session resolution and profile bootstrapping.
//!
//! Turns "is there a valid credential" into "who is the user and what role do
//! they hold", and keeps the shared [`SessionContext`] up to date.

use std::sync::Arc;

use crate::error::AccessError;
use crate::models::{Principal, Profile};
use crate::session::{Session, SessionContext, SessionState};

#[async_trait::async_trait]
pub trait SessionService: Send + Sync {
    /// Resolves the current credential into a session.
    ///
    /// Returns [`SessionState::Unauthenticated`] when no valid credential is
    /// stored. The outcome is published to the session context; failures
    /// clear it.
    ///
    /// # Errors
    ///
    /// - [`AccessError::ProfileUnavailable`] if the profile cannot be read.
    /// - [`AccessError::ProfileCreationFailed`] if bootstrapping failed.
    /// - [`AccessError::AccountDeactivated`] if the profile is inactive. The
    ///   credential is invalidated before returning.
    async fn resolve_session(&self) -> Result<SessionState, AccessError>;

    /// Returns the stored profile of `principal`, creating the minimal
    /// student profile if none exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`AccessError::Unauthenticated`] unless `principal` holds the
    /// current valid credential.
    async fn ensure_profile(&self, principal: &Principal) -> Result<Profile, AccessError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Arc<Session>, AccessError>;

    /// Registers a new principal. The profile always starts as an active
    /// student; elevation goes through a role request.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Arc<Session>, AccessError>;

    async fn sign_out(&self) -> Result<(), AccessError>;

    async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccessError>;

    fn context(&self) -> &Arc<SessionContext>;
}
