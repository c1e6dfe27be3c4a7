use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::backend::{CredentialStore, ProfileTable};
use crate::error::{AccessError, StoreError};
use crate::models::{NewProfile, Principal, Profile};
use crate::services::session_service::SessionService;
use crate::session::{Session, SessionContext, SessionState};

pub struct DefaultSessionService {
    credentials: Arc<dyn CredentialStore>,
    profiles: Arc<dyn ProfileTable>,
    context: Arc<SessionContext>,
}

impl DefaultSessionService {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        profiles: Arc<dyn ProfileTable>,
        context: Arc<SessionContext>,
    ) -> Self {
        Self {
            credentials,
            profiles,
            context,
        }
    }

    /// Insert-or-fetch on the profile table's primary key. Concurrent callers
    /// for the same principal all end up with the single stored row.
    async fn bootstrap(&self, principal: &Principal) -> Result<Profile, AccessError> {
        match self.profiles.insert(NewProfile::bootstrap(principal)).await {
            Ok(profile) => {
                info!(principal = %principal.id, "Created profile for new principal");
                Ok(profile)
            }
            Err(StoreError::Conflict(_)) => {
                debug!(principal = %principal.id, "Profile created concurrently, re-fetching");
                match self.profiles.fetch(&principal.id).await {
                    Ok(Some(profile)) => Ok(profile),
                    Ok(None) => Err(AccessError::ProfileCreationFailed(format!(
                        "profile for {} conflicted on insert but is missing",
                        principal.id
                    ))),
                    Err(e) => Err(AccessError::ProfileUnavailable(e.to_string())),
                }
            }
            Err(e) => Err(AccessError::ProfileCreationFailed(e.to_string())),
        }
    }

    async fn resolve(&self) -> Result<SessionState, AccessError> {
        let Some(credential) = self.credentials.current_credential().await? else {
            return Ok(SessionState::Unauthenticated);
        };
        let principal = credential.principal.clone();

        let profile = match self.profiles.fetch(&principal.id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => self.bootstrap(&principal).await?,
            Err(e) => return Err(AccessError::ProfileUnavailable(e.to_string())),
        };

        if !profile.active {
            warn!(principal = %principal.id, "Deactivated profile tried to resume a session");
            if let Err(e) = self.credentials.sign_out().await {
                warn!("Failed to invalidate credential of deactivated profile: {e}");
            }
            return Err(AccessError::AccountDeactivated);
        }

        Ok(SessionState::Authenticated(Arc::new(Session {
            principal,
            credential,
            profile,
        })))
    }

    fn expect_session(state: SessionState) -> Result<Arc<Session>, AccessError> {
        state.session().cloned().ok_or(AccessError::Unauthenticated)
    }
}

#[async_trait]
impl SessionService for DefaultSessionService {
    async fn resolve_session(&self) -> Result<SessionState, AccessError> {
        match self.resolve().await {
            Ok(state) => {
                self.context.publish(state.clone());
                Ok(state)
            }
            Err(e) => {
                self.context.clear();
                Err(e)
            }
        }
    }

    async fn ensure_profile(&self, principal: &Principal) -> Result<Profile, AccessError> {
        let current = self.credentials.current_credential().await?;
        if current.is_none_or(|c| c.principal.id != principal.id) {
            return Err(AccessError::Unauthenticated);
        }

        match self.profiles.fetch(&principal.id).await {
            Ok(Some(profile)) => Ok(profile),
            Ok(None) => self.bootstrap(principal).await,
            Err(e) => Err(AccessError::ProfileUnavailable(e.to_string())),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Arc<Session>, AccessError> {
        let credential = self.credentials.sign_in(email, password).await?;
        let session = Self::expect_session(self.resolve_session().await?)?;
        info!(
            principal = %credential.principal.id,
            role = %session.role(),
            "Signed in"
        );
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Arc<Session>, AccessError> {
        let credential = self.credentials.sign_up(email, password).await?;
        let session = Self::expect_session(self.resolve_session().await?)?;
        info!(principal = %credential.principal.id, "Signed up");
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AccessError> {
        let result = self.credentials.sign_out().await;
        self.context.clear();
        result?;
        info!("Signed out");
        Ok(())
    }

    async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccessError> {
        self.credentials
            .change_password(current_password, new_password)
            .await
    }

    fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }
}
