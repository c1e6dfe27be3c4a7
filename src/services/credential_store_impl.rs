//! `SeaORM` implementation of the `CredentialStore` trait.
//!
//! Credentials live in the `auth_sessions` table; the store remembers the
//! token of the device it runs on so a restarted process can resume with
//! [`SeaOrmCredentialStore::with_token`].

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::backend::CredentialStore;
use crate::config::SecurityConfig;
use crate::db::Store;
use crate::db::repositories::principal::hash_password;
use crate::error::{AccessError, StoreError};
use crate::models::{Credential, Principal};
use crate::validation::{validate_email, validate_password};

pub struct SeaOrmCredentialStore {
    store: Store,
    security: SecurityConfig,
    current: RwLock<Option<String>>,
}

impl SeaOrmCredentialStore {
    #[must_use]
    pub fn new(store: Store, security: SecurityConfig) -> Self {
        Self {
            store,
            security,
            current: RwLock::new(None),
        }
    }

    /// Resumes with a previously issued token. It is checked lazily by
    /// [`CredentialStore::current_credential`].
    #[must_use]
    pub fn with_token(store: Store, security: SecurityConfig, token: String) -> Self {
        Self {
            store,
            security,
            current: RwLock::new(Some(token)),
        }
    }

    /// The token of the current credential, for persisting across restarts.
    pub async fn token(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    fn ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.security.session_ttl_hours)
    }

    async fn issue(&self, principal: &Principal) -> Result<Credential, AccessError> {
        let credential = self
            .store
            .create_auth_session(principal, self.ttl())
            .await
            .map_err(StoreError::from)?;

        let previous = self.current.write().await.replace(credential.token.clone());
        if let Some(previous) = previous
            && previous != credential.token
            && let Err(e) = self.store.delete_auth_session(&previous).await
        {
            warn!("Failed to drop replaced session: {e:#}");
        }

        Ok(credential)
    }
}

#[async_trait]
impl CredentialStore for SeaOrmCredentialStore {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Credential, AccessError> {
        let email = validate_email(email)?.to_lowercase();
        validate_password(password, self.security.min_password_length)?;

        let existing = self
            .store
            .get_principal_by_email(&email)
            .await
            .map_err(StoreError::from)?;
        if existing.is_some() {
            return Err(AccessError::EmailTaken);
        }

        let password = password.to_string();
        let config = self.security.clone();
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password, Some(&config)))
                .await
                .map_err(|e| AccessError::Internal(format!("Password hashing task panicked: {e}")))??;

        let principal = match self.store.create_principal(&email, password_hash).await {
            Ok(principal) => principal,
            Err(e) => {
                return Err(match StoreError::from(e) {
                    StoreError::Conflict(_) => AccessError::EmailTaken,
                    other => other.into(),
                });
            }
        };

        info!(principal = %principal.id, "Principal registered");
        self.issue(&principal).await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Credential, AccessError> {
        let email = validate_email(email)
            .map_err(|_| AccessError::InvalidCredentials)?
            .to_lowercase();

        let Some(principal) = self
            .store
            .verify_principal_password(&email, password)
            .await
            .map_err(StoreError::from)?
        else {
            debug!("Sign-in rejected");
            return Err(AccessError::InvalidCredentials);
        };

        self.issue(&principal).await
    }

    async fn sign_out(&self) -> Result<(), AccessError> {
        let token = self.current.write().await.take();
        if let Some(token) = token {
            self.store
                .delete_auth_session(&token)
                .await
                .map_err(StoreError::from)?;
        }
        Ok(())
    }

    async fn current_credential(&self) -> Result<Option<Credential>, StoreError> {
        let Some(token) = self.token().await else {
            return Ok(None);
        };

        let Some(credential) = self.store.find_auth_session(&token).await? else {
            debug!("Stored token is no longer known");
            self.current.write().await.take();
            return Ok(None);
        };

        if credential.is_expired_at(Utc::now()) {
            debug!(principal = %credential.principal.id, "Credential expired");
            self.current.write().await.take();
            self.store.delete_auth_session(&token).await?;
            return Ok(None);
        }

        Ok(Some(credential))
    }

    async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AccessError> {
        let credential = self
            .current_credential()
            .await?
            .ok_or(AccessError::Unauthenticated)?;

        validate_password(new_password, self.security.min_password_length)?;

        if current_password == new_password {
            return Err(AccessError::validation(
                "New password must be different from current password",
            ));
        }

        let verified = self
            .store
            .verify_principal_password(&credential.principal.email, current_password)
            .await
            .map_err(StoreError::from)?;
        if verified.is_none() {
            return Err(AccessError::validation("Current password is incorrect"));
        }

        self.store
            .update_principal_password(&credential.principal.id, new_password, &self.security)
            .await
            .map_err(StoreError::from)?;

        info!(principal = %credential.principal.id, "Password changed");
        Ok(())
    }
}
