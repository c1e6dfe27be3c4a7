//! Integration tests for session resolution and profile bootstrapping.
//!
//! Runs against a temp-file SQLite database, plus hand-written table doubles
//! for the outage and insert-conflict paths.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use wordventure::backend::{CredentialStore, ProfileTable};
use wordventure::config::Config;
use wordventure::domain::{PrincipalId, Role};
use wordventure::error::{AccessError, StoreError};
use wordventure::models::{
    Credential, NewProfile, Principal, Profile, ProfileChanges, ProfileFilter,
};
use wordventure::services::{DefaultSessionService, SeaOrmCredentialStore, SessionService};
use wordventure::session::{SessionContext, SessionState};
use wordventure::SharedState;

fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("wordventure-session-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn spawn_state() -> SharedState {
    SharedState::new(test_config())
        .await
        .expect("Failed to create shared state")
}

#[tokio::test]
async fn test_no_credential_is_unauthenticated() {
    let state = spawn_state().await;

    let resolved = state.sessions.resolve_session().await.unwrap();
    assert_eq!(resolved, SessionState::Unauthenticated);
    assert!(!state.context.current().is_authenticated());

    let outcome = state.gateway.my_profile().await;
    assert_eq!(outcome.code(), Some("unauthenticated"));
}

#[tokio::test]
async fn test_new_principal_gets_one_student_profile() {
    let state = spawn_state().await;

    let session = state
        .sessions
        .sign_up("Reader@School.test", "Correct-horse1")
        .await
        .unwrap();
    assert_eq!(session.profile.role, Role::Student);
    assert!(session.profile.active);
    assert_eq!(session.profile.email, "reader@school.test");
    assert_eq!(session.profile.display_name, "reader");

    // resolving again neither duplicates nor changes the row
    let again = state.sessions.resolve_session().await.unwrap();
    assert_eq!(again.session().unwrap().profile, session.profile);

    let rows = state.store.list(&ProfileFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(state.context.session().unwrap().profile.id, session.profile.id);
}

#[tokio::test]
async fn test_concurrent_resolution_creates_single_profile() {
    let config = test_config();
    let state = SharedState::new(config.clone()).await.unwrap();

    let principal = state
        .store
        .create_principal("twins@school.test", "unused".to_string())
        .await
        .unwrap();
    let credential = state
        .store
        .create_auth_session(&principal, Duration::hours(1))
        .await
        .unwrap();

    let service = |token: String| {
        let credentials = Arc::new(SeaOrmCredentialStore::with_token(
            state.store.clone(),
            config.security.clone(),
            token,
        ));
        DefaultSessionService::new(
            credentials,
            Arc::new(state.store.clone()),
            Arc::new(SessionContext::new()),
        )
    };
    let first = service(credential.token.clone());
    let second = service(credential.token.clone());

    let (a, b) = tokio::join!(first.resolve_session(), second.resolve_session());
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a.session().unwrap().profile.id, principal.id);
    assert_eq!(b.session().unwrap().profile.id, principal.id);

    let rows = state.store.list(&ProfileFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].role, Role::Student);
}

#[tokio::test]
async fn test_deactivated_profile_is_signed_out() {
    let state = spawn_state().await;
    let session = state
        .sessions
        .sign_up("dropout@school.test", "Correct-horse1")
        .await
        .unwrap();

    state
        .store
        .set_active(&session.profile.id, false)
        .await
        .unwrap();

    let err = state.sessions.resolve_session().await.unwrap_err();
    assert!(matches!(err, AccessError::AccountDeactivated));
    assert!(!state.context.current().is_authenticated());

    // the credential was invalidated, so there is nothing left to resume
    assert!(state.credentials.token().await.is_none());
    assert_eq!(
        state.sessions.resolve_session().await.unwrap(),
        SessionState::Unauthenticated
    );

    // signing in again still never yields a session
    let err = state
        .sessions
        .sign_in("dropout@school.test", "Correct-horse1")
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::AccountDeactivated));
}

#[tokio::test]
async fn test_sign_in_failures() {
    let state = spawn_state().await;
    state
        .sessions
        .sign_up("kid@school.test", "Correct-horse1")
        .await
        .unwrap();
    state.sessions.sign_out().await.unwrap();
    assert!(!state.context.current().is_authenticated());

    let err = state
        .sessions
        .sign_in("kid@school.test", "Wrong-horse1")
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::InvalidCredentials));

    let err = state
        .sessions
        .sign_up("kid@school.test", "Another-pass3")
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::EmailTaken));

    let err = state
        .sessions
        .sign_up("not-an-email", "Correct-horse1")
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Validation(_)));
}

#[tokio::test]
async fn test_token_resumes_after_restart() {
    let config = test_config();
    let state = SharedState::new(config.clone()).await.unwrap();
    let session = state
        .sessions
        .sign_up("resume@school.test", "Correct-horse1")
        .await
        .unwrap();
    let token = state.credentials.token().await.unwrap();

    let restarted = SharedState::with_token(config, token).await.unwrap();
    let resolved = restarted.sessions.resolve_session().await.unwrap();
    assert_eq!(resolved.session().unwrap().profile.id, session.profile.id);

    restarted.sessions.sign_out().await.unwrap();
    assert_eq!(
        state.sessions.resolve_session().await.unwrap(),
        SessionState::Unauthenticated
    );
}

#[tokio::test]
async fn test_change_password() {
    let state = spawn_state().await;
    state
        .sessions
        .sign_up("pw@school.test", "Correct-horse1")
        .await
        .unwrap();

    let err = state
        .sessions
        .change_password("Wrong-horse1", "Battery-staple2")
        .await
        .unwrap_err();
    assert!(matches!(err, AccessError::Validation(_)));

    state
        .sessions
        .change_password("Correct-horse1", "Battery-staple2")
        .await
        .unwrap();
    state.sessions.sign_out().await.unwrap();

    assert!(
        state
            .sessions
            .sign_in("pw@school.test", "Correct-horse1")
            .await
            .is_err()
    );
    state
        .sessions
        .sign_in("pw@school.test", "Battery-staple2")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ensure_profile_requires_current_principal() {
    let state = spawn_state().await;
    let session = state
        .sessions
        .sign_up("me@school.test", "Correct-horse1")
        .await
        .unwrap();

    let profile = state
        .sessions
        .ensure_profile(&session.principal)
        .await
        .unwrap();
    assert_eq!(profile.id, session.principal.id);

    let stranger = Principal {
        id: PrincipalId::new("someone-else"),
        email: "else@school.test".to_string(),
    };
    let err = state.sessions.ensure_profile(&stranger).await.unwrap_err();
    assert!(matches!(err, AccessError::Unauthenticated));
}

// Doubles for the store paths a real SQLite file cannot easily produce.

struct FixedCredential(Credential);

impl FixedCredential {
    fn new() -> Self {
        let now = Utc::now();
        Self(Credential {
            principal: Principal {
                id: PrincipalId::new("p-fixed"),
                email: "fixed@school.test".to_string(),
            },
            token: "fixed".to_string(),
            issued_at: now,
            expires_at: now + Duration::hours(1),
        })
    }
}

#[async_trait]
impl CredentialStore for FixedCredential {
    async fn sign_up(&self, _: &str, _: &str) -> Result<Credential, AccessError> {
        Ok(self.0.clone())
    }

    async fn sign_in(&self, _: &str, _: &str) -> Result<Credential, AccessError> {
        Ok(self.0.clone())
    }

    async fn sign_out(&self) -> Result<(), AccessError> {
        Ok(())
    }

    async fn current_credential(&self) -> Result<Option<Credential>, StoreError> {
        Ok(Some(self.0.clone()))
    }

    async fn change_password(&self, _: &str, _: &str) -> Result<(), AccessError> {
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Mode {
    /// Every read fails.
    Outage,
    /// The row appears between the first read and the insert.
    RacingInsert,
    /// Inserts fail with a non-conflict error.
    BrokenInsert,
}

struct FakeProfiles {
    mode: Mode,
    fetches: AtomicUsize,
}

impl FakeProfiles {
    fn new(mode: Mode) -> Self {
        Self {
            mode,
            fetches: AtomicUsize::new(0),
        }
    }
}

fn stored_profile(id: &PrincipalId) -> Profile {
    Profile {
        id: id.clone(),
        email: "fixed@school.test".to_string(),
        display_name: "stored".to_string(),
        role: Role::Teacher,
        active: true,
        teacher_id: None,
        notifications_enabled: true,
        sound_enabled: true,
        dark_mode: false,
        created_at: String::new(),
        updated_at: String::new(),
    }
}

#[async_trait]
impl ProfileTable for FakeProfiles {
    async fn fetch(&self, id: &PrincipalId) -> Result<Option<Profile>, StoreError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            Mode::Outage => Err(StoreError::Database("connection refused".to_string())),
            Mode::RacingInsert if n > 0 => Ok(Some(stored_profile(id))),
            Mode::RacingInsert | Mode::BrokenInsert => Ok(None),
        }
    }

    async fn insert(&self, _profile: NewProfile) -> Result<Profile, StoreError> {
        match self.mode {
            Mode::RacingInsert => Err(StoreError::Conflict("profiles.id".to_string())),
            Mode::Outage | Mode::BrokenInsert => {
                Err(StoreError::Database("disk I/O error".to_string()))
            }
        }
    }

    async fn update_details(
        &self,
        _: &PrincipalId,
        _: &ProfileChanges,
    ) -> Result<Option<Profile>, StoreError> {
        Ok(None)
    }

    async fn set_role(&self, _: &PrincipalId, _: Role) -> Result<Option<Profile>, StoreError> {
        Ok(None)
    }

    async fn set_active(&self, _: &PrincipalId, _: bool) -> Result<Option<Profile>, StoreError> {
        Ok(None)
    }

    async fn delete(&self, _: &PrincipalId) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn list(&self, _: &ProfileFilter) -> Result<Vec<Profile>, StoreError> {
        Ok(Vec::new())
    }
}

fn service_with(mode: Mode) -> DefaultSessionService {
    DefaultSessionService::new(
        Arc::new(FixedCredential::new()),
        Arc::new(FakeProfiles::new(mode)),
        Arc::new(SessionContext::new()),
    )
}

#[tokio::test]
async fn test_profile_outage_is_not_unauthenticated() {
    let service = service_with(Mode::Outage);

    let err = service.resolve_session().await.unwrap_err();
    assert!(matches!(err, AccessError::ProfileUnavailable(_)));
    assert!(err.is_retryable());
    assert!(!service.context().current().is_authenticated());
}

#[tokio::test]
async fn test_insert_conflict_returns_stored_row() {
    let service = service_with(Mode::RacingInsert);

    let state = service.resolve_session().await.unwrap();
    let profile = &state.session().unwrap().profile;
    // the concurrently stored row wins, not a fresh default
    assert_eq!(profile.role, Role::Teacher);
    assert_eq!(profile.display_name, "stored");
}

#[tokio::test]
async fn test_insert_failure_never_fabricates_a_profile() {
    let service = service_with(Mode::BrokenInsert);

    let err = service.resolve_session().await.unwrap_err();
    assert!(matches!(err, AccessError::ProfileCreationFailed(_)));
    assert!(service.context().session().is_none());
}
