//! Integration tests for the route guard and navigator.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wordventure::backend::ProfileTable;
use wordventure::config::Config;
use wordventure::domain::Role;
use wordventure::error::AccessError;
use wordventure::models::{Principal, Profile};
use wordventure::routing::{
    GuardDecision, NavigationOutcome, Navigator, RouteGuard, RouteTable, RoutingError,
};
use wordventure::services::SessionService;
use wordventure::session::{Session, SessionContext, SessionState};
use wordventure::SharedState;

fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("wordventure-routing-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

async fn signed_in_as(role: Role) -> SharedState {
    let state = SharedState::new(test_config())
        .await
        .expect("Failed to create shared state");
    let session = state
        .sessions
        .sign_up("user@school.test", "Correct-horse1")
        .await
        .unwrap();
    if role != Role::Student {
        state.store.set_role(&session.profile.id, role).await.unwrap();
    }
    state
}

fn redirect(to: &str) -> GuardDecision {
    GuardDecision::Redirect(to.to_string())
}

#[tokio::test]
async fn test_guest_only_route_sends_teacher_home() {
    let state = signed_in_as(Role::Teacher).await;
    assert_eq!(state.guard.check("/login").await, redirect("/teacher/home"));
    assert_eq!(state.guard.check("/").await, redirect("/teacher/home"));
}

#[tokio::test]
async fn test_admin_route_sends_student_home() {
    let state = signed_in_as(Role::Student).await;
    assert_eq!(state.guard.check("/admin/users").await, redirect("/student/home"));
    assert_eq!(state.guard.check("/teacher/classes").await, redirect("/student/home"));

    match state.guard.check("/student/class-detail/abc").await {
        GuardDecision::Allow(route) => {
            assert_eq!(route.params.get("id").map(String::as_str), Some("abc"));
        }
        other => panic!("expected allow, got {other:?}"),
    }
}

#[tokio::test]
async fn test_admin_reaches_listed_routes_only() {
    let state = signed_in_as(Role::Admin).await;
    assert!(matches!(
        state.guard.check("/teacher/home").await,
        GuardDecision::Allow(_)
    ));
    assert!(matches!(
        state.guard.check("/admin").await,
        GuardDecision::Allow(route) if route.path == "/admin/dashboard"
    ));
}

#[tokio::test]
async fn test_unauthenticated_goes_to_sign_in() {
    let state = SharedState::new(test_config()).await.unwrap();
    assert_eq!(state.guard.check("/tabs/tab6").await, redirect("/splash"));
    assert_eq!(state.guard.check("/student/home").await, redirect("/splash"));
    assert!(matches!(
        state.guard.check("/signup").await,
        GuardDecision::Allow(_)
    ));
    assert!(matches!(
        state.guard.check("/offline-reading-words").await,
        GuardDecision::Allow(_)
    ));
    // unknown paths land on the splash page
    assert!(matches!(
        state.guard.check("/definitely/not/here").await,
        GuardDecision::Allow(route) if route.path == "/splash"
    ));
}

#[tokio::test]
async fn test_deactivated_user_is_sent_to_sign_in() {
    let state = signed_in_as(Role::Teacher).await;
    let id = state.context.session().unwrap().profile.id.clone();
    state.store.set_active(&id, false).await.unwrap();

    assert_eq!(state.guard.check("/teacher/home").await, redirect("/splash"));
    assert!(!state.context.current().is_authenticated());
}

#[test]
fn test_sign_in_path_must_be_reachable_signed_out() {
    let sessions: Arc<dyn SessionService> = Arc::new(ScriptedSessions::new(Vec::new()));
    let result = RouteGuard::new(RouteTable::word_venture(), "/student/home", sessions);
    assert!(matches!(result, Err(RoutingError::InvalidSignInPath(_))));
}

// A session service whose resolutions follow a script.

enum Step {
    Resolve(Role, Duration),
    Fail,
}

struct ScriptedSessions {
    steps: Mutex<VecDeque<Step>>,
    context: Arc<SessionContext>,
}

impl ScriptedSessions {
    fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            context: Arc::new(SessionContext::new()),
        }
    }
}

fn session(role: Role) -> Arc<Session> {
    let principal = Principal {
        id: "scripted".into(),
        email: "scripted@school.test".to_string(),
    };
    let now = chrono::Utc::now();
    Arc::new(Session {
        credential: wordventure::models::Credential {
            principal: principal.clone(),
            token: "t".to_string(),
            issued_at: now,
            expires_at: now + chrono::Duration::hours(1),
        },
        profile: Profile {
            id: principal.id.clone(),
            email: principal.email.clone(),
            display_name: "scripted".to_string(),
            role,
            active: true,
            teacher_id: None,
            notifications_enabled: true,
            sound_enabled: true,
            dark_mode: false,
            created_at: String::new(),
            updated_at: String::new(),
        },
        principal,
    })
}

#[async_trait]
impl SessionService for ScriptedSessions {
    async fn resolve_session(&self) -> Result<SessionState, AccessError> {
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Resolve(role, delay)) => {
                tokio::time::sleep(delay).await;
                Ok(SessionState::Authenticated(session(role)))
            }
            Some(Step::Fail) => Err(AccessError::ProfileUnavailable("timeout".to_string())),
            None => Ok(SessionState::Unauthenticated),
        }
    }

    async fn ensure_profile(&self, _: &Principal) -> Result<Profile, AccessError> {
        Err(AccessError::Unauthenticated)
    }

    async fn sign_in(&self, _: &str, _: &str) -> Result<Arc<Session>, AccessError> {
        Err(AccessError::InvalidCredentials)
    }

    async fn sign_up(&self, _: &str, _: &str) -> Result<Arc<Session>, AccessError> {
        Err(AccessError::InvalidCredentials)
    }

    async fn sign_out(&self) -> Result<(), AccessError> {
        Ok(())
    }

    async fn change_password(&self, _: &str, _: &str) -> Result<(), AccessError> {
        Err(AccessError::Unauthenticated)
    }

    fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }
}

fn guard(steps: Vec<Step>) -> Arc<RouteGuard> {
    Arc::new(
        RouteGuard::new(
            RouteTable::word_venture(),
            "/splash",
            Arc::new(ScriptedSessions::new(steps)),
        )
        .unwrap(),
    )
}

#[tokio::test]
async fn test_resolution_failure_fails_closed() {
    let guard = guard(vec![Step::Fail, Step::Fail]);

    assert_eq!(guard.check("/student/home").await, redirect("/splash"));
    // no redirect loop when the destination is the sign-in page itself
    assert!(matches!(
        guard.check("/splash").await,
        GuardDecision::Allow(route) if route.path == "/splash"
    ));
}

#[tokio::test]
async fn test_navigator_applies_latest_navigation() {
    let navigator = Navigator::new(guard(vec![
        Step::Resolve(Role::Student, Duration::from_millis(200)),
        Step::Resolve(Role::Teacher, Duration::ZERO),
    ]));
    assert_eq!(navigator.current(), "/splash");

    let (slow, fast) = tokio::join!(
        navigator.navigate("/student/home"),
        navigator.navigate("/teacher/home"),
    );

    assert_eq!(slow, NavigationOutcome::Superseded);
    assert!(matches!(fast, NavigationOutcome::Completed(GuardDecision::Allow(_))));
    assert_eq!(navigator.current(), "/teacher/home");
}

#[tokio::test]
async fn test_navigator_follows_redirects() {
    let navigator = Navigator::new(guard(vec![Step::Resolve(
        Role::Student,
        Duration::ZERO,
    )]));

    let outcome = navigator.navigate("/admin/dashboard").await;
    assert_eq!(outcome, NavigationOutcome::Completed(redirect("/student/home")));
    assert_eq!(navigator.current(), "/student/home");
}
