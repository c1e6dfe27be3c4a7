//! Route table, role-based route guard and cancellable navigation.
//!
//! Pages declare who may see them through [`RouteAccess`]. The guard resolves
//! the current session and either lets the navigation through or sends the
//! user to their role home or the sign-in entry point. Admins are never
//! implied: a route lists `Role::Admin` wherever admins may go.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::domain::Role;
use crate::services::SessionService;
use crate::session::SessionState;

const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteAccess {
    /// Reachable by anyone, signed in or not.
    Public,
    /// Only for signed-out users (splash, login, signup).
    GuestOnly,
    /// Signed-in users holding one of the listed roles.
    AuthRequired(Vec<Role>),
}

impl RouteAccess {
    #[must_use]
    pub fn roles(roles: &[Role]) -> Self {
        Self::AuthRequired(roles.to_vec())
    }

    #[must_use]
    pub fn any_role() -> Self {
        Self::roles(&[Role::Student, Role::Teacher, Role::Admin])
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("No route matches {0}")]
    NoRoute(String),

    #[error("Redirect chain starting at {0} is too long")]
    RedirectLoop(String),

    #[error("Sign-in path {0} must be reachable without a session")]
    InvalidSignInPath(String),
}

#[derive(Debug, Clone)]
enum Target {
    Page(RouteAccess),
    Redirect(String),
}

#[derive(Debug, Clone)]
struct RouteEntry {
    segments: Vec<String>,
    target: Target,
}

impl RouteEntry {
    fn matches(&self, path: &[&str]) -> Option<HashMap<String, String>> {
        if self.segments.len() != path.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, actual) in self.segments.iter().zip(path) {
            if let Some(name) = pattern.strip_prefix(':') {
                if actual.is_empty() {
                    return None;
                }
                params.insert(name.to_string(), (*actual).to_string());
            } else if pattern != actual {
                return None;
            }
        }
        Some(params)
    }
}

/// A concrete page a destination resolved to, after following redirects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRoute {
    pub path: String,
    pub access: RouteAccess,
    pub params: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    fallback: Option<String>,
}

fn normalize(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_matches('/');
    format!("/{trimmed}")
}

fn split(path: &str) -> Vec<&str> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, pattern: &str, access: RouteAccess) -> Self {
        self.entries.push(RouteEntry {
            segments: split(pattern).into_iter().map(str::to_string).collect(),
            target: Target::Page(access),
        });
        self
    }

    #[must_use]
    pub fn redirect(mut self, pattern: &str, to: &str) -> Self {
        self.entries.push(RouteEntry {
            segments: split(pattern).into_iter().map(str::to_string).collect(),
            target: Target::Redirect(normalize(to)),
        });
        self
    }

    /// Where unmatched paths go.
    #[must_use]
    pub fn fallback(mut self, to: &str) -> Self {
        self.fallback = Some(normalize(to));
        self
    }

    /// Matches `path` against the table, following redirect entries and the
    /// fallback until a page is reached.
    pub fn resolve(&self, path: &str) -> Result<ResolvedRoute, RoutingError> {
        let start = normalize(path);
        let mut current = start.clone();

        for _ in 0..=MAX_REDIRECTS {
            let segments = split(&current);
            let matched = self
                .entries
                .iter()
                .find_map(|entry| entry.matches(&segments).map(|params| (entry, params)));

            match matched {
                Some((
                    RouteEntry {
                        target: Target::Page(access),
                        ..
                    },
                    params,
                )) => {
                    return Ok(ResolvedRoute {
                        path: current,
                        access: access.clone(),
                        params,
                    });
                }
                Some((
                    RouteEntry {
                        target: Target::Redirect(to),
                        ..
                    },
                    _,
                )) => current.clone_from(to),
                None => match &self.fallback {
                    Some(to) if *to != current => current.clone_from(to),
                    _ => return Err(RoutingError::NoRoute(current)),
                },
            }
        }

        Err(RoutingError::RedirectLoop(start))
    }

    /// The Word Venture page map.
    #[must_use]
    pub fn word_venture() -> Self {
        let student = RouteAccess::roles(&[Role::Student, Role::Admin]);
        let teacher = RouteAccess::roles(&[Role::Teacher, Role::Admin]);
        let admin = RouteAccess::roles(&[Role::Admin]);

        let mut table = Self::new()
            .redirect("/", "/splash")
            .page("/splash", RouteAccess::GuestOnly)
            .page("/login", RouteAccess::GuestOnly)
            .page("/signup", RouteAccess::GuestOnly)
            .page("/forgot-password", RouteAccess::GuestOnly)
            .redirect("/student", "/student/home")
            .redirect("/teacher", "/teacher/home")
            .redirect("/admin", "/admin/dashboard")
            .redirect("/tabs", "/tabs/tab4");

        for path in [
            "/student/home",
            "/student/classes",
            "/student/class-detail/:id",
            "/student/notifications",
            "/student/profile",
            "/student/settings",
            "/student/stories",
            "/student/achievements",
            "/story-miscue-review",
        ] {
            table = table.page(path, student.clone());
        }
        for path in [
            "/teacher/home",
            "/teacher/classes",
            "/teacher/classroom/:id",
            "/teacher/classroom-settings/:id",
            "/teacher/notifications",
            "/teacher/profile",
            "/teacher/settings",
        ] {
            table = table.page(path, teacher.clone());
        }
        for path in [
            "/admin/dashboard",
            "/admin/profile",
            "/admin/users",
            "/admin/auth-diagnostics",
        ] {
            table = table.page(path, admin.clone());
        }
        for path in [
            "/offline-reading-selection",
            "/offline-reading-stories",
            "/offline-reading-words",
        ] {
            table = table.page(path, RouteAccess::Public);
        }
        for path in ["/tabs/tab4", "/tabs/tab6", "/tabs/tab7"] {
            table = table.page(path, RouteAccess::any_role());
        }

        table.fallback("/splash")
    }
}

/// Outcome of evaluating a destination's access rule against a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Redirect(String),
}

/// Pure guard rule. Public wins, then guest-only, then role membership.
#[must_use]
pub fn decide(access: &RouteAccess, state: &SessionState, sign_in_path: &str) -> Verdict {
    match (access, state.role()) {
        (RouteAccess::Public, _) | (RouteAccess::GuestOnly, None) => Verdict::Allow,
        (RouteAccess::GuestOnly, Some(role)) => Verdict::Redirect(role.home_path().to_string()),
        (RouteAccess::AuthRequired(_), None) => Verdict::Redirect(sign_in_path.to_string()),
        (RouteAccess::AuthRequired(allowed), Some(role)) => {
            if allowed.contains(&role) {
                Verdict::Allow
            } else {
                Verdict::Redirect(role.home_path().to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow(ResolvedRoute),
    Redirect(String),
}

impl GuardDecision {
    /// The location the user ends up at.
    #[must_use]
    pub fn location(&self) -> &str {
        match self {
            Self::Allow(route) => &route.path,
            Self::Redirect(to) => to,
        }
    }
}

fn record(outcome: &'static str) {
    metrics::counter!("wordventure_guard_decisions_total", &[("outcome", outcome)]).increment(1);
}

pub struct RouteGuard {
    table: RouteTable,
    sign_in_path: String,
    sessions: Arc<dyn SessionService>,
}

impl RouteGuard {
    /// # Errors
    ///
    /// Fails if the sign-in path does not resolve to a page reachable without
    /// a session, since every redirect to it would then loop.
    pub fn new(
        table: RouteTable,
        sign_in_path: &str,
        sessions: Arc<dyn SessionService>,
    ) -> Result<Self, RoutingError> {
        let sign_in = table.resolve(sign_in_path)?;
        if matches!(sign_in.access, RouteAccess::AuthRequired(_)) {
            return Err(RoutingError::InvalidSignInPath(sign_in.path));
        }

        Ok(Self {
            table,
            sign_in_path: sign_in.path,
            sessions,
        })
    }

    #[must_use]
    pub fn sign_in_path(&self) -> &str {
        &self.sign_in_path
    }

    #[must_use]
    pub const fn table(&self) -> &RouteTable {
        &self.table
    }

    fn fail_closed(&self, destination: &ResolvedRoute) -> GuardDecision {
        record("fail_closed");
        if destination.path == self.sign_in_path {
            GuardDecision::Allow(destination.clone())
        } else {
            GuardDecision::Redirect(self.sign_in_path.clone())
        }
    }

    /// Decides where a navigation to `destination` lands.
    ///
    /// Any failure to resolve the session sends the user to sign-in.
    pub async fn check(&self, destination: &str) -> GuardDecision {
        let route = match self.table.resolve(destination) {
            Ok(route) => route,
            Err(e) => {
                warn!(destination, "Unroutable destination, redirecting to sign-in: {e}");
                record("fail_closed");
                return GuardDecision::Redirect(self.sign_in_path.clone());
            }
        };

        if route.access == RouteAccess::Public {
            record("allow");
            return GuardDecision::Allow(route);
        }

        let state = match self.sessions.resolve_session().await {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    destination = %route.path,
                    code = e.code(),
                    "Session resolution failed, redirecting to sign-in: {e}"
                );
                return self.fail_closed(&route);
            }
        };

        match decide(&route.access, &state, &self.sign_in_path) {
            Verdict::Allow => {
                debug!(destination = %route.path, "Navigation allowed");
                record("allow");
                GuardDecision::Allow(route)
            }
            Verdict::Redirect(to) => {
                debug!(destination = %route.path, redirect = %to, "Navigation redirected");
                record(if to == self.sign_in_path {
                    "redirect_sign_in"
                } else {
                    "redirect_home"
                });
                GuardDecision::Redirect(to)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Completed(GuardDecision),
    /// A newer navigation started before this one finished; nothing was
    /// applied.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Location {
    path: String,
    generation: u64,
}

/// Runs guard checks and applies only the latest one.
pub struct Navigator {
    guard: Arc<RouteGuard>,
    generation: AtomicU64,
    location: watch::Sender<Location>,
}

impl Navigator {
    #[must_use]
    pub fn new(guard: Arc<RouteGuard>) -> Self {
        let start = Location {
            path: guard.sign_in_path().to_string(),
            generation: 0,
        };
        let (location, _rx) = watch::channel(start);
        Self {
            guard,
            generation: AtomicU64::new(0),
            location,
        }
    }

    #[must_use]
    pub fn current(&self) -> String {
        self.location.borrow().path.clone()
    }

    pub async fn navigate(&self, destination: &str) -> NavigationOutcome {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let decision = self.guard.check(destination).await;

        let applied = self.location.send_if_modified(|location| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            location.path = decision.location().to_string();
            location.generation = generation;
            true
        });

        if applied {
            NavigationOutcome::Completed(decision)
        } else {
            debug!(destination, generation, "Navigation superseded");
            NavigationOutcome::Superseded
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PrincipalId;
    use crate::models::{Credential, Principal, Profile};
    use crate::session::Session;
    use chrono::{Duration, Utc};

    fn signed_in(role: Role) -> SessionState {
        let principal = Principal {
            id: PrincipalId::new("p1"),
            email: "p1@school.test".to_string(),
        };
        let now = Utc::now();
        SessionState::Authenticated(Arc::new(Session {
            credential: Credential {
                principal: principal.clone(),
                token: "t".to_string(),
                issued_at: now,
                expires_at: now + Duration::hours(1),
            },
            profile: Profile {
                id: principal.id.clone(),
                email: principal.email.clone(),
                display_name: "p1".to_string(),
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
        }))
    }

    #[test]
    fn guest_only_sends_signed_in_users_home() {
        let verdict = decide(&RouteAccess::GuestOnly, &signed_in(Role::Teacher), "/splash");
        assert_eq!(verdict, Verdict::Redirect("/teacher/home".to_string()));
        assert_eq!(
            decide(&RouteAccess::GuestOnly, &SessionState::Unauthenticated, "/splash"),
            Verdict::Allow
        );
    }

    #[test]
    fn role_not_listed_goes_to_role_home() {
        let admin_only = RouteAccess::roles(&[Role::Admin]);
        assert_eq!(
            decide(&admin_only, &signed_in(Role::Student), "/splash"),
            Verdict::Redirect("/student/home".to_string())
        );
        assert_eq!(decide(&admin_only, &signed_in(Role::Admin), "/splash"), Verdict::Allow);
    }

    #[test]
    fn admin_is_never_implied() {
        let teacher_only = RouteAccess::roles(&[Role::Teacher]);
        assert_eq!(
            decide(&teacher_only, &signed_in(Role::Admin), "/splash"),
            Verdict::Redirect("/admin/dashboard".to_string())
        );
    }

    #[test]
    fn unauthenticated_goes_to_sign_in() {
        assert_eq!(
            decide(&RouteAccess::any_role(), &SessionState::Unauthenticated, "/splash"),
            Verdict::Redirect("/splash".to_string())
        );
        assert_eq!(
            decide(&RouteAccess::Public, &SessionState::Unauthenticated, "/splash"),
            Verdict::Allow
        );
    }

    #[test]
    fn resolves_params_and_redirects() {
        let table = RouteTable::word_venture();

        let route = table.resolve("/teacher/classroom/c-42").unwrap();
        assert_eq!(route.params.get("id").map(String::as_str), Some("c-42"));
        assert_eq!(route.access, RouteAccess::roles(&[Role::Teacher, Role::Admin]));

        assert_eq!(table.resolve("/").unwrap().path, "/splash");
        assert_eq!(table.resolve("/student/").unwrap().path, "/student/home");
        assert_eq!(table.resolve("/admin?tab=users").unwrap().path, "/admin/dashboard");
        assert_eq!(table.resolve("/tabs").unwrap().path, "/tabs/tab4");
    }

    #[test]
    fn unknown_paths_fall_back_to_splash() {
        let table = RouteTable::word_venture();
        let route = table.resolve("/no/such/page").unwrap();
        assert_eq!(route.path, "/splash");
        assert_eq!(route.access, RouteAccess::GuestOnly);

        // a param segment never matches an empty value
        assert_eq!(table.resolve("/student/class-detail").unwrap().path, "/splash");
    }

    #[test]
    fn redirect_loops_are_bounded() {
        let table = RouteTable::new().redirect("/a", "/b").redirect("/b", "/a");
        assert_eq!(
            table.resolve("/a"),
            Err(RoutingError::RedirectLoop("/a".to_string()))
        );
    }

    #[test]
    fn missing_fallback_is_an_error() {
        let table = RouteTable::new().page("/home", RouteAccess::Public);
        assert_eq!(
            table.resolve("/elsewhere"),
            Err(RoutingError::NoRoute("/elsewhere".to_string()))
        );
    }

    #[test]
    fn every_protected_page_lists_admin_explicitly_or_not_at_all() {
        let table = RouteTable::word_venture();
        let admin_page = table.resolve("/admin/users").unwrap();
        assert_eq!(admin_page.access, RouteAccess::roles(&[Role::Admin]));
        let student_page = table.resolve("/student/stories").unwrap();
        assert_eq!(
            student_page.access,
            RouteAccess::roles(&[Role::Student, Role::Admin])
        );
    }
}
