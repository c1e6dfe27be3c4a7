//! Session types and the process-wide session context.
//!
//! A [`SessionContext`] is created once at startup and handed to whatever
//! needs the current session. Only the session service writes to it; the
//! route guard, gateway and UI read the latest completed resolution without
//! copying it.

use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;

use crate::domain::Role;
use crate::models::{Credential, Principal, Profile};

/// A valid credential paired with its resolved profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub principal: Principal,
    pub credential: Credential,
    pub profile: Profile,
}

impl Session {
    #[must_use]
    pub const fn role(&self) -> Role {
        self.profile.role
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticated(Arc<Session>),
}

impl SessionState {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub fn session(&self) -> Option<&Arc<Session>> {
        match self {
            Self::Authenticated(session) => Some(session),
            Self::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.session().map(|s| s.role())
    }

    #[must_use]
    pub fn view(&self) -> SessionView {
        match self {
            Self::Unauthenticated => SessionView {
                authenticated: false,
                principal: None,
                profile: None,
            },
            Self::Authenticated(session) => SessionView {
                authenticated: true,
                principal: Some(session.principal.clone()),
                profile: Some(session.profile.clone()),
            },
        }
    }
}

/// Serializable shape of a session, without the bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub principal: Option<Principal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

/// Single-writer, multi-reader holder of the latest session resolution.
#[derive(Debug)]
pub struct SessionContext {
    tx: watch::Sender<SessionState>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SessionState::Unauthenticated);
        Self { tx }
    }

    /// The latest completed resolution.
    #[must_use]
    pub fn current(&self) -> SessionState {
        self.tx.borrow().clone()
    }

    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        self.tx.borrow().session().cloned()
    }

    /// Receives every subsequent change, e.g. sign-in, sign-out or a forced
    /// sign-out after deactivation.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, state: SessionState) {
        self.tx.send_replace(state);
    }

    pub(crate) fn clear(&self) {
        self.tx.send_if_modified(|state| {
            if state.is_authenticated() {
                *state = SessionState::Unauthenticated;
                true
            } else {
                false
            }
        });
    }
}
