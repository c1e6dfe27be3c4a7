use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

use crate::domain::PrincipalId;

/// An authenticated identity as issued by the credential store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
}

impl Principal {
    /// The part of the email before `@`, or an empty string.
    #[must_use]
    pub fn email_local_part(&self) -> &str {
        self.email
            .split_once('@')
            .map_or("", |(local, _)| local)
    }
}

/// A bearer credential bound to a principal, valid until `expires_at`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub principal: Principal,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// The token never reaches logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("token", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn principal(email: &str) -> Principal {
        Principal {
            id: PrincipalId::new("u1"),
            email: email.to_string(),
        }
    }

    #[test]
    fn local_part_of_email() {
        assert_eq!(principal("jane.doe@school.test").email_local_part(), "jane.doe");
        assert_eq!(principal("no-at-sign").email_local_part(), "");
        assert_eq!(principal("").email_local_part(), "");
    }

    #[test]
    fn debug_output_redacts_token() {
        let now = Utc::now();
        let credential = Credential {
            principal: principal("a@b.test"),
            token: "secret-token".to_string(),
            issued_at: now,
            expires_at: now + Duration::hours(1),
        };
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("secret-token"));
        assert!(!credential.is_expired_at(now));
        assert!(credential.is_expired_at(now + Duration::hours(2)));
    }
}
