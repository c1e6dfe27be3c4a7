//! Uniform success/failure envelope returned at every public boundary.
//!
//! Serialized as `{"success": true, "data": ...}` or
//! `{"success": false, "error": "...", "code": "..."}`.

use serde::{Serialize, Serializer};

use crate::error::AccessError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Success { data: T },
    Failure { message: String, code: Option<String> },
}

impl<T> Outcome<T> {
    pub const fn success(data: T) -> Self {
        Self::Success { data }
    }

    pub fn failure(message: impl Into<String>, code: Option<&str>) -> Self {
        Self::Failure {
            message: message.into(),
            code: code.map(str::to_string),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    #[must_use]
    pub const fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { code, .. } => code.as_deref(),
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { message, .. } => Some(message),
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success { data } => Outcome::Success { data: f(data) },
            Self::Failure { message, code } => Outcome::Failure { message, code },
        }
    }
}

impl<T> From<Result<T, AccessError>> for Outcome<T> {
    fn from(result: Result<T, AccessError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => {
                match &err {
                    AccessError::Database(msg) => tracing::error!("Database error: {msg}"),
                    AccessError::Internal(msg) => tracing::error!("Internal error: {msg}"),
                    _ => tracing::debug!(code = err.code(), "Operation failed: {err}"),
                }
                Self::failure(err.to_string(), Some(err.code()))
            }
        }
    }
}

#[derive(Serialize)]
struct Wire<'a, T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

impl<T: Serialize> Serialize for Outcome<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Success { data } => Wire {
                success: true,
                data: Some(data),
                error: None,
                code: None,
            },
            Self::Failure { message, code } => Wire {
                success: false,
                data: None,
                error: Some(message),
                code: code.as_deref(),
            },
        };
        wire.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DenyReason;

    #[test]
    fn success_serializes_with_data() {
        let outcome = Outcome::success(vec![1, 2]);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": [1, 2]}));
    }

    #[test]
    fn failure_serializes_with_message_and_code() {
        let outcome: Outcome<()> = Err(AccessError::Denied(DenyReason::NotOwner)).into();
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "not_owner");
        assert!(json["error"].as_str().unwrap().contains("do not own"));
        assert!(json.get("data").is_none());
    }

    #[test]
    fn conversion_keeps_error_codes() {
        let outcome: Outcome<u8> = Err(AccessError::RequestAlreadyPending).into();
        assert!(!outcome.is_success());
        assert_eq!(outcome.code(), Some("request_already_pending"));
        assert!(outcome.data().is_none());
    }

    #[test]
    fn map_preserves_failures() {
        let ok: Outcome<u8> = Outcome::success(2);
        assert_eq!(ok.map(|n| n * 2).into_data(), Some(4));

        let failed: Outcome<u8> = Outcome::failure("nope", Some("x"));
        let mapped = failed.map(|n| n * 2);
        assert_eq!(mapped.message(), Some("nope"));
        assert_eq!(mapped.code(), Some("x"));
    }
}
